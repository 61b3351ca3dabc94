//! Test helpers shared by the presence unit tests

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::handle::ConnectionHandle;
use super::notifier::MockPeerLister;
use super::registry::ConnectionRegistry;
use crate::types::{AccountId, PeerNotification};

/// Registry whose accounts have no peers
pub fn registry() -> ConnectionRegistry {
    let mut peers = MockPeerLister::new();
    peers
        .expect_list_confirmed_peers()
        .returning(|_| Ok(Vec::new()));
    ConnectionRegistry::new(Arc::new(peers))
}

/// Handle whose outbound queue is already gone
pub fn handle() -> ConnectionHandle {
    ConnectionHandle::new(8).0
}

/// An online account listed as the only peer of every other account.
///
/// Everything the registry fans out ends up in `inbox`, in delivery order.
pub struct Watcher {
    inbox: mpsc::Receiver<Arc<str>>,
}

pub fn watched_registry() -> (ConnectionRegistry, Watcher) {
    let watcher = AccountId::new_v4();
    let mut peers = MockPeerLister::new();
    peers
        .expect_list_confirmed_peers()
        .returning(move |account| {
            if account == watcher {
                Ok(Vec::new())
            } else {
                Ok(vec![watcher])
            }
        });
    let registry = ConnectionRegistry::new(Arc::new(peers));

    let (handle, inbox) = ConnectionHandle::new(1024);
    registry.register(watcher, handle);

    (registry, Watcher { inbox })
}

impl Watcher {
    pub async fn next(&mut self) -> PeerNotification {
        let raw = tokio::time::timeout(Duration::from_secs(2), self.inbox.recv())
            .await
            .expect("no notification in time")
            .expect("watcher queue closed");
        serde_json::from_str(&raw).unwrap()
    }

    /// Everything delivered so far.
    ///
    /// Registers a marker account and reads until its ONLINE arrives; fan-out
    /// is processed in order, so nothing queued earlier is still in flight.
    /// The marker stays online.
    pub async fn drain(&mut self, registry: &ConnectionRegistry) -> Vec<PeerNotification> {
        let marker = AccountId::new_v4();
        registry.register(marker, handle());

        let mut seen = Vec::new();
        loop {
            let notification = self.next().await;
            if notification == online(marker) {
                return seen;
            }
            seen.push(notification);
        }
    }
}

pub fn online(account: AccountId) -> PeerNotification {
    PeerNotification::PeerOnline {
        account_id: account,
    }
}

pub fn offline(account: AccountId) -> PeerNotification {
    PeerNotification::PeerOffline {
        account_id: account,
    }
}
