//! Peer fan-out
//!
//! Resolves a subject's confirmed peers and pushes the presence payload to
//! each of them that is online. Best-effort: a failed lookup drops the
//! notification, a failed push only affects that peer.

use std::sync::Arc;

use async_trait::async_trait;

use super::registry::ConnectionRegistry;
use crate::error::{PeerListError, PushError};
use crate::types::{AccountId, PresenceEvent};

/// Social-graph capability the notifier depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PeerLister: Send + Sync {
    /// Accounts with a confirmed relationship to `account`, fetched fresh
    async fn list_confirmed_peers(
        &self,
        account: AccountId,
    ) -> Result<Vec<AccountId>, PeerListError>;
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Peers returned by the social graph
    pub peers: usize,
    /// Pushes accepted by a peer's connection
    pub delivered: usize,
    /// Peers with no live connection
    pub offline: usize,
    /// Pushes that failed
    pub failed: usize,
}

/// Pushes presence transitions to online peers
pub struct FanoutNotifier {
    peers: Arc<dyn PeerLister>,
}

impl FanoutNotifier {
    pub fn new(peers: Arc<dyn PeerLister>) -> Self {
        Self { peers }
    }

    /// Notify `event.subject`'s online peers about `event`
    pub async fn notify(&self, registry: &ConnectionRegistry, event: PresenceEvent) -> FanoutReport {
        let mut report = FanoutReport::default();

        let peers = match self.peers.list_confirmed_peers(event.subject).await {
            Ok(peers) => peers,
            Err(e) => {
                tracing::warn!(
                    account_id = %event.subject,
                    error = %e,
                    "Failed to list peers, dropping presence notification"
                );
                return report;
            }
        };
        report.peers = peers.len();
        if peers.is_empty() {
            return report;
        }

        let payload: Arc<str> = match serde_json::to_string(&event.to_notification()) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize presence notification");
                return report;
            }
        };

        for peer in peers {
            match registry.push_to(peer, &payload) {
                Some(Ok(())) => report.delivered += 1,
                Some(Err(e)) => {
                    report.failed += 1;
                    log_push_failure(peer, event.subject, &e);
                }
                None => report.offline += 1,
            }
        }

        report
    }
}

fn log_push_failure(peer: AccountId, subject: AccountId, error: &PushError) {
    tracing::warn!(
        peer_id = %peer,
        account_id = %subject,
        error = %error,
        "Failed to notify peer"
    );
}
