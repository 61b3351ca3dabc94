//! Connection registry
//!
//! The process-wide map from account to its single live connection handle.
//!
//! Invariant: at most one handle per account. Registering over an existing
//! entry closes the previous handle before the write lock is released, so no
//! reader ever observes two handles or a dangling one.
//!
//! Every mutation that changes who is online publishes exactly one
//! [`PresenceEvent`]. Events are sequenced and queued while the write lock is
//! held, and a single fan-out worker drains the queue, so every peer sees an
//! account's transitions in mutation order. Registration never waits on the
//! social graph.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use super::handle::{ConnectionHandle, ConnectionId};
use super::notifier::{FanoutNotifier, PeerLister};
use crate::error::PushError;
use crate::types::{AccountId, PresenceEnvelope, PresenceEvent};

struct RegistryInner {
    connections: RwLock<HashMap<AccountId, ConnectionHandle>>,
    notifier: FanoutNotifier,
    fanout_queue: mpsc::UnboundedSender<PresenceEnvelope>,
    /// Receiving end of the queue until the worker is started
    pending_worker: Mutex<Option<mpsc::UnboundedReceiver<PresenceEnvelope>>>,
    sequence_counter: AtomicU64,
}

/// Shared presence registry. Cloning is cheap and yields the same registry.
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RegistryInner>,
}

impl ConnectionRegistry {
    /// Create an empty registry that resolves peers through `peers`
    pub fn new(peers: Arc<dyn PeerLister>) -> Self {
        let (fanout_queue, worker_queue) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(RegistryInner {
                connections: RwLock::new(HashMap::new()),
                notifier: FanoutNotifier::new(peers),
                fanout_queue,
                pending_worker: Mutex::new(Some(worker_queue)),
                sequence_counter: AtomicU64::new(0),
            }),
        }
    }

    /// Make `handle` the canonical connection for `account`.
    ///
    /// A previously registered handle is closed and replaced.
    pub fn register(&self, account: AccountId, handle: ConnectionHandle) {
        let connection = handle.id();

        {
            let mut connections = self.inner.connections.write();
            if let Some(previous) = connections.insert(account, handle) {
                previous.close();
                tracing::info!(
                    account_id = %account,
                    superseded = %previous.id(),
                    connection = %connection,
                    "Superseded existing connection"
                );
            }
            self.publish(PresenceEvent::online(account));
        }

        tracing::debug!(account_id = %account, connection = %connection, "Registered");
        self.ensure_fanout_worker();
    }

    /// Remove whatever connection `account` holds.
    ///
    /// Returns `false` (and emits nothing) when the account was not online.
    pub fn unregister(&self, account: AccountId) -> bool {
        self.remove_where(account, |_| true)
    }

    /// Remove `account`'s entry only if it is still the handle `connection`.
    ///
    /// Session cleanup uses this so a superseded session can never remove
    /// the registration that replaced it.
    pub fn unregister_connection(&self, account: AccountId, connection: ConnectionId) -> bool {
        self.remove_where(account, |handle| handle.id() == connection)
    }

    fn remove_where(
        &self,
        account: AccountId,
        matches: impl FnOnce(&ConnectionHandle) -> bool,
    ) -> bool {
        let removed = {
            let mut connections = self.inner.connections.write();
            let removed = match connections.entry(account) {
                Entry::Occupied(entry) if matches(entry.get()) => Some(entry.remove()),
                _ => None,
            };
            if removed.is_some() {
                self.publish(PresenceEvent::offline(account));
            }
            removed
        };

        match removed {
            Some(handle) => {
                handle.close();
                tracing::debug!(account_id = %account, connection = %handle.id(), "Unregistered");
                self.ensure_fanout_worker();
                true
            }
            None => false,
        }
    }

    /// Whether `account` currently holds a live connection
    pub fn is_online(&self, account: AccountId) -> bool {
        self.inner.connections.read().contains_key(&account)
    }

    /// Online state for each requested account
    pub fn bulk_online(&self, accounts: &[AccountId]) -> HashMap<AccountId, bool> {
        let connections = self.inner.connections.read();
        accounts
            .iter()
            .map(|account| (*account, connections.contains_key(account)))
            .collect()
    }

    /// Number of online accounts
    pub fn count(&self) -> usize {
        self.inner.connections.read().len()
    }

    /// Push to `account`'s live handle. `None` when the account is offline.
    pub(crate) fn push_to(
        &self,
        account: AccountId,
        payload: &Arc<str>,
    ) -> Option<Result<(), PushError>> {
        let connections = self.inner.connections.read();
        connections
            .get(&account)
            .map(|handle| handle.push(Arc::clone(payload)))
    }

    /// Sequence and queue an event. Called with the write lock held.
    fn publish(&self, event: PresenceEvent) {
        let sequence_id = self.inner.sequence_counter.fetch_add(1, Ordering::Relaxed);
        if self
            .inner
            .fanout_queue
            .send(PresenceEnvelope { event, sequence_id })
            .is_err()
        {
            tracing::warn!(account_id = %event.subject, "Fan-out worker gone, dropping presence event");
        }
    }

    /// Start the fan-out worker on the current runtime if it is not running yet
    fn ensure_fanout_worker(&self) {
        let mut pending = self.inner.pending_worker.lock();
        if pending.is_none() {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, peer notifications stay queued");
            return;
        };
        if let Some(queue) = pending.take() {
            runtime.spawn(run_fanout(Arc::downgrade(&self.inner), queue));
        }
    }
}

/// Drain the fan-out queue one event at a time.
///
/// Holds only a weak reference between events so the worker stops once the
/// registry is dropped.
async fn run_fanout(
    registry: Weak<RegistryInner>,
    mut queue: mpsc::UnboundedReceiver<PresenceEnvelope>,
) {
    while let Some(envelope) = queue.recv().await {
        let Some(inner) = registry.upgrade() else {
            break;
        };
        let registry = ConnectionRegistry { inner };
        let event = envelope.event;

        let report = registry.inner.notifier.notify(&registry, event).await;
        tracing::debug!(
            account_id = %event.subject,
            kind = ?event.kind,
            sequence_id = envelope.sequence_id,
            peers = report.peers,
            delivered = report.delivered,
            failed = report.failed,
            "Peer fan-out finished"
        );
    }
    tracing::debug!("Fan-out worker stopped");
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("online", &self.count())
            .field(
                "events",
                &self.inner.sequence_counter.load(Ordering::Relaxed),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PeerListError;
    use crate::presence::testing::{handle, offline, online, registry, watched_registry};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_register_marks_online() {
        let registry = registry();
        let account = AccountId::new_v4();

        assert!(!registry.is_online(account));
        registry.register(account, handle());
        assert!(registry.is_online(account));
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let (registry, mut watcher) = watched_registry();
        let account = AccountId::new_v4();

        registry.register(account, handle());
        assert!(registry.unregister(account));
        assert!(!registry.is_online(account));
        assert!(!registry.unregister(account));

        assert_eq!(
            watcher.drain(&registry).await,
            vec![online(account), offline(account)]
        );
    }

    #[tokio::test]
    async fn test_unregister_unknown_account_emits_nothing() {
        let (registry, mut watcher) = watched_registry();
        let account = AccountId::new_v4();

        assert!(!registry.is_online(account));
        assert!(!registry.unregister(account));
        assert!(!registry.is_online(account));
        assert!(watcher.drain(&registry).await.is_empty());
    }

    #[tokio::test]
    async fn test_unregister_closes_handle() {
        let registry = registry();
        let account = AccountId::new_v4();
        let h = handle();
        let signal = h.close_signal();

        registry.register(account, h);
        registry.unregister(account);
        assert!(signal.is_closed());
    }

    #[tokio::test]
    async fn test_reregister_closes_previous_handle_once() {
        let registry = registry();
        let account = AccountId::new_v4();
        let first = handle();
        let first_signal = first.close_signal();
        let second = handle();
        let second_signal = second.close_signal();

        registry.register(account, first);
        registry.register(account, second);

        assert!(first_signal.is_closed());
        assert!(!first_signal.close(), "first handle was already closed");
        assert!(!second_signal.is_closed());
        assert!(registry.is_online(account));
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn test_stale_connection_cannot_unregister_replacement() {
        let (registry, mut watcher) = watched_registry();
        let account = AccountId::new_v4();
        let first = handle();
        let first_id = first.id();
        let second = handle();
        let second_id = second.id();

        registry.register(account, first);
        registry.register(account, second);

        assert!(!registry.unregister_connection(account, first_id));
        assert!(registry.is_online(account));

        assert!(registry.unregister_connection(account, second_id));
        assert!(!registry.is_online(account));

        assert_eq!(
            watcher.drain(&registry).await,
            vec![online(account), online(account), offline(account)]
        );
    }

    #[tokio::test]
    async fn test_count_tracks_sequential_operations() {
        let registry = registry();
        let accounts: Vec<AccountId> = (0..5).map(|_| AccountId::new_v4()).collect();

        for account in &accounts {
            registry.register(*account, handle());
        }
        registry.register(accounts[0], handle());
        registry.unregister(accounts[1]);
        registry.unregister(accounts[1]);
        registry.unregister(AccountId::new_v4());

        let online = accounts.iter().filter(|a| registry.is_online(**a)).count();
        assert_eq!(registry.count(), online);
        assert_eq!(registry.count(), 4);
    }

    #[tokio::test]
    async fn test_bulk_online() {
        let registry = registry();
        let online = AccountId::new_v4();
        let offline = AccountId::new_v4();
        registry.register(online, handle());

        let result = registry.bulk_online(&[online, offline]);
        assert_eq!(result.len(), 2);
        assert!(result[&online]);
        assert!(!result[&offline]);

        assert!(registry.bulk_online(&[]).is_empty());
    }

    /// Lists `peer` for `subject`, stalling the first lookup
    struct StallingLister {
        subject: AccountId,
        peer: AccountId,
        stall: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PeerLister for StallingLister {
        async fn list_confirmed_peers(
            &self,
            account: AccountId,
        ) -> Result<Vec<AccountId>, PeerListError> {
            if account != self.subject {
                return Ok(Vec::new());
            }
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(self.stall).await;
            }
            Ok(vec![self.peer])
        }
    }

    fn stalling_registry(subject: AccountId, peer: AccountId) -> ConnectionRegistry {
        ConnectionRegistry::new(Arc::new(StallingLister {
            subject,
            peer,
            stall: Duration::from_millis(100),
            calls: AtomicUsize::new(0),
        }))
    }

    async fn recv_all(rx: &mut mpsc::Receiver<Arc<str>>, n: usize) -> Vec<crate::types::PeerNotification> {
        let mut seen = Vec::new();
        for _ in 0..n {
            let raw = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push(serde_json::from_str(&raw).unwrap());
        }
        seen
    }

    #[tokio::test]
    async fn test_slow_lookup_keeps_subject_order() {
        let (x, y) = (AccountId::new_v4(), AccountId::new_v4());
        let registry = stalling_registry(x, y);
        let (hy, mut rx_y) = ConnectionHandle::new(8);
        registry.register(y, hy);

        registry.register(x, handle());
        registry.unregister(x);

        assert_eq!(recv_all(&mut rx_y, 2).await, vec![online(x), offline(x)]);
        assert!(!registry.is_online(x));
        assert!(
            tokio::time::timeout(Duration::from_millis(200), rx_y.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_slow_lookup_keeps_reconnect_order() {
        let (x, y) = (AccountId::new_v4(), AccountId::new_v4());
        let registry = stalling_registry(x, y);
        let (hy, mut rx_y) = ConnectionHandle::new(8);
        registry.register(y, hy);

        let first = handle();
        let first_id = first.id();
        registry.register(x, first);
        registry.register(x, handle());
        assert!(!registry.unregister_connection(x, first_id));
        registry.unregister(x);

        assert_eq!(
            recv_all(&mut rx_y, 3).await,
            vec![online(x), online(x), offline(x)]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registers_leave_one_handle() {
        for _ in 0..50 {
            let registry = registry();
            let account = AccountId::new_v4();
            let barrier = Arc::new(tokio::sync::Barrier::new(2));

            let (h1, _rx1) = ConnectionHandle::new(8);
            let (h2, _rx2) = ConnectionHandle::new(8);
            let s1 = h1.close_signal();
            let s2 = h2.close_signal();

            let tasks: Vec<_> = [h1, h2]
                .into_iter()
                .map(|h| {
                    let registry = registry.clone();
                    let barrier = barrier.clone();
                    tokio::spawn(async move {
                        barrier.wait().await;
                        registry.register(account, h);
                    })
                })
                .collect();
            for task in tasks {
                task.await.unwrap();
            }

            assert_eq!(registry.count(), 1);
            assert!(registry.is_online(account));
            assert!(s1.is_closed() ^ s2.is_closed(), "exactly one handle closed");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_unregister_delivers_in_mutation_order() {
        let (registry, mut watcher) = watched_registry();
        let account = AccountId::new_v4();

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    for _ in 0..25 {
                        if i % 2 == 0 {
                            registry.register(account, handle());
                        } else {
                            registry.unregister(account);
                        }
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }
        registry.unregister(account);

        let seen = watcher.drain(&registry).await;
        let mut present = false;
        for notification in &seen {
            if *notification == offline(account) {
                assert!(present, "offline without a live entry");
                present = false;
            } else {
                assert_eq!(*notification, online(account));
                present = true;
            }
        }

        assert_eq!(seen.iter().filter(|n| **n == online(account)).count(), 4 * 25);
        assert!(!present, "last delivered event must be offline");
        assert!(!registry.is_online(account));
    }
}
