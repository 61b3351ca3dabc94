//! Read-only presence queries for callers outside the transport path

use std::collections::HashMap;

use super::registry::ConnectionRegistry;
use crate::types::AccountId;

/// Read-only view over a [`ConnectionRegistry`]
#[derive(Clone, Debug)]
pub struct PresenceQuery {
    registry: ConnectionRegistry,
}

impl PresenceQuery {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    pub fn is_online(&self, account: AccountId) -> bool {
        self.registry.is_online(account)
    }

    /// Online state per requested account. Empty input yields an empty map.
    pub fn bulk_online(&self, accounts: &[AccountId]) -> HashMap<AccountId, bool> {
        if accounts.is_empty() {
            return HashMap::new();
        }
        self.registry.bulk_online(accounts)
    }

    pub fn count(&self) -> usize {
        self.registry.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::handle::ConnectionHandle;
    use crate::presence::notifier::MockPeerLister;
    use std::sync::Arc;

    fn setup() -> (ConnectionRegistry, PresenceQuery) {
        let mut peers = MockPeerLister::new();
        peers
            .expect_list_confirmed_peers()
            .returning(|_| Ok(Vec::new()));
        let registry = ConnectionRegistry::new(Arc::new(peers));
        let query = PresenceQuery::new(registry.clone());
        (registry, query)
    }

    #[tokio::test]
    async fn test_query_reflects_registry() {
        let (registry, query) = setup();
        let a = AccountId::new_v4();
        let b = AccountId::new_v4();

        registry.register(a, ConnectionHandle::new(4).0);

        assert!(query.is_online(a));
        assert!(!query.is_online(b));
        assert_eq!(query.count(), 1);

        let bulk = query.bulk_online(&[a, b, a]);
        assert_eq!(bulk.len(), 2);
        assert!(bulk[&a]);
        assert!(!bulk[&b]);
    }

    #[tokio::test]
    async fn test_empty_bulk_query() {
        let (registry, query) = setup();
        registry.register(AccountId::new_v4(), ConnectionHandle::new(4).0);
        assert!(query.bulk_online(&[]).is_empty());
    }
}
