//! In-memory relationship store

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Deserialize;
use uuid::Uuid;

use super::{Block, BlockedUser, Friend, FriendRequest, Friendship, FriendshipStatus};
use crate::error::{PeerListError, SocialError};
use crate::presence::PeerLister;
use crate::types::AccountId;

#[derive(Default)]
struct GraphState {
    friendships: HashMap<Uuid, Friendship>,
    blocks: Vec<Block>,
}

impl GraphState {
    fn between(&self, a: AccountId, b: AccountId) -> Option<&Friendship> {
        self.friendships.values().find(|f| f.involves(a, b))
    }

    fn is_blocked_either_way(&self, a: AccountId, b: AccountId) -> bool {
        self.blocks.iter().any(|block| {
            (block.blocker_id == a && block.blocked_id == b)
                || (block.blocker_id == b && block.blocked_id == a)
        })
    }
}

/// Seed file layout: pairs of account ids
#[derive(Debug, Default, Deserialize)]
struct SeedFile {
    #[serde(default)]
    friendships: Vec<(AccountId, AccountId)>,
    #[serde(default)]
    blocks: Vec<(AccountId, AccountId)>,
}

/// Friendships and blocks held in memory
pub struct SocialGraph {
    state: RwLock<GraphState>,
}

impl SocialGraph {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(GraphState::default()),
        }
    }

    /// Load accepted friendships and blocks from a JSON seed file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SocialError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let seed: SeedFile = serde_json::from_str(&raw)?;

        let graph = Self::new();
        for (a, b) in seed.friendships {
            graph.insert_accepted(a, b)?;
        }
        for (blocker, blocked) in seed.blocks {
            graph.block(blocker, blocked)?;
        }

        let (friendships, blocks) = {
            let state = graph.state.read();
            (state.friendships.len(), state.blocks.len())
        };
        tracing::info!(
            path = %path.as_ref().display(),
            friendships,
            blocks,
            "Loaded social graph seed"
        );
        Ok(graph)
    }

    /// Insert an accepted friendship directly
    pub fn insert_accepted(&self, a: AccountId, b: AccountId) -> Result<Friendship, SocialError> {
        let request = self.send_request(a, b)?;
        self.accept_request(request.id, b)
    }

    /// Create a pending friend request from `from` to `to`
    pub fn send_request(&self, from: AccountId, to: AccountId) -> Result<Friendship, SocialError> {
        if from == to {
            return Err(SocialError::SelfFriend);
        }

        let mut state = self.state.write();
        if state.is_blocked_either_way(from, to) {
            return Err(SocialError::Blocked);
        }
        if let Some(existing) = state.between(from, to) {
            return Err(match existing.status {
                FriendshipStatus::Accepted => SocialError::AlreadyFriends,
                FriendshipStatus::Pending => SocialError::RequestExists,
            });
        }

        let now = Utc::now();
        let friendship = Friendship {
            id: Uuid::new_v4(),
            requester_id: from,
            addressee_id: to,
            status: FriendshipStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        state.friendships.insert(friendship.id, friendship.clone());
        Ok(friendship)
    }

    /// Accept a pending request addressed to `addressee`
    pub fn accept_request(
        &self,
        request_id: Uuid,
        addressee: AccountId,
    ) -> Result<Friendship, SocialError> {
        let mut state = self.state.write();
        let friendship = state
            .friendships
            .get_mut(&request_id)
            .filter(|f| f.addressee_id == addressee && f.status == FriendshipStatus::Pending)
            .ok_or(SocialError::RequestNotFound)?;

        friendship.status = FriendshipStatus::Accepted;
        friendship.updated_at = Utc::now();
        Ok(friendship.clone())
    }

    /// Delete a pending request addressed to `addressee`
    pub fn decline_request(&self, request_id: Uuid, addressee: AccountId) -> Result<(), SocialError> {
        let mut state = self.state.write();
        let pending = state
            .friendships
            .get(&request_id)
            .is_some_and(|f| f.addressee_id == addressee && f.status == FriendshipStatus::Pending);
        if !pending {
            return Err(SocialError::RequestNotFound);
        }
        state.friendships.remove(&request_id);
        Ok(())
    }

    /// Remove an accepted friendship in either direction
    pub fn remove_friend(&self, account: AccountId, friend: AccountId) -> Result<(), SocialError> {
        let mut state = self.state.write();
        let id = state
            .between(account, friend)
            .filter(|f| f.status == FriendshipStatus::Accepted)
            .map(|f| f.id)
            .ok_or(SocialError::NotFriends)?;
        state.friendships.remove(&id);
        Ok(())
    }

    /// Block `blocked` and drop any friendship between the two
    pub fn block(&self, blocker: AccountId, blocked: AccountId) -> Result<(), SocialError> {
        if blocker == blocked {
            return Err(SocialError::SelfBlock);
        }

        let mut state = self.state.write();
        if state
            .blocks
            .iter()
            .any(|b| b.blocker_id == blocker && b.blocked_id == blocked)
        {
            return Err(SocialError::AlreadyBlocked);
        }

        state.blocks.push(Block {
            blocker_id: blocker,
            blocked_id: blocked,
            created_at: Utc::now(),
        });
        state.friendships.retain(|_, f| !f.involves(blocker, blocked));
        Ok(())
    }

    pub fn unblock(&self, blocker: AccountId, blocked: AccountId) -> Result<(), SocialError> {
        let mut state = self.state.write();
        let before = state.blocks.len();
        state
            .blocks
            .retain(|b| !(b.blocker_id == blocker && b.blocked_id == blocked));
        if state.blocks.len() == before {
            return Err(SocialError::BlockNotFound);
        }
        Ok(())
    }

    /// Accepted friends of `account`, newest first
    pub fn list_friends(&self, account: AccountId) -> Vec<Friend> {
        let state = self.state.read();
        let mut friends: Vec<Friend> = state
            .friendships
            .values()
            .filter(|f| f.status == FriendshipStatus::Accepted)
            .filter_map(|f| {
                f.other(account).map(|other| Friend {
                    account_id: other,
                    since: f.updated_at,
                })
            })
            .collect();
        friends.sort_by(|a, b| b.since.cmp(&a.since));
        friends
    }

    /// Pending requests as `(incoming, outgoing)`
    pub fn list_requests(&self, account: AccountId) -> (Vec<FriendRequest>, Vec<FriendRequest>) {
        let state = self.state.read();
        let pending = state
            .friendships
            .values()
            .filter(|f| f.status == FriendshipStatus::Pending);

        let mut incoming = Vec::new();
        let mut outgoing = Vec::new();
        for f in pending {
            if f.addressee_id == account {
                incoming.push(FriendRequest::from(f));
            } else if f.requester_id == account {
                outgoing.push(FriendRequest::from(f));
            }
        }
        (incoming, outgoing)
    }

    /// Accounts `account` has blocked
    pub fn list_blocked(&self, account: AccountId) -> Vec<BlockedUser> {
        self.state
            .read()
            .blocks
            .iter()
            .filter(|b| b.blocker_id == account)
            .map(|b| BlockedUser {
                account_id: b.blocked_id,
                since: b.created_at,
            })
            .collect()
    }
}

impl Default for SocialGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeerLister for SocialGraph {
    async fn list_confirmed_peers(
        &self,
        account: AccountId,
    ) -> Result<Vec<AccountId>, PeerListError> {
        Ok(self
            .list_friends(account)
            .into_iter()
            .map(|f| f.account_id)
            .collect())
    }
}
