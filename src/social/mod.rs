//! Social graph
//!
//! Friendship and block records, plus the in-memory [`SocialGraph`] store
//! that serves as the presence hub's [`PeerLister`](crate::presence::PeerLister).

mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::AccountId;

pub use store::SocialGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

/// A friend request or confirmed friendship between two accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    pub id: Uuid,
    pub requester_id: AccountId,
    pub addressee_id: AccountId,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Friendship {
    /// Whether this record links `a` and `b`, in either direction
    pub fn involves(&self, a: AccountId, b: AccountId) -> bool {
        (self.requester_id == a && self.addressee_id == b)
            || (self.requester_id == b && self.addressee_id == a)
    }

    /// The other side of the relationship, if `account` is part of it
    pub fn other(&self, account: AccountId) -> Option<AccountId> {
        if self.requester_id == account {
            Some(self.addressee_id)
        } else if self.addressee_id == account {
            Some(self.requester_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub blocker_id: AccountId,
    pub blocked_id: AccountId,
    pub created_at: DateTime<Utc>,
}

/// Client-facing view of a confirmed friend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friend {
    pub account_id: AccountId,
    pub since: DateTime<Utc>,
}

/// Client-facing view of a blocked account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedUser {
    pub account_id: AccountId,
    pub since: DateTime<Utc>,
}

/// Client-facing view of a pending request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: Uuid,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub created_at: DateTime<Utc>,
}

impl From<&Friendship> for FriendRequest {
    fn from(f: &Friendship) -> Self {
        Self {
            id: f.id,
            from_account_id: f.requester_id,
            to_account_id: f.addressee_id,
            created_at: f.created_at,
        }
    }
}
