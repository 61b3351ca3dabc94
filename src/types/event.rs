//! Presence events and the payload pushed to peers

use serde::{Deserialize, Serialize};

use super::AccountId;

/// Direction of a presence transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceKind {
    Online,
    Offline,
}

/// A single presence transition for one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub kind: PresenceKind,
    pub subject: AccountId,
}

impl PresenceEvent {
    pub fn online(subject: AccountId) -> Self {
        Self {
            kind: PresenceKind::Online,
            subject,
        }
    }

    pub fn offline(subject: AccountId) -> Self {
        Self {
            kind: PresenceKind::Offline,
            subject,
        }
    }

    /// Wire payload sent to the subject's peers
    pub fn to_notification(&self) -> PeerNotification {
        match self.kind {
            PresenceKind::Online => PeerNotification::PeerOnline {
                account_id: self.subject,
            },
            PresenceKind::Offline => PeerNotification::PeerOffline {
                account_id: self.subject,
            },
        }
    }
}

/// Presence event as queued for fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceEnvelope {
    pub event: PresenceEvent,

    /// Monotonically increasing sequence ID, assigned in mutation order
    pub sequence_id: u64,
}

/// JSON message pushed over a peer's connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerNotification {
    /// A confirmed peer came online
    PeerOnline { account_id: AccountId },

    /// A confirmed peer went offline
    PeerOffline { account_id: AccountId },
}
