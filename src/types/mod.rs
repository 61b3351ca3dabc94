//! Data types for the presence hub
//!
//! Identifiers and the events that flow between the registry, the notifier
//! and connected peers.

mod account;
mod event;

pub use account::AccountId;
pub use event::{PeerNotification, PresenceEnvelope, PresenceEvent, PresenceKind};
