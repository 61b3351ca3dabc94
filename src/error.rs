//! Error types shared across the crate

use thiserror::Error;

/// Failure to hand a payload to a connection's outbound queue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("connection is closed")]
    Closed,

    #[error("outbound queue is full")]
    QueueFull,
}

/// Failure reported by a social-graph collaborator
#[derive(Debug, Clone, Error)]
pub enum PeerListError {
    #[error("social graph unavailable: {0}")]
    Unavailable(String),
}

/// Relationship store errors
#[derive(Debug, Error)]
pub enum SocialError {
    #[error("cannot send a friend request to yourself")]
    SelfFriend,

    #[error("cannot send friend request")]
    Blocked,

    #[error("already friends with this user")]
    AlreadyFriends,

    #[error("a friend request already exists")]
    RequestExists,

    #[error("friend request not found or you are not the recipient")]
    RequestNotFound,

    #[error("not friends with this user")]
    NotFriends,

    #[error("cannot block yourself")]
    SelfBlock,

    #[error("user already blocked")]
    AlreadyBlocked,

    #[error("block not found")]
    BlockNotFound,

    #[error("failed to read social graph seed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid social graph seed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
