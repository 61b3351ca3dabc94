//! Presence Hub
//!
//! Tracks which accounts hold a live WebSocket connection and tells each
//! account's confirmed friends when it comes online or goes offline.
//!
//! # Features
//!
//! - **One connection per account**: reconnecting supersedes and closes the old socket
//! - **Exactly-once transitions**: one event per register and per effective unregister
//! - **Best-effort fan-out**: peer lookups and pushes never block or fail registration
//! - **Guaranteed cleanup**: sessions unregister on every exit path
//!
//! # Modules
//!
//! - `presence`: Connection registry, fan-out notifier, session lifecycle, query facade
//! - `social`: In-memory friendship and block store, used as the peer lister
//! - `api`: WebSocket transport, JWT auth, friend/block and internal REST endpoints
//! - `types`: Account ids and presence events
//! - `config`: Environment configuration
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use presence_hub::api::{create_router, AppState};
//! use presence_hub::config::ServerConfig;
//! use presence_hub::presence::ConnectionRegistry;
//! use presence_hub::social::SocialGraph;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let social = Arc::new(SocialGraph::new());
//!     let registry = ConnectionRegistry::new(social.clone());
//!     let app = create_router(Arc::new(AppState::from_config(registry, social, &config)));
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod presence;
pub mod social;
pub mod types;

// Re-export commonly used items at crate root
pub use config::ServerConfig;
pub use error::{ConfigError, PeerListError, PushError, SocialError};
pub use presence::{
    ConnectionHandle, ConnectionRegistry, PeerLister, PresenceQuery, Session, SessionEnd,
};
pub use social::SocialGraph;
pub use types::{AccountId, PeerNotification, PresenceEvent, PresenceKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
