//! Shared application state for HTTP and WebSocket handlers

use std::sync::Arc;

use super::auth::{JwtAuth, SharedJwtAuth};
use crate::config::{ServerConfig, DEFAULT_OUTBOUND_BUFFER};
use crate::presence::{ConnectionRegistry, PresenceQuery, SessionConfig};
use crate::social::SocialGraph;

pub struct AppState {
    /// The presence registry sessions register into
    pub registry: ConnectionRegistry,

    /// Read-only view used by internal and health endpoints
    pub query: PresenceQuery,

    /// Relationship store behind /friends and /blocks
    pub social: Arc<SocialGraph>,

    /// Player token validation
    pub auth: SharedJwtAuth,

    /// Bearer secret for /internal routes
    pub service_secret: String,

    pub session: SessionConfig,

    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
}

impl AppState {
    pub fn new(
        registry: ConnectionRegistry,
        social: Arc<SocialGraph>,
        auth: SharedJwtAuth,
        service_secret: String,
    ) -> Self {
        Self {
            query: PresenceQuery::new(registry.clone()),
            registry,
            social,
            auth,
            service_secret,
            session: SessionConfig::default(),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }

    /// Build state from loaded configuration
    pub fn from_config(
        registry: ConnectionRegistry,
        social: Arc<SocialGraph>,
        config: &ServerConfig,
    ) -> Self {
        let mut state = Self::new(
            registry,
            social,
            Arc::new(JwtAuth::new(&config.jwt_secret)),
            config.service_secret.clone(),
        );
        state.session = config.session();
        state.outbound_buffer = config.outbound_buffer;
        state
    }
}
