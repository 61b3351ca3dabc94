//! API module for HTTP and WebSocket endpoints
//!
//! WebSocket sessions for players, internal presence lookups for other
//! services, and a health check.

pub mod auth;
pub mod http;
pub mod rest;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use state::AppState;
