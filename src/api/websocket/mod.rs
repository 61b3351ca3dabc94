//! WebSocket transport for presence sessions
//!
//! Provides the `/ws` endpoint. Each authenticated connection becomes one
//! presence session; the server pushes `peer_online` / `peer_offline`
//! messages and ignores anything the client sends beyond liveness.

pub mod handler;

pub use handler::ws_handler;
