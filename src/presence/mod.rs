//! Presence core
//!
//! - `registry`: the account → connection map and its ordered fan-out queue
//! - `notifier`: peer fan-out on every presence transition
//! - `session`: per-connection register / liveness / unregister supervisor
//! - `query`: read-only facade for internal callers and health reporting
//! - `handle`: the registry-owned view of one live connection

pub mod handle;
pub mod notifier;
pub mod query;
pub mod registry;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use handle::{CloseSignal, ConnectionHandle, ConnectionId};
pub use notifier::{FanoutNotifier, FanoutReport, PeerLister};
pub use query::PresenceQuery;
pub use registry::ConnectionRegistry;
pub use session::{Frame, Session, SessionConfig, SessionEnd};
