//! Per-connection session lifecycle
//!
//! `Connecting -> Registered -> Terminating -> Closed`
//!
//! [`Session::run`] registers the handle, then waits on the inbound stream
//! until the peer closes, the transport errors, the handle is closed from
//! elsewhere (supersession or a failed write) or the optional idle timeout
//! fires. Unregistering is owned by a guard dropped on every exit path,
//! including cancellation of the task running the session.

use std::fmt;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::time::error::Elapsed;

use super::handle::{CloseSignal, ConnectionHandle, ConnectionId};
use super::registry::ConnectionRegistry;
use crate::types::AccountId;

/// Inbound transport frame
pub trait Frame {
    /// Whether the frame is the peer's close request
    fn is_close(&self) -> bool;
}

impl Frame for axum::extract::ws::Message {
    fn is_close(&self) -> bool {
        matches!(self, axum::extract::ws::Message::Close(_))
    }
}

/// Lifecycle state of a session, reported in trace logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Connecting,
    Registered,
    Terminating,
    Closed,
}

/// Why a session's liveness loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Peer sent a close frame or the stream ended
    PeerClosed,
    /// Reading from the transport failed
    TransportError,
    /// The handle was closed by a newer registration or a failed write
    HandleClosed,
    /// No inbound frame within the idle timeout
    IdleTimeout,
}

/// Session tuning
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    /// Terminate sessions that stay silent this long
    pub idle_timeout: Option<Duration>,
}

/// Supervisor binding one authenticated account to one connection
pub struct Session {
    registry: ConnectionRegistry,
    account: AccountId,
    config: SessionConfig,
    state: SessionState,
}

impl Session {
    pub fn new(registry: ConnectionRegistry, account: AccountId, config: SessionConfig) -> Self {
        Self {
            registry,
            account,
            config,
            state: SessionState::Connecting,
        }
    }

    /// Register `handle` and supervise it until the connection ends.
    ///
    /// Inbound frames are discarded; they only prove the channel is alive.
    pub async fn run<S, F, E>(mut self, handle: ConnectionHandle, mut inbound: S) -> SessionEnd
    where
        S: Stream<Item = Result<F, E>> + Unpin,
        F: Frame,
        E: fmt::Display,
    {
        let signal = handle.close_signal();
        let connection = handle.id();

        let _guard = RegistrationGuard {
            registry: self.registry.clone(),
            account: self.account,
            connection,
            signal: signal.clone(),
        };
        self.registry.register(self.account, handle);
        self.transition(SessionState::Registered, connection);

        let end = loop {
            let next = tokio::select! {
                _ = signal.closed() => break SessionEnd::HandleClosed,
                next = next_frame(&mut inbound, self.config.idle_timeout) => next,
            };

            match next {
                Err(_) => break SessionEnd::IdleTimeout,
                Ok(None) => break SessionEnd::PeerClosed,
                Ok(Some(Err(e))) => {
                    tracing::debug!(
                        account_id = %self.account,
                        connection = %connection,
                        error = %e,
                        "Transport read failed"
                    );
                    break SessionEnd::TransportError;
                }
                Ok(Some(Ok(frame))) if frame.is_close() => break SessionEnd::PeerClosed,
                Ok(Some(Ok(_))) => continue,
            }
        };

        self.transition(SessionState::Terminating, connection);
        tracing::info!(
            account_id = %self.account,
            connection = %connection,
            reason = ?end,
            "Session ending"
        );
        end
    }

    fn transition(&mut self, next: SessionState, connection: ConnectionId) {
        tracing::trace!(
            account_id = %self.account,
            connection = %connection,
            from = ?self.state,
            to = ?next,
            "Session state change"
        );
        self.state = next;
    }
}

async fn next_frame<S>(inbound: &mut S, idle: Option<Duration>) -> Result<Option<S::Item>, Elapsed>
where
    S: Stream + Unpin,
{
    match idle {
        Some(limit) => tokio::time::timeout(limit, inbound.next()).await,
        None => Ok(inbound.next().await),
    }
}

/// Moves a session to `Closed` when dropped
struct RegistrationGuard {
    registry: ConnectionRegistry,
    account: AccountId,
    connection: ConnectionId,
    signal: CloseSignal,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.registry
            .unregister_connection(self.account, self.connection);
        // Releases the transport's writer
        self.signal.close();
        tracing::debug!(
            account_id = %self.account,
            connection = %self.connection,
            state = ?SessionState::Closed,
            "Session closed"
        );
    }
}
