//! Connection handles
//!
//! A [`ConnectionHandle`] is the registry's view of one live transport: a
//! bounded outbound queue drained by the transport's writer task, plus a
//! close signal shared with the owning session. Closing is idempotent and
//! only the first call reports `true`.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::error::PushError;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id distinguishing successive handles of the same account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct CloseState {
    token: CancellationToken,
    closed: AtomicBool,
}

/// Shared close flag for a connection
#[derive(Clone)]
pub struct CloseSignal {
    state: Arc<CloseState>,
}

impl CloseSignal {
    fn new() -> Self {
        Self {
            state: Arc::new(CloseState {
                token: CancellationToken::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Close the connection. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        if self.state.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.state.token.cancel();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Resolves once the connection has been closed
    pub async fn closed(&self) {
        self.state.token.cancelled().await
    }
}

impl fmt::Debug for CloseSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloseSignal")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Registry-owned handle to a live connection
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::Sender<Arc<str>>,
    signal: CloseSignal,
}

impl ConnectionHandle {
    /// Create a handle and the receiving end of its outbound queue.
    ///
    /// The receiver belongs to the transport's writer task.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: ConnectionId::next(),
            outbound,
            signal: CloseSignal::new(),
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Signal the session and writer keep to observe closure
    pub fn close_signal(&self) -> CloseSignal {
        self.signal.clone()
    }

    /// Queue a payload without waiting
    pub fn push(&self, payload: Arc<str>) -> Result<(), PushError> {
        if self.signal.is_closed() {
            return Err(PushError::Closed);
        }
        self.outbound.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => PushError::QueueFull,
            TrySendError::Closed(_) => PushError::Closed,
        })
    }

    pub fn close(&self) -> bool {
        self.signal.close()
    }

    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ids_are_unique() {
        let (a, _rx_a) = ConnectionHandle::new(4);
        let (b, _rx_b) = ConnectionHandle::new(4);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_close_reports_first_call_only() {
        let (handle, _rx) = ConnectionHandle::new(4);
        let signal = handle.close_signal();

        assert!(handle.close());
        assert!(!handle.close());
        assert!(!signal.close());
        assert!(signal.is_closed());
    }

    #[tokio::test]
    async fn test_push_delivers_to_receiver() {
        let (handle, mut rx) = ConnectionHandle::new(4);
        handle.push(Arc::from("hello")).unwrap();
        assert_eq!(&*rx.recv().await.unwrap(), "hello");
    }

    #[test]
    fn test_push_after_close_fails() {
        let (handle, _rx) = ConnectionHandle::new(4);
        handle.close();
        assert_eq!(handle.push(Arc::from("x")), Err(PushError::Closed));
    }

    #[test]
    fn test_push_to_full_queue_fails() {
        let (handle, _rx) = ConnectionHandle::new(1);
        handle.push(Arc::from("first")).unwrap();
        assert_eq!(handle.push(Arc::from("second")), Err(PushError::QueueFull));
    }

    #[test]
    fn test_push_after_receiver_dropped_fails() {
        let (handle, rx) = ConnectionHandle::new(1);
        drop(rx);
        assert_eq!(handle.push(Arc::from("x")), Err(PushError::Closed));
    }

    #[tokio::test]
    async fn test_closed_resolves_after_close() {
        let (handle, _rx) = ConnectionHandle::new(1);
        let signal = handle.close_signal();

        let waiter = tokio::spawn(async move { signal.closed().await });
        handle.close();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
