//! Shutdown coordination.
//!
//! One channel, many producers, one consumer. The OS signal listener and the
//! dispatcher (on any fatal handler error) both hold a [`Shutdown`]; the
//! process owner holds the only [`ShutdownListener`] and starts the graceful
//! stop when the first notice arrives.
//!
//! Signalling never blocks and only the first notice is delivered. A burst of
//! concurrent faults therefore starts exactly one shutdown sequence.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Why the process is going down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// A handler returned a fatal error.
    Fault { trace_id: Option<String> },
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => f.write_str("interrupt"),
            Self::Terminate => f.write_str("terminate"),
            Self::Fault { trace_id: Some(id) } => write!(f, "fault in request {id}"),
            Self::Fault { trace_id: None } => f.write_str("fault"),
        }
    }
}

struct Inner {
    fired: AtomicBool,
    tx: mpsc::Sender<ShutdownReason>,
}

/// Producer handle. Cheap to clone.
#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

/// The single consumer.
pub struct ShutdownListener {
    rx: mpsc::Receiver<ShutdownReason>,
}

/// Create a connected producer / consumer pair.
pub fn channel() -> (Shutdown, ShutdownListener) {
    let (tx, rx) = mpsc::channel(1);
    let inner = Arc::new(Inner { fired: AtomicBool::new(false), tx });
    (Shutdown { inner }, ShutdownListener { rx })
}

impl Shutdown {
    /// Request a graceful shutdown.
    ///
    /// Returns `true` if this call delivered the notice, `false` if a notice
    /// was already sent (or the listener is gone).
    pub fn signal(&self, reason: ShutdownReason) -> bool {
        if self.inner.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner.tx.try_send(reason).is_ok()
    }

    pub fn is_signalled(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shutdown").field("signalled", &self.is_signalled()).finish()
    }
}

impl ShutdownListener {
    /// Wait for the notice. `None` once every producer has been dropped
    /// without signalling.
    pub async fn recv(&mut self) -> Option<ShutdownReason> {
        self.rx.recv().await
    }

    /// Non-blocking check, mostly for tests.
    pub fn try_recv(&mut self) -> Option<ShutdownReason> {
        self.rx.try_recv().ok()
    }
}

/// Forward SIGINT / SIGTERM into `shutdown`.
///
/// On Unix this listens for both **SIGTERM** (sent by the container runtime)
/// and **SIGINT** (Ctrl-C, for local dev). On other platforms only Ctrl-C.
pub fn listen_for_os_signals(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to install Ctrl-C handler: {e}");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let sigterm = async {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!("failed to install SIGTERM handler: {e}");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let sigterm = std::future::pending::<()>();

        let reason = tokio::select! {
            () = ctrl_c  => ShutdownReason::Interrupt,
            () = sigterm => ShutdownReason::Terminate,
        };
        info!(%reason, "os signal received");
        shutdown.signal(reason);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_first_notice_is_delivered() {
        let (shutdown, mut listener) = channel();

        assert!(shutdown.signal(ShutdownReason::Fault { trace_id: Some("a".into()) }));
        assert!(!shutdown.signal(ShutdownReason::Terminate));
        assert!(!shutdown.clone().signal(ShutdownReason::Interrupt));

        assert_eq!(
            listener.try_recv(),
            Some(ShutdownReason::Fault { trace_id: Some("a".into()) })
        );
        assert_eq!(listener.try_recv(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_signals_deliver_exactly_one() {
        let (shutdown, mut listener) = channel();

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    shutdown.signal(ShutdownReason::Fault { trace_id: Some(i.to_string()) })
                })
            })
            .collect();

        let mut delivered = 0;
        for task in tasks {
            if task.await.unwrap() {
                delivered += 1;
            }
        }

        assert_eq!(delivered, 1);
        assert!(listener.recv().await.is_some());
        assert_eq!(listener.try_recv(), None);
    }

    #[tokio::test]
    async fn recv_ends_when_producers_are_gone() {
        let (shutdown, mut listener) = channel();
        drop(shutdown);
        assert_eq!(listener.recv().await, None);
    }
}
