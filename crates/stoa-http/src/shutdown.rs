//! Graceful shutdown coordination.
//!
//! [`ShutdownSignal`] fans a one-time stop notification out to every clone,
//! and [`ConnectionTracker`] counts in-flight connections so the server can
//! drain them before exiting. Both are cheap to clone and share.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{broadcast, Notify};

/// A one-shot, clonable shutdown notification.
///
/// All clones observe the same trigger. Triggering more than once is
/// harmless.
///
/// # Example
///
/// ```
/// use stoa_http::shutdown::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
/// assert!(!shutdown.is_triggered());
///
/// shutdown.trigger();
/// assert!(shutdown.is_triggered());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    /// Set once, never cleared.
    triggered: Arc<AtomicBool>,

    /// Wakes tasks parked in [`recv`](Self::recv).
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Triggers shutdown, waking every waiter. Idempotent.
    pub fn trigger(&self) {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            // No receivers is fine; the flag alone satisfies late waiters.
            let _ = self.sender.send(());
        }
    }

    /// Returns `true` once shutdown has been triggered.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Returns a future that resolves when shutdown is triggered.
    ///
    /// Resolves immediately if the trigger already happened.
    pub fn recv(&self) -> ShutdownReceiver {
        let mut receiver = self.sender.subscribe();
        ShutdownReceiver {
            triggered: Arc::clone(&self.triggered),
            receiver: Box::pin(async move {
                let _ = receiver.recv().await;
            }),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`ShutdownSignal::recv`].
pub struct ShutdownReceiver {
    triggered: Arc<AtomicBool>,
    receiver: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl Future for ShutdownReceiver {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Fast path: trigger happened before we subscribed.
        if self.triggered.load(Ordering::SeqCst) {
            return Poll::Ready(());
        }

        self.receiver.as_mut().poll(cx)
    }
}

/// Waits for SIGTERM or SIGINT.
///
/// On non-Unix platforms only Ctrl+C is wired up.
pub(crate) async fn wait_for_os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        let mut sigint =
            signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                tracing::info!("received SIGINT, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to wait for Ctrl+C");
        tracing::info!("received Ctrl+C, shutting down");
    }
}

/// Counts live connections so shutdown can wait for them to finish.
///
/// Each connection holds a [`ConnectionGuard`]; dropping the guard
/// decrements the count and wakes drain waiters when it reaches zero.
///
/// # Example
///
/// ```
/// use stoa_http::shutdown::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
/// let guard = tracker.acquire();
/// assert_eq!(tracker.active(), 1);
///
/// drop(guard);
/// assert_eq!(tracker.active(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a tracker with no connections.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Registers a connection and returns its guard.
    #[must_use]
    pub fn acquire(&self) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active: Arc::clone(&self.active),
            idle: Arc::clone(&self.idle),
        }
    }

    /// Returns the number of live connections.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits until every guard has been dropped.
    ///
    /// Completes immediately when nothing is active.
    pub async fn wait_idle(&self) {
        while self.active.load(Ordering::SeqCst) > 0 {
            self.idle.notified().await;
        }
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for one live connection.
#[derive(Debug)]
pub struct ConnectionGuard {
    active: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let prev = self.active.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 {
            self.idle.notify_waiters();
        }
    }
}
