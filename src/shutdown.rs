use futures_util::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cancellation that stays set once triggered, so a trigger that lands while nobody
/// is waiting is still seen at the next check.
#[derive(Clone, Debug, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.inner.triggered.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once `trigger` has been called, immediately if it already was.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // register before checking the flag so a concurrent trigger cannot slip between
        notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

/// Await the next item from a stream or a shutdown signal.
///
/// - Returns `Ok(Some(item))` when the stream yields
/// - Returns `Ok(None)` when the stream ends
/// - Returns `Err(())` on shutdown
pub async fn select_stream_or_shutdown<T>(
    mut stream: Pin<&mut (dyn Stream<Item = T> + Send)>,
    shutdown: &Shutdown,
) -> Result<Option<T>, ()> {
    tokio::select! {
        _ = shutdown.cancelled() => Err(()),
        item = stream.next() => Ok(item),
    }
}
