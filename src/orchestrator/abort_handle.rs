use std::sync::Arc;

use tokio::sync::watch;

/// Cancels an in-flight call setup from any task. Once aborted it stays aborted.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`abort`](Self::abort) has been called.
    pub(crate) async fn aborted(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this only returns once the flag is set.
        let _ = rx.wait_for(|aborted| *aborted).await;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[tokio::test]
    async fn clones_share_the_flag() {
        let h = AbortHandle::new();
        let other = h.clone();
        let waiter = tokio::spawn(async move { other.aborted().await });
        assert!(!h.is_aborted());
        h.abort();
        waiter.await.unwrap();
        assert!(h.is_aborted());
    }
}
