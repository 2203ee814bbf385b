use smol::channel::{Receiver, Sender};

/// Cancellation token shared between a caller and an in-flight pass.
///
/// Clones observe the same state. Cancelling closes an internal channel that
/// never carries messages, which wakes every task awaiting [`cancelled`].
///
/// [`cancelled`]: CancelToken::cancelled
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = smol::channel::bounded(1);
        Self { tx, rx }
    }

    pub fn cancel(&self) {
        self.tx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once [`cancel`](CancelToken::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        // Nothing is ever sent, so recv only returns when the channel closes.
        let _ = self.rx.recv().await;
    }

    /// Consume this clone into a guard that cancels the token when dropped.
    pub fn drop_guard(self) -> CancelGuard {
        CancelGuard { token: self }
    }
}

/// Cancels its token on drop. Tie one to a future to abort work that the
/// future started elsewhere once the future itself is dropped.
#[derive(Debug)]
pub struct CancelGuard {
    token: CancelToken,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn cancelled_future_resolves_after_cancel() {
        let token = CancelToken::new();
        token.cancel();
        smol::block_on(token.cancelled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn guard_cancels_on_drop() {
        let token = CancelToken::new();
        let guard = token.clone().drop_guard();
        assert!(!token.is_cancelled());
        drop(guard);
        assert!(token.is_cancelled());
    }

    #[test]
    fn guard_cancels_when_owning_future_is_dropped() {
        let token = CancelToken::new();
        let guard = token.clone().drop_guard();
        let fut = async move {
            let _guard = guard;
            smol::future::pending::<()>().await;
        };
        let out = smol::block_on(smol::future::or(async { fut.await; false }, async { true }));
        assert!(out);
        assert!(token.is_cancelled());
    }
}
