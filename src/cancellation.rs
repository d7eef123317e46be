use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{SerializerError, SerializerResult};

/// Batch-level cancellation flag for save and load operations.
///
/// The serializer checks the token before issuing each file read or write.
/// Encode and decode jobs that were already dispatched always run to
/// completion so no buffer is left without an owner.
///
/// Cloning a token creates another handle to the same flag. Calling
/// [`cancel()`](CancellationToken::cancel) on any clone affects all.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new token (not cancelled).
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signals cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Checkpoint before issuing one item of a batch.
    pub fn check(&self) -> SerializerResult<()> {
        if self.is_cancelled() {
            Err(SerializerError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_token_is_not_cancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn clone_shares_state() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();

        token2.cancel();

        assert!(token1.is_cancelled());
        assert!(token2.is_cancelled());
    }

    #[test]
    fn check_reports_cancelled() {
        let token = CancellationToken::default();
        assert!(token.check().is_ok());
        token.cancel();
        assert!(matches!(token.check(), Err(SerializerError::Cancelled)));
    }

    #[test]
    fn visible_across_threads() {
        let token = CancellationToken::new();
        let remote = token.clone();
        std::thread::spawn(move || remote.cancel()).join().unwrap();
        assert!(token.is_cancelled());
    }
}
