use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag, checked between byte transfers.
///
/// Cancelling never rolls back bytes already written.
///
/// # Examples
/// ```
/// use dalimem_core::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What a write may do when it finds a lockable bank locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnlockPolicy {
    /// Fail with `BankLocked`.
    #[default]
    Never,
    /// Unlock for the write, re-lock on every exit path.
    Scoped,
    /// Unlock and leave the bank unlocked.
    Persistent,
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub cancel: Option<CancelToken>,
}

impl ReadOptions {
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub unlock: UnlockPolicy,
    pub cancel: Option<CancelToken>,
}

impl WriteOptions {
    pub fn with_unlock(mut self, policy: UnlockPolicy) -> Self {
        self.unlock = policy;
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}
