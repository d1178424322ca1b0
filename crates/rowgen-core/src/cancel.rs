//! Cooperative cancellation of in-flight transfers.
//!
//! A `CancelToken` is cloned into the fetcher; the transfer loop checks it
//! between chunks and stops. A cancelled transfer goes through the same
//! cleanup path as any other failure, so no partial cache entry remains.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared abort flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this token to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
