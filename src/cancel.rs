use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MapError, MapResult};

/// Cooperative cancellation flag, checked between files.
///
/// Clones share the same flag, so a caller can keep one handle and pass
/// another into a long-running extraction or resolution.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> MapResult<()> {
        if self.is_cancelled() {
            Err(MapError::Cancelled)
        } else {
            Ok(())
        }
    }
}
