//! Scoped single-invocation guard.
//!
//! Acquisition flips a busy flag; `Drop` clears it on every exit path,
//! including early returns and unwinding. A second acquisition while busy
//! fails immediately instead of blocking.

use std::sync::atomic::{AtomicBool, Ordering};

use super::error::ControllerError;

#[derive(Debug)]
pub struct InvocationGuard<'a> {
    busy: &'a AtomicBool,
}

impl<'a> InvocationGuard<'a> {
    pub fn acquire(busy: &'a AtomicBool) -> Result<Self, ControllerError> {
        busy.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| ControllerError::Reentrant)?;
        Ok(Self { busy })
    }
}

impl Drop for InvocationGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
