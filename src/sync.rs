//! CPU-GPU synchronization primitives.
//!
//! A [`Fence`] is the completion signal associated with a submitted ring
//! slot. The submission layer (or the test harness standing in for the GPU)
//! signals it when the device has finished consuming the slot; the ring
//! waits on it before handing the slot back to the CPU.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Status of a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    /// The fence has not yet been signaled.
    Unsignaled,
    /// The fence has been signaled (GPU work complete).
    Signaled,
}

#[derive(Debug)]
struct FenceInner {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

/// CPU-GPU synchronization primitive.
///
/// Clones share state: the clone handed out at submission time and the one
/// kept by the ring observe the same signal.
#[derive(Debug, Clone)]
pub struct Fence {
    inner: Arc<FenceInner>,
}

impl Fence {
    /// Create a new fence in the unsignaled state.
    pub fn new_unsignaled() -> Self {
        Self::with_state(false)
    }

    /// Create a new fence in the signaled state.
    pub fn new_signaled() -> Self {
        Self::with_state(true)
    }

    fn with_state(signaled: bool) -> Self {
        Self {
            inner: Arc::new(FenceInner {
                signaled: Mutex::new(signaled),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Check the current status of the fence.
    pub fn status(&self) -> FenceStatus {
        if *self.inner.signaled.lock() {
            FenceStatus::Signaled
        } else {
            FenceStatus::Unsignaled
        }
    }

    /// Check if the fence is signaled (non-blocking).
    pub fn is_signaled(&self) -> bool {
        self.status() == FenceStatus::Signaled
    }

    /// Signal the fence, waking all waiters.
    ///
    /// Called by the submission layer when the GPU finishes consuming the
    /// work associated with this fence.
    pub fn signal(&self) {
        let mut signaled = self.inner.signaled.lock();
        *signaled = true;
        self.inner.condvar.notify_all();
    }

    /// Reset the fence to the unsignaled state.
    ///
    /// Must only be called when no GPU work is pending on this fence.
    pub fn reset(&self) {
        *self.inner.signaled.lock() = false;
    }

    /// Wait for the fence to be signaled (blocking).
    ///
    /// Returns immediately if already signaled.
    pub fn wait(&self) {
        let mut signaled = self.inner.signaled.lock();
        while !*signaled {
            self.inner.condvar.wait(&mut signaled);
        }
    }

    /// Wait for the fence with a timeout.
    ///
    /// Returns `true` if the fence was signaled, `false` if the timeout
    /// elapsed first.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut signaled = self.inner.signaled.lock();
        while !*signaled {
            if self
                .inner
                .condvar
                .wait_until(&mut signaled, deadline)
                .timed_out()
            {
                return *signaled;
            }
        }
        true
    }
}

impl Default for Fence {
    fn default() -> Self {
        Self::new_unsignaled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_unsignaled() {
        let fence = Fence::new_unsignaled();
        assert_eq!(fence.status(), FenceStatus::Unsignaled);
        assert!(!fence.is_signaled());
    }

    #[test]
    fn test_fence_signal_and_wait() {
        let fence = Fence::new_unsignaled();

        let fence_clone = fence.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            fence_clone.signal();
        });

        fence.wait();
        assert!(fence.is_signaled());
    }

    #[test]
    fn test_fence_wait_timeout_elapses() {
        let fence = Fence::new_unsignaled();
        assert!(!fence.wait_timeout(Duration::from_millis(10)));
        assert!(!fence.is_signaled());
    }

    #[test]
    fn test_fence_wait_timeout_signaled() {
        let fence = Fence::new_unsignaled();

        let fence_clone = fence.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            fence_clone.signal();
        });

        assert!(fence.wait_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_fence_reset() {
        let fence = Fence::new_signaled();
        assert!(fence.is_signaled());
        fence.reset();
        assert!(!fence.is_signaled());
    }

    #[test]
    fn test_fence_clone_shares_state() {
        let fence1 = Fence::new_unsignaled();
        let fence2 = fence1.clone();

        fence1.signal();
        assert!(fence2.is_signaled());
    }
}
