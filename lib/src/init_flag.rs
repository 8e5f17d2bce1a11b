//! Atomic init-once flags for kernel subsystems.

use core::sync::atomic::{AtomicBool, Ordering};

/// Atomic flag for tracking initialization state.
///
/// Replaces the pattern of a bare `AtomicBool` static plus hand-written
/// accessor functions for every subsystem.
#[repr(transparent)]
pub struct InitFlag {
    flag: AtomicBool,
}

impl InitFlag {
    /// Create a new unset flag.
    #[inline]
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// Atomically attempt to initialize.
    ///
    /// Returns `true` if this call performed the initialization (flag was
    /// previously unset), `false` if already initialized.
    #[inline]
    pub fn init_once(&self) -> bool {
        // swap returns the old value
        !self.flag.swap(true, Ordering::SeqCst)
    }

    /// Check if the flag is set, observing initialization side effects.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Relaxed check for fast paths such as logging guards.
    #[inline]
    pub fn is_set_relaxed(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Explicitly set the flag, publishing initialization side effects.
    #[inline]
    pub fn mark_set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Reset the flag to the unset state.
    #[inline]
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl Default for InitFlag {
    fn default() -> Self {
        Self::new()
    }
}
