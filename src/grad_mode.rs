use core::sync::atomic::{AtomicBool, Ordering};

static GRAD_MODE_ENABLED: AtomicBool = AtomicBool::new(true);

/// Process-wide switch for gradient recording.
///
/// While disabled, edge collection short-circuits to an empty list so that
/// inference-only code builds no graph.
#[derive(Debug, Copy, Clone)]
pub struct GradMode;

impl GradMode {
    /// Whether gradient recording is on. Defaults to `true`.
    #[inline]
    pub fn is_enabled() -> bool {
        GRAD_MODE_ENABLED.load(Ordering::Relaxed)
    }

    /// Set the mode, returning the previous value.
    pub fn set_enabled(enabled: bool) -> bool {
        GRAD_MODE_ENABLED.swap(enabled, Ordering::Relaxed)
    }
}

/// Disables gradient recording for its lifetime and restores the previous mode
/// on drop.
#[must_use]
#[derive(Debug)]
pub struct NoGradGuard {
    prev: bool,
}

impl NoGradGuard {
    /// Disable gradient recording until the guard is dropped.
    pub fn new() -> Self {
        Self {
            prev: GradMode::set_enabled(false),
        }
    }
}

impl Default for NoGradGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NoGradGuard {
    fn drop(&mut self) {
        GradMode::set_enabled(self.prev);
    }
}
