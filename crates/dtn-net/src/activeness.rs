//! Activeness handlers — time windows in which an interface may be powered on.

use std::sync::Arc;

/// Predicate over simulation time that says whether an interface is allowed
/// to be on.
///
/// `jitter` is the interface's own random offset in seconds; it shifts the
/// predicate so that interfaces sharing a schedule do not all toggle on the
/// same instant.  Handlers are shared immutably between the interfaces that
/// replicate from one prototype, hence the `Arc` alias below.
pub trait ActivenessHandler: Send + Sync {
    fn is_active(&self, now: f64, jitter: f64) -> bool;
}

/// Shared handle to a handler, cloned on interface replication.
pub type SharedActiveness = Arc<dyn ActivenessHandler>;

/// Activeness defined by a list of inclusive `[start, end]` windows.
///
/// The jitter offset shifts every window forward, so an interface with
/// jitter `j` is active during `[start + j, end + j]`.
pub struct ActiveWindows {
    windows: Vec<(f64, f64)>,
}

impl ActiveWindows {
    pub fn new(windows: Vec<(f64, f64)>) -> Self {
        Self { windows }
    }
}

impl ActivenessHandler for ActiveWindows {
    fn is_active(&self, now: f64, jitter: f64) -> bool {
        self.windows
            .iter()
            .any(|&(start, end)| now >= start + jitter && now <= end + jitter)
    }
}
