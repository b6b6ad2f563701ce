//! Simulation time model.
//!
//! # Design
//!
//! Time is a monotonically non-decreasing `f64` in simulated seconds, owned
//! by the world and mutated only by the stepping loop (and the warmup pass,
//! which explicitly runs in negative time and resets to zero at the end).
//! There is no process-wide clock: the current time is threaded down call
//! chains as a plain `now: f64`, which keeps parallel runs in one process
//! possible and makes every time-dependent function trivially testable.

/// The simulation clock.
///
/// Cheap to copy, holds no heap data.  `int_time()` is the floor of the
/// current time and doubles as the per-tick shuffle seed, so its exact
/// rounding is load-bearing for reproducibility.
#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    time: f64,
}

impl SimClock {
    /// A clock at t = 0.
    pub fn new() -> Self {
        Self { time: 0.0 }
    }

    /// Current simulation time in seconds.
    #[inline]
    pub fn time(self) -> f64 {
        self.time
    }

    /// Current simulation time rounded down to whole seconds.
    #[inline]
    pub fn int_time(self) -> i64 {
        self.time.floor() as i64
    }

    /// Jump to an absolute time.
    #[inline]
    pub fn set_time(&mut self, t: f64) {
        self.time = t;
    }

    /// Advance by `dt` seconds.
    #[inline]
    pub fn advance(&mut self, dt: f64) {
        self.time += dt;
    }
}

impl std::fmt::Display for SimClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={:.4}", self.time)
    }
}
