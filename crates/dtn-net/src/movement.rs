//! The movement-model seam.
//!
//! Movement models are external collaborators: the core only asks "where is
//! this host after `dt` more seconds?" once per tick.  The two bundled
//! implementations cover stationary infrastructure nodes and the
//! constant-velocity traces that connectivity tests are written against;
//! real mobility models plug in through the same trait.

use dtn_core::{Coord, HostAddress};

/// Produces a host's next position per simulation step.
pub trait MovementModel: Send {
    /// The position of `host` after moving for `dt` seconds from `from`.
    fn step(&mut self, host: HostAddress, from: Coord, dt: f64) -> Coord;
}

/// A host that never moves.
pub struct StationaryMovement;

impl MovementModel for StationaryMovement {
    fn step(&mut self, _host: HostAddress, from: Coord, _dt: f64) -> Coord {
        from
    }
}

/// Constant-velocity movement along a straight line.
pub struct LinearMovement {
    /// World units per second along each axis.
    pub velocity: (f64, f64),
}

impl LinearMovement {
    pub fn new(vx: f64, vy: f64) -> Self {
        Self { velocity: (vx, vy) }
    }
}

impl MovementModel for LinearMovement {
    fn step(&mut self, _host: HostAddress, from: Coord, dt: f64) -> Coord {
        from.translated(self.velocity.0 * dt, self.velocity.1 * dt)
    }
}
