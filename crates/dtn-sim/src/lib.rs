//! `dtn-sim` — the stepping loop of the dtn opportunistic-network
//! simulator.
//!
//! # One tick
//!
//! ```text
//! World::update():
//!   ① Pacing    — optionally sleep until the wall clock catches up.
//!   ② Events    — drain all queue events due within the interval; after
//!                 each one, run a full host-update pass.
//!   ③ Movement  — every host moves by the full nominal interval.
//!   ④ Clock     — jump to the end of the interval.
//!   ⑤ Update    — host-update pass (connectivity + router hooks), in
//!                 shuffled order seeded by the tick's integer time.
//!   ⑥ Fan-out   — notify every UpdateListener.
//! ```
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use dtn_net::{NetSettings, StationaryMovement};
//! use dtn_sim::{WorldBuilder, WorldSettings};
//!
//! let mut b = WorldBuilder::new(WorldSettings::default());
//! let radio = b.register_interface(&NetSettings::new("T", 10.0, 250_000))?;
//! b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[radio]);
//! b.add_host(Coord::new(5.0, 0.0), Box::new(StationaryMovement), &[radio]);
//! let mut world = b.build()?;
//! world.update()?;
//! ```

pub mod builder;
pub mod events;
pub mod listener;
pub mod world;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use builder::{ProtoId, WorldBuilder};
pub use events::{EventKind, EventQueue, ExternalEvent, ScheduledUpdatesQueue, ScriptedEventQueue};
pub use listener::UpdateListener;
pub use world::{CancelHandle, World, WorldSettings};
