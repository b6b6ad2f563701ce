//! `dtn-core` — foundational types for the dtn opportunistic-network
//! simulator.
//!
//! This crate is a dependency of every other `dtn-*` crate.  It intentionally
//! has no `dtn-*` dependencies and minimal external ones (`rand`,
//! `rustc-hash` and `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module    | Contents                                               |
//! |-----------|--------------------------------------------------------|
//! | [`ids`]   | `HostAddress`, `InterfaceId`, `ConnectionId`           |
//! | [`coord`] | `Coord`, Euclidean distance                            |
//! | [`time`]  | `SimClock`                                             |
//! | [`rng`]   | `SimRng` and the two seeding disciplines               |
//! | [`bus`]   | `ModuleBus`, `BusValue`, well-known key constants      |
//! | [`error`] | `SettingsError`, `SimError`, `SimResult`               |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                              |
//! |---------|-----------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types. |

pub mod bus;
pub mod coord;
pub mod error;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use bus::{BusValue, ModuleBus, ENERGY_VALUE_ID, RANGE_ID, SCAN_INTERVAL_ID, SPEED_ID};
pub use coord::Coord;
pub use error::{SettingsError, SimError, SimResult};
pub use ids::{ConnectionId, HostAddress, InterfaceId};
pub use rng::{SimRng, INIT_RNG_SEED};
pub use time::SimClock;
