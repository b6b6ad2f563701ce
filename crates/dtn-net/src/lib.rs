//! `dtn-net` — radio interfaces and the connection graph for the dtn
//! opportunistic-network simulator.
//!
//! # What lives here
//!
//! | Module         | Contents                                             |
//! |----------------|------------------------------------------------------|
//! | [`interface`]  | `NetworkInterface`, `NetSettings`, `RadioModel`      |
//! | [`connection`] | `Connection`, `ConnectionArena`                      |
//! | [`grid`]       | `ConnectivityGrid`, `GridFactory`                    |
//! | [`engine`]     | `NetworkEngine`, `NetCtx` — the connectivity update  |
//! | [`activeness`] | `ActivenessHandler`, `ActiveWindows`                 |
//! | [`host`]       | `Host`, the `Router` callback surface                |
//! | [`movement`]   | `MovementModel` seam and reference implementations   |
//! | [`listener`]   | `ConnectionListener`                                 |
//!
//! The engine owns the interface and connection arenas; the world (in
//! `dtn-sim`) owns hosts and lends them in through [`NetCtx`] per call.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                  |
//! |---------|---------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to settings/value types. |

pub mod activeness;
pub mod connection;
pub mod engine;
pub mod grid;
pub mod host;
pub mod interface;
pub mod listener;
pub mod movement;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use activeness::{ActiveWindows, ActivenessHandler, SharedActiveness};
pub use connection::{Connection, ConnectionArena};
pub use engine::{NetCtx, NetworkEngine};
pub use grid::{ConnectivityGrid, GridFactory};
pub use host::{Host, NoopRouter, Router};
pub use interface::{NetSettings, NetworkInterface, RadioModel};
pub use listener::ConnectionListener;
pub use movement::{LinearMovement, MovementModel, StationaryMovement};
