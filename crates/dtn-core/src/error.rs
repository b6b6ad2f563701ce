//! Error types shared by every `dtn-*` crate.
//!
//! Two distinct failure families, per the error model of the simulator:
//!
//! * [`SettingsError`] — rejected configuration, detected while building the
//!   world.  The simulation never starts.
//! * [`SimError`] — a broken runtime invariant (corrupt connection graph,
//!   unknown bus key, bad address lookup).  These signal programmer error or
//!   data corruption and terminate the run; they are never retried.
//!
//! Everything else — an interface going inactive, a scan finding no peers,
//! an event queue draining empty — is normal control flow, not an error.

use thiserror::Error;

use crate::{ConnectionId, HostAddress, InterfaceId};

/// Invalid configuration, surfaced before the run starts.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("setting {key} must not be negative (got {value})")]
    Negative { key: &'static str, value: f64 },

    #[error("setting {key} must be positive (got {value})")]
    NonPositive { key: &'static str, value: f64 },

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// A broken simulation invariant.  Fatal: the run terminates with this
/// diagnostic.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("no host at address {0}")]
    NoSuchHost(HostAddress),

    #[error("host at index {index} has address {address}; address-index invariant broken")]
    AddressMismatch { index: usize, address: HostAddress },

    #[error("{connection} not found on peer {interface}")]
    ConnectionNotFound {
        connection: ConnectionId,
        interface:  InterfaceId,
    },

    #[error("host {host} has no interface of type {interface_type:?}")]
    NoSuchInterface {
        host:           HostAddress,
        interface_type: String,
    },

    #[error("unexpected module bus key {0:?}")]
    UnexpectedBusKey(String),

    #[error("module bus key {key:?} carries the wrong type (expected {expected})")]
    BusValueType { key: String, expected: &'static str },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Shorthand result type for all `dtn-*` crates.
pub type SimResult<T> = Result<T, SimError>;
