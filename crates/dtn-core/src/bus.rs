//! The per-host module communication bus.
//!
//! # Design
//!
//! The bus is a late-bound property store used for loose coupling between
//! per-host modules: a radio publishes its effective range, an energy model
//! drains `Energy.value`, and anyone interested subscribes to the keys it
//! cares about.  Keys are dotted strings; values are a small typed variant
//! ([`BusValue`]) rather than anything dynamically typed.
//!
//! Subscribers are recorded as [`InterfaceId`]s.  The bus itself never calls
//! anybody: a property update returns the list of interfaces to notify and
//! the network engine — which owns the interface arena — performs the
//! synchronous fan-out.  Since the whole loop is single-threaded, this is
//! indistinguishable from the bus calling subscribers directly, without the
//! aliasing knots that direct callbacks would tie.

use rustc_hash::FxHashMap;

use crate::InterfaceId;

/// Bus key for the scan cadence of a host's radios (seconds, `Double`).
pub const SCAN_INTERVAL_ID: &str = "Network.scanInterval";
/// Bus key for the current effective radio range (`Double`).
pub const RANGE_ID: &str = "Network.radioRange";
/// Bus key for the radio transmit speed (bits per second, `Int`).
pub const SPEED_ID: &str = "Network.speed";
/// Bus key for remaining battery units (`Double`).  Published by an energy
/// model, if one is installed; this core only reads it.
pub const ENERGY_VALUE_ID: &str = "Energy.value";

// ── BusValue ──────────────────────────────────────────────────────────────────

/// A typed value carried on the bus.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BusValue {
    Double(f64),
    Int(i32),
    Bool(bool),
}

impl BusValue {
    pub fn as_double(self) -> Option<f64> {
        match self {
            BusValue::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(self) -> Option<i32> {
        match self {
            BusValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            BusValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for BusValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusValue::Double(v) => write!(f, "{v}"),
            BusValue::Int(v) => write!(f, "{v}"),
            BusValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

// ── ModuleBus ─────────────────────────────────────────────────────────────────

/// Property store with per-key subscriber lists.  One per host.
#[derive(Default)]
pub struct ModuleBus {
    props:       FxHashMap<String, BusValue>,
    subscribers: FxHashMap<String, Vec<InterfaceId>>,
}

impl ModuleBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a property.  Returns `false` without touching the bus if the
    /// key already exists — a property may be added only once per host.
    pub fn add_property(&mut self, key: &str, value: BusValue) -> bool {
        if self.props.contains_key(key) {
            return false;
        }
        self.props.insert(key.to_owned(), value);
        true
    }

    pub fn contains_property(&self, key: &str) -> bool {
        self.props.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<BusValue> {
        self.props.get(key).copied()
    }

    pub fn get_double(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(BusValue::as_double)
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(BusValue::as_int)
    }

    /// Subscribe `iface` to change notifications for `key`.  Subscriptions
    /// are many-to-one and idempotent.
    pub fn subscribe(&mut self, key: &str, iface: InterfaceId) {
        let subs = self.subscribers.entry(key.to_owned()).or_default();
        if !subs.contains(&iface) {
            subs.push(iface);
        }
    }

    /// Set `key` to `value` (creating it if absent) and return the interfaces
    /// that must be notified, in subscription order.
    ///
    /// The caller is responsible for delivering the notifications before any
    /// further bus mutation — that keeps the observable behavior equal to a
    /// synchronous publish.
    #[must_use = "subscribers must be notified of the change"]
    pub fn update_property(&mut self, key: &str, value: BusValue) -> Vec<InterfaceId> {
        self.props.insert(key.to_owned(), value);
        self.subscribers.get(key).cloned().unwrap_or_default()
    }

    /// Add `delta` to a `Double` property and return the new value plus the
    /// subscribers to notify.  `None` if the property is missing or not a
    /// `Double`.
    #[must_use = "subscribers must be notified of the change"]
    pub fn update_double(&mut self, key: &str, delta: f64) -> Option<(f64, Vec<InterfaceId>)> {
        let new = self.get_double(key)? + delta;
        let subs = self.update_property(key, BusValue::Double(new));
        Some((new, subs))
    }
}
