//! Per-host radio interfaces.
//!
//! A [`NetworkInterface`] holds the state every radio variant shares: type
//! tag, range, speed, scan duty cycle, activeness, and the list of live
//! connection IDs.  Variant-specific behavior (how link speed is derived)
//! is dispatched over the [`RadioModel`] enum by the engine.
//!
//! Interfaces are built once from settings as *prototypes* and then
//! [`replicate`](NetworkInterface::replicate)d onto each host.  A replica
//! gets its own RNG-drawn activeness jitter and initial scan phase — the
//! draw that desynchronizes scan rounds across the population — and starts
//! unattached with no connections.

use std::sync::Arc;

use dtn_core::{
    BusValue, ConnectionId, HostAddress, InterfaceId, SettingsError, SimError, SimResult, SimRng,
    RANGE_ID, SCAN_INTERVAL_ID, SPEED_ID,
};

use crate::activeness::SharedActiveness;

// ── RadioModel ────────────────────────────────────────────────────────────────

/// Concrete radio variant, selecting how link speed is derived.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RadioModel {
    /// Fixed-rate links at the initiator's nominal transmit speed.
    #[default]
    SimpleBroadcast,
    /// Link speed degrades linearly with distance: at zero distance the
    /// nominal speed, at the effective range edge zero.  Refreshed on every
    /// update of the initiating interface, so speeds track host movement.
    DistanceCapacity,
}

// ── NetSettings ───────────────────────────────────────────────────────────────

/// Configuration of one interface prototype.
///
/// `transmit_range` and `transmit_speed` are required and must be
/// non-negative; the rest default to "always scanning, no jitter,
/// simple broadcast".
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetSettings {
    /// Groups interfaces that can connect to each other; two interfaces are
    /// compatible iff their types match.
    pub interface_type: String,
    /// Radio range in world units.  Zero means the interface can never form
    /// connections on its own.
    pub transmit_range: f64,
    /// Transmit speed in bits per second.
    pub transmit_speed: i32,
    /// Seconds between scan rounds; 0 = continuously scanning.
    pub scan_interval: f64,
    /// Upper bound (exclusive) of the per-interface activeness jitter draw.
    pub activeness_jitter_max: u32,
    /// Radio variant.
    pub radio: RadioModel,
}

impl NetSettings {
    pub fn new(interface_type: &str, transmit_range: f64, transmit_speed: i32) -> Self {
        Self {
            interface_type: interface_type.to_owned(),
            transmit_range,
            transmit_speed,
            scan_interval: 0.0,
            activeness_jitter_max: 0,
            radio: RadioModel::SimpleBroadcast,
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.transmit_range < 0.0 {
            return Err(SettingsError::Negative {
                key:   "transmitRange",
                value: self.transmit_range,
            });
        }
        if self.transmit_speed < 0 {
            return Err(SettingsError::Negative {
                key:   "transmitSpeed",
                value: self.transmit_speed as f64,
            });
        }
        if self.scan_interval < 0.0 {
            return Err(SettingsError::Negative {
                key:   "scanInterval",
                value: self.scan_interval,
            });
        }
        if self.interface_type.is_empty() {
            return Err(SettingsError::Invalid {
                key:    "interfaceType",
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

// ── NetworkInterface ──────────────────────────────────────────────────────────

/// One radio, living in the engine's interface arena.
pub struct NetworkInterface {
    pub(crate) id:   InterfaceId,
    /// Owning host; `INVALID` until the interface is attached.
    pub(crate) host: HostAddress,

    interface_type: Arc<str>,

    pub(crate) transmit_range:     f64,
    /// Shadow of the range while activeness has zeroed it on the bus.
    pub(crate) old_transmit_range: f64,
    pub(crate) transmit_speed:     i32,

    scan_interval:  f64,
    last_scan_time: f64,

    pub(crate) activeness: Option<SharedActiveness>,
    pub(crate) jitter:     u32,
    jitter_max:            u32,

    pub(crate) radio:       RadioModel,
    pub(crate) connections: Vec<ConnectionId>,
    /// Whether the interface is registered with a connectivity grid
    /// (false iff it was configured with zero range).
    pub(crate) registered:  bool,
}

impl NetworkInterface {
    /// Build a prototype from settings, drawing its jitter and scan phase
    /// from the run's init RNG.
    pub fn from_settings(settings: &NetSettings, rng: &mut SimRng) -> Result<Self, SettingsError> {
        settings.validate()?;
        let (jitter, last_scan_time) =
            draw_phases(settings.activeness_jitter_max, settings.scan_interval, rng);
        Ok(Self {
            id:   InterfaceId::INVALID,
            host: HostAddress::INVALID,
            interface_type: Arc::from(settings.interface_type.as_str()),
            transmit_range: settings.transmit_range,
            old_transmit_range: settings.transmit_range,
            transmit_speed: settings.transmit_speed,
            scan_interval: settings.scan_interval,
            last_scan_time,
            activeness: None,
            jitter,
            jitter_max: settings.activeness_jitter_max,
            radio: settings.radio,
            connections: Vec::new(),
            registered: false,
        })
    }

    /// Install an activeness handler on this prototype.  Replicas share it.
    pub fn with_activeness(mut self, handler: SharedActiveness) -> Self {
        self.activeness = Some(handler);
        self
    }

    /// Produce a fresh interface with the same configuration.
    ///
    /// The copy draws its own activeness jitter and initial scan phase,
    /// starts with no connections, and is unattached until the engine binds
    /// it to a host.
    pub fn replicate(&self, rng: &mut SimRng) -> Self {
        let (jitter, last_scan_time) = draw_phases(self.jitter_max, self.scan_interval, rng);
        Self {
            id:   InterfaceId::INVALID,
            host: HostAddress::INVALID,
            interface_type: Arc::clone(&self.interface_type),
            transmit_range: self.transmit_range,
            old_transmit_range: self.transmit_range,
            transmit_speed: self.transmit_speed,
            scan_interval: self.scan_interval,
            last_scan_time,
            activeness: self.activeness.as_ref().map(Arc::clone),
            jitter,
            jitter_max: self.jitter_max,
            radio: self.radio,
            connections: Vec::new(),
            registered: false,
        }
    }

    // ── Bus callback ──────────────────────────────────────────────────────

    /// React to a change of a subscribed bus property.
    ///
    /// Recognized keys update the scan interval, transmit speed, or radio
    /// range.  Any other key is a fatal invariant violation — an interface
    /// is only ever subscribed to the three `Network.*` properties.
    pub fn module_value_changed(&mut self, key: &str, value: BusValue) -> SimResult<()> {
        match key {
            SCAN_INTERVAL_ID => {
                self.scan_interval = expect_double(key, value)?;
            }
            SPEED_ID => {
                self.transmit_speed = value.as_int().ok_or_else(|| SimError::BusValueType {
                    key:      key.to_owned(),
                    expected: "Int",
                })?;
            }
            RANGE_ID => {
                self.transmit_range = expect_double(key, value)?;
            }
            other => return Err(SimError::UnexpectedBusKey(other.to_owned())),
        }
        Ok(())
    }

    // ── Scan duty cycle ───────────────────────────────────────────────────

    /// Whether `now` falls in a scan pulse, advancing the scan round when a
    /// new one starts.  Callers must have established that the interface is
    /// active; an inactive interface never scans.
    pub(crate) fn scan_pulse(&mut self, now: f64) -> bool {
        if self.scan_interval > 0.0 {
            if now < self.last_scan_time {
                // not yet time for the first scan round
                return false;
            }
            if now > self.last_scan_time + self.scan_interval {
                self.last_scan_time = now;
                return true;
            }
            return now == self.last_scan_time;
        }
        // no duty cycle: continuously scanning
        true
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn id(&self) -> InterfaceId {
        self.id
    }

    /// Owning host, or `HostAddress::INVALID` for an unattached prototype.
    pub fn host(&self) -> HostAddress {
        self.host
    }

    pub fn interface_type(&self) -> &str {
        &self.interface_type
    }

    pub(crate) fn type_tag(&self) -> &Arc<str> {
        &self.interface_type
    }

    pub fn transmit_range(&self) -> f64 {
        self.transmit_range
    }

    pub fn transmit_speed(&self) -> i32 {
        self.transmit_speed
    }

    pub fn scan_interval(&self) -> f64 {
        self.scan_interval
    }

    pub fn last_scan_time(&self) -> f64 {
        self.last_scan_time
    }

    pub fn radio(&self) -> RadioModel {
        self.radio
    }

    /// IDs of this interface's live connections, in creation order.
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }
}

impl std::fmt::Display for NetworkInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{} on {}, range {}]",
            self.id, self.interface_type, self.host, self.transmit_range
        )
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Draw the per-interface activeness jitter and initial scan phase.
fn draw_phases(jitter_max: u32, scan_interval: f64, rng: &mut SimRng) -> (u32, f64) {
    let jitter = if jitter_max > 0 {
        rng.gen_range(0..jitter_max)
    } else {
        0
    };
    let last_scan = if scan_interval > 0.0 {
        rng.gen_range(0.0..scan_interval)
    } else {
        0.0
    };
    (jitter, last_scan)
}

fn expect_double(key: &str, value: BusValue) -> SimResult<f64> {
    value.as_double().ok_or_else(|| SimError::BusValueType {
        key:      key.to_owned(),
        expected: "Double",
    })
}
