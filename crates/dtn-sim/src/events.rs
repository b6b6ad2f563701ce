//! External event queues.
//!
//! Event queues are ordered sources of timestamped occurrences injected into
//! the run from outside the core: forced update passes, trace-driven
//! connectivity, application traffic.  The world polls every registered
//! queue for its next-event time without consuming, drains all events due
//! within the tick in timestamp order, and breaks exact ties by queue
//! registration order.

use std::collections::VecDeque;

use dtn_core::HostAddress;

// ── ExternalEvent ─────────────────────────────────────────────────────────────

/// A timestamped occurrence applied to the world between host-update passes.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalEvent {
    pub time: f64,
    pub kind: EventKind,
}

/// What an event does.  The taxonomy is extensible; everything the core
/// itself reacts to is listed here, anything else belongs to external
/// collaborators behind the router surface.
#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    /// No payload: forces a full host-update pass at the event's time.
    Update,

    /// Trace-driven connectivity: bring a link up (or tear it down) between
    /// two hosts, bypassing range and scanning checks.  `interface_type`
    /// selects which radio; `None` means the host's first interface.
    Connection {
        from: HostAddress,
        to:   HostAddress,
        interface_type: Option<String>,
        up:   bool,
    },

    /// A new application message originates at `from`.  Handed to that
    /// host's routing surface; the core performs no routing itself.
    Message {
        from: HostAddress,
        to:   HostAddress,
        id:   String,
        size: u32,
        response_size: u32,
    },
}

// ── EventQueue ────────────────────────────────────────────────────────────────

/// An ordered source of external events.
pub trait EventQueue: Send {
    /// Timestamp of the next event without consuming it;
    /// `f64::INFINITY` when the queue is drained.
    fn next_event_time(&self) -> f64;

    /// Return and consume the next event.  `None` when drained.
    fn next_event(&mut self) -> Option<ExternalEvent>;
}

// ── ScheduledUpdatesQueue ─────────────────────────────────────────────────────

/// Queue of no-op events whose sole effect is to force a host-update pass
/// at a given time.
///
/// Kept sorted on insert; scheduling two updates for the exact same time
/// collapses them into one — a second pass at the same instant would
/// observe nothing new.
#[derive(Default)]
pub struct ScheduledUpdatesQueue {
    times: VecDeque<f64>,
}

impl ScheduledUpdatesQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a host-update pass at time `t`.
    pub fn add_update(&mut self, t: f64) {
        match self.times.binary_search_by(|probe| probe.total_cmp(&t)) {
            Ok(_) => {} // an update at this exact time is already scheduled
            Err(pos) => self.times.insert(pos, t),
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

impl EventQueue for ScheduledUpdatesQueue {
    fn next_event_time(&self) -> f64 {
        self.times.front().copied().unwrap_or(f64::INFINITY)
    }

    fn next_event(&mut self) -> Option<ExternalEvent> {
        let time = self.times.pop_front()?;
        Some(ExternalEvent {
            time,
            kind: EventKind::Update,
        })
    }
}

// ── ScriptedEventQueue ────────────────────────────────────────────────────────

/// A pre-scripted list of external events, e.g. parsed from a trace file by
/// an outer layer.  Events are sorted by time on construction (stable, so
/// same-time events keep their script order).
pub struct ScriptedEventQueue {
    events: VecDeque<ExternalEvent>,
}

impl ScriptedEventQueue {
    pub fn new(mut events: Vec<ExternalEvent>) -> Self {
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            events: events.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventQueue for ScriptedEventQueue {
    fn next_event_time(&self) -> f64 {
        self.events.front().map_or(f64::INFINITY, |e| e.time)
    }

    fn next_event(&mut self) -> Option<ExternalEvent> {
        self.events.pop_front()
    }
}
