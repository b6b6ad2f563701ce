//! The `World` struct and its stepping loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace};

use dtn_core::{HostAddress, SettingsError, SimClock, SimError, SimResult, SimRng};
use dtn_net::{ConnectionListener, Host, NetCtx, NetworkEngine};

use crate::events::{EventKind, EventQueue, ExternalEvent, ScheduledUpdatesQueue};
use crate::listener::UpdateListener;

// ── WorldSettings ─────────────────────────────────────────────────────────────

/// Global stepping configuration.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldSettings {
    /// World width in world units.
    pub width:  f64,
    /// World height in world units.
    pub height: f64,
    /// Nominal seconds of simulated time per [`World::update`] call.
    pub update_interval: f64,
    /// Shuffle the host-update order each pass (seeded with the tick's
    /// whole-second timestamp, so runs stay reproducible).
    pub randomize_update_order: bool,
    /// Whether interface updates simulate connectivity at all.
    pub simulate_connections: bool,
    /// Freeze connectivity after the first host-update pass.
    pub simulate_connections_once: bool,
    /// Pace the loop against the wall clock (1 simulated second = 1 real
    /// second).
    pub realtime: bool,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            width:  100.0,
            height: 100.0,
            update_interval: 1.0,
            randomize_update_order: true,
            simulate_connections: true,
            simulate_connections_once: false,
            realtime: false,
        }
    }
}

impl WorldSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.update_interval <= 0.0 {
            return Err(SettingsError::NonPositive {
                key:   "updateInterval",
                value: self.update_interval,
            });
        }
        if self.width <= 0.0 {
            return Err(SettingsError::NonPositive {
                key:   "worldWidth",
                value: self.width,
            });
        }
        if self.height <= 0.0 {
            return Err(SettingsError::NonPositive {
                key:   "worldHeight",
                value: self.height,
            });
        }
        Ok(())
    }
}

// ── CancelHandle ──────────────────────────────────────────────────────────────

/// Cross-thread cancellation of a running world.
///
/// The flag is write-once from any thread; the loop reads it with acquire
/// semantics at host-update granularity and exits cooperatively.  There is
/// no rollback: state of a partially completed tick is retained.
#[derive(Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ── World ─────────────────────────────────────────────────────────────────────

/// The simulation driver: owns the clock, the hosts, the network engine,
/// and the event queues, and interleaves them per tick.
///
/// Build via [`WorldBuilder`][crate::WorldBuilder].
pub struct World {
    pub(crate) settings: WorldSettings,
    pub(crate) clock:    SimClock,
    pub(crate) hosts:    Vec<Host>,
    pub(crate) engine:   NetworkEngine,

    /// Built-in queue of forced update passes; always the first queue in
    /// tie-break order.
    pub(crate) scheduled: ScheduledUpdatesQueue,
    /// External queues, in registration order.
    pub(crate) queues: Vec<Box<dyn EventQueue>>,

    pub(crate) connection_listeners: Vec<Box<dyn ConnectionListener>>,
    pub(crate) update_listeners:     Vec<Box<dyn UpdateListener>>,

    /// Passed to interface updates; sticky-off under
    /// `simulate_connections_once`.
    pub(crate) simulate_connections: bool,
    /// Persistent working copy of the host list for shuffled update order.
    pub(crate) update_order: Vec<HostAddress>,

    pub(crate) cancelled:  Arc<AtomicBool>,
    /// Wall-clock anchor of the first paced update.
    real_start: Option<Instant>,
}

impl World {
    pub(crate) fn new(
        settings: WorldSettings,
        hosts:    Vec<Host>,
        engine:   NetworkEngine,
        queues:   Vec<Box<dyn EventQueue>>,
        connection_listeners: Vec<Box<dyn ConnectionListener>>,
        update_listeners:     Vec<Box<dyn UpdateListener>>,
    ) -> Self {
        let update_order = (0..hosts.len() as u32).map(HostAddress).collect();
        let simulate_connections = settings.simulate_connections;
        Self {
            settings,
            clock: SimClock::new(),
            hosts,
            engine,
            scheduled: ScheduledUpdatesQueue::new(),
            queues,
            connection_listeners,
            update_listeners,
            simulate_connections,
            update_order,
            cancelled: Arc::new(AtomicBool::new(false)),
            real_start: None,
        }
    }

    // ── Stepping ──────────────────────────────────────────────────────────

    /// Advance the simulation by one update interval.
    ///
    /// In order: optional real-time pacing, draining of all external events
    /// due within the interval (each followed by a full host-update pass so
    /// routers see the post-event state before further events), the
    /// movement pass, the clock jump, the final host-update pass, and the
    /// update-listener fan-out.
    ///
    /// The movement pass always moves hosts by the full nominal interval,
    /// even when events advanced the clock partway into the tick.
    pub fn update(&mut self) -> SimResult<()> {
        self.pace_realtime();

        let run_until = self.clock.time() + self.settings.update_interval;

        loop {
            let (source, next_time) = self.next_event_source();
            if next_time > run_until {
                break;
            }
            self.clock.set_time(next_time);
            let Some(event) = self.pop_event(source) else {
                break;
            };
            trace!("applying event at t={next_time}: {:?}", event.kind);
            self.apply_event(event)?;
            self.update_hosts()?;
        }

        self.move_hosts(self.settings.update_interval);
        self.clock.set_time(run_until);
        self.update_hosts()?;

        for listener in &mut self.update_listeners {
            listener.updated(&self.hosts);
        }
        Ok(())
    }

    /// Run `n` consecutive updates.
    pub fn run_ticks(&mut self, n: usize) -> SimResult<()> {
        for _ in 0..n {
            self.update()?;
        }
        Ok(())
    }

    /// Move hosts through the movement model before the run proper.
    ///
    /// Runs the clock from `-time` up to zero in whole update intervals,
    /// moving hosts only — no events, no host updates, no listeners — then
    /// takes a final fractional step sized to land exactly at t = 0 and
    /// resets the clock.
    pub fn warmup_movement_model(&mut self, time: f64) {
        if time <= 0.0 {
            return;
        }
        debug!("warming up movement model for {time} s");
        self.clock.set_time(-time);
        while self.clock.time() < -self.settings.update_interval {
            self.move_hosts(self.settings.update_interval);
            self.clock.advance(self.settings.update_interval);
        }
        let final_step = -self.clock.time();
        self.move_hosts(final_step);
        self.clock.set_time(0.0);
    }

    // ── Event handling ────────────────────────────────────────────────────

    /// The queue holding the globally next event: `(queue index, time)`.
    /// Index 0 is the scheduled-updates queue; external queues follow in
    /// registration order.  Ties stay with the earlier-registered queue.
    fn next_event_source(&self) -> (usize, f64) {
        let mut best = (0, self.scheduled.next_event_time());
        for (i, queue) in self.queues.iter().enumerate() {
            let t = queue.next_event_time();
            if t < best.1 {
                best = (i + 1, t);
            }
        }
        best
    }

    fn pop_event(&mut self, source: usize) -> Option<ExternalEvent> {
        if source == 0 {
            self.scheduled.next_event()
        } else {
            self.queues[source - 1].next_event()
        }
    }

    fn apply_event(&mut self, event: ExternalEvent) -> SimResult<()> {
        match event.kind {
            // the forced host-update pass that follows is the whole effect
            EventKind::Update => Ok(()),

            EventKind::Connection { from, to, interface_type, up } => {
                self.check_address(from)?;
                self.check_address(to)?;
                let wanted = interface_type.as_deref();
                let from_iface = self
                    .engine
                    .interface_of_type(&self.hosts[from.index()], wanted)
                    .ok_or_else(|| SimError::NoSuchInterface {
                        host:           from,
                        interface_type: wanted.unwrap_or("any").to_owned(),
                    })?;
                let tag = self.engine.interface(from_iface).interface_type().to_owned();
                let to_iface = self
                    .engine
                    .interface_of_type(&self.hosts[to.index()], Some(&tag))
                    .ok_or_else(|| SimError::NoSuchInterface {
                        host:           to,
                        interface_type: tag.clone(),
                    })?;

                let mut ctx = NetCtx {
                    hosts:     &mut self.hosts,
                    listeners: &mut self.connection_listeners,
                    now:       self.clock.time(),
                };
                if up {
                    self.engine.create_connection(from_iface, to_iface, &mut ctx)
                } else {
                    self.engine.destroy_connection(from_iface, to_iface, &mut ctx)
                }
            }

            EventKind::Message { from, to, id, size, response_size } => {
                self.check_address(from)?;
                self.hosts[from.index()].message_created(from, to, &id, size, response_size);
                Ok(())
            }
        }
    }

    // ── Host passes ───────────────────────────────────────────────────────

    /// One host-update pass: connectivity reconciliation plus router update
    /// for every host, in (optionally shuffled) order.
    fn update_hosts(&mut self) -> SimResult<()> {
        if self.settings.randomize_update_order {
            SimRng::for_tick(self.clock.int_time()).shuffle(&mut self.update_order);
        }
        let now = self.clock.time();
        let order = self.update_order.clone();
        for host in order {
            if self.cancelled.load(Ordering::Acquire) {
                debug!("cancelled; aborting host-update pass at t={now}");
                break;
            }
            if self.simulate_connections {
                let mut ctx = NetCtx {
                    hosts:     &mut self.hosts,
                    listeners: &mut self.connection_listeners,
                    now,
                };
                self.engine.update_host(host, &mut ctx)?;
            }
            self.hosts[host.index()].router_update(now);
        }
        if self.settings.simulate_connections_once && self.simulate_connections {
            self.simulate_connections = false;
        }
        Ok(())
    }

    /// Move every host by `dt` seconds, in insertion order.
    fn move_hosts(&mut self, dt: f64) {
        for host in &mut self.hosts {
            host.move_for(dt);
        }
    }

    // ── Pacing & cancellation ─────────────────────────────────────────────

    /// Sleep until the wall clock catches up with the simulation clock.
    /// The first paced call anchors the wall-clock origin.
    fn pace_realtime(&mut self) {
        if !self.settings.realtime {
            return;
        }
        let start = *self.real_start.get_or_insert_with(Instant::now);
        let desired = Duration::from_secs_f64(self.clock.time().max(0.0));
        let elapsed = start.elapsed();
        if desired > elapsed {
            std::thread::sleep(desired - elapsed);
        }
    }

    /// Handle for cancelling the run from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    // ── Scheduling & lookup ───────────────────────────────────────────────

    /// Request a forced host-update pass at time `t`.
    pub fn schedule_update(&mut self, t: f64) {
        self.scheduled.add_update(t);
    }

    /// The host with network address `addr`, re-asserting the address-index
    /// invariant.
    pub fn get_node_by_address(&self, addr: HostAddress) -> SimResult<&Host> {
        let host = self
            .hosts
            .get(addr.index())
            .ok_or(SimError::NoSuchHost(addr))?;
        if host.address() != addr {
            return Err(SimError::AddressMismatch {
                index:   addr.index(),
                address: host.address(),
            });
        }
        Ok(host)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn sim_time(&self) -> f64 {
        self.clock.time()
    }

    pub fn clock(&self) -> SimClock {
        self.clock
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// The network engine, for inspecting interfaces and live connections.
    pub fn network(&self) -> &NetworkEngine {
        &self.engine
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    fn check_address(&self, addr: HostAddress) -> SimResult<()> {
        self.get_node_by_address(addr).map(|_| ())
    }
}
