//! Integration tests for the stepping loop and end-to-end connectivity
//! scenarios.

use std::sync::{Arc, Mutex};

use dtn_core::{Coord, HostAddress, SimError};
use dtn_net::{
    ActiveWindows, ConnectionListener, LinearMovement, NetSettings, Router, StationaryMovement,
};

use crate::events::{EventKind, ExternalEvent, ScriptedEventQueue};
use crate::{EventQueue, ScheduledUpdatesQueue, WorldBuilder, WorldSettings};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// One entry per observable occurrence; `Tick` markers are pushed by the
/// test loop itself so transition ordering is anchored to tick boundaries.
#[derive(Clone, Debug, PartialEq)]
enum Ev {
    Tick(u32),
    Up(u32, u32),
    Down(u32, u32),
}

type Log = Arc<Mutex<Vec<Ev>>>;

struct Recorder(Log);

impl ConnectionListener for Recorder {
    fn hosts_connected(&mut self, a: HostAddress, b: HostAddress) {
        self.0.lock().unwrap().push(Ev::Up(a.0, b.0));
    }
    fn hosts_disconnected(&mut self, a: HostAddress, b: HostAddress) {
        self.0.lock().unwrap().push(Ev::Down(a.0, b.0));
    }
}

#[derive(Clone, Default)]
struct RecordingRouter {
    updates:  Arc<Mutex<Vec<f64>>>,
    messages: Arc<Mutex<Vec<String>>>,
}

impl Router for RecordingRouter {
    fn update(&mut self, now: f64) {
        self.updates.lock().unwrap().push(now);
    }
    fn message_created(
        &mut self,
        _from: HostAddress,
        _to: HostAddress,
        id: &str,
        _size: u32,
        _response_size: u32,
    ) {
        self.messages.lock().unwrap().push(id.to_owned());
    }
}

fn settings(randomize: bool) -> WorldSettings {
    WorldSettings {
        randomize_update_order: randomize,
        ..WorldSettings::default()
    }
}

/// Run `ticks` updates, pushing a `Tick` marker before each one.
fn run_logged(world: &mut crate::World, log: &Log, ticks: u32) {
    for t in 1..=ticks {
        log.lock().unwrap().push(Ev::Tick(t));
        world.update().unwrap();
    }
}

fn ups(log: &Log) -> usize {
    log.lock().unwrap().iter().filter(|e| matches!(e, Ev::Up(..))).count()
}

fn downs(log: &Log) -> usize {
    log.lock().unwrap().iter().filter(|e| matches!(e, Ev::Down(..))).count()
}

// ── Event queues ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod queue_tests {
    use super::*;

    #[test]
    fn scheduled_updates_stay_sorted_and_deduped() {
        let mut queue = ScheduledUpdatesQueue::new();
        queue.add_update(5.0);
        queue.add_update(1.0);
        queue.add_update(5.0); // exact duplicate collapses
        queue.add_update(3.0);
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.next_event_time(), 1.0);
        assert_eq!(queue.next_event().unwrap().time, 1.0);
        assert_eq!(queue.next_event().unwrap().time, 3.0);
        assert_eq!(queue.next_event().unwrap().time, 5.0);
        assert_eq!(queue.next_event_time(), f64::INFINITY);
        assert!(queue.next_event().is_none());
    }

    #[test]
    fn scheduled_update_events_are_noop_updates() {
        let mut queue = ScheduledUpdatesQueue::new();
        queue.add_update(2.5);
        let event = queue.next_event().unwrap();
        assert_eq!(event.kind, EventKind::Update);
        assert_eq!(event.time, 2.5);
    }

    #[test]
    fn scripted_queue_sorts_by_time_stably() {
        let msg = |t: f64, id: &str| ExternalEvent {
            time: t,
            kind: EventKind::Message {
                from: HostAddress(0),
                to:   HostAddress(1),
                id:   id.to_owned(),
                size: 100,
                response_size: 0,
            },
        };
        let mut queue = ScriptedEventQueue::new(vec![
            msg(3.0, "c"),
            msg(1.0, "a"),
            msg(1.0, "b"), // same time: keeps script order
        ]);
        assert_eq!(queue.next_event_time(), 1.0);
        let order: Vec<f64> = std::iter::from_fn(|| queue.next_event().map(|e| e.time)).collect();
        assert_eq!(order, vec![1.0, 1.0, 3.0]);
    }
}

// ── Builder & lookup ──────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn addresses_equal_indices() {
        let mut b = WorldBuilder::new(settings(true));
        let radio = b.register_interface(&NetSettings::new("T", 10.0, 100)).unwrap();
        for i in 0..5u32 {
            let addr = b.add_host(
                Coord::new(f64::from(i) * 10.0, 0.0),
                Box::new(StationaryMovement),
                &[radio],
            );
            assert_eq!(addr, HostAddress(i));
        }
        let world = b.build().unwrap();
        for (i, host) in world.hosts().iter().enumerate() {
            assert_eq!(host.address().index(), i);
            let by_addr = world.get_node_by_address(host.address()).unwrap();
            assert_eq!(by_addr.address(), host.address());
        }
    }

    #[test]
    fn out_of_range_lookup_is_fatal() {
        let world = WorldBuilder::new(settings(true)).build().unwrap();
        assert!(matches!(
            world.get_node_by_address(HostAddress(3)),
            Err(SimError::NoSuchHost(HostAddress(3)))
        ));
    }

    #[test]
    fn non_positive_update_interval_is_rejected() {
        let bad = WorldSettings {
            update_interval: 0.0,
            ..WorldSettings::default()
        };
        assert!(WorldBuilder::new(bad).build().is_err());
    }

    #[test]
    fn invalid_interface_settings_are_rejected() {
        let mut b = WorldBuilder::new(settings(true));
        assert!(b.register_interface(&NetSettings::new("T", -2.0, 100)).is_err());
    }
}

// ── Stepping ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod stepping_tests {
    use super::*;
    use crate::UpdateListener;
    use dtn_net::Host;

    #[test]
    fn clock_advances_by_the_update_interval() {
        let mut world = WorldBuilder::new(settings(true)).build().unwrap();
        assert_eq!(world.sim_time(), 0.0);
        world.update().unwrap();
        assert_eq!(world.sim_time(), 1.0);
        world.run_ticks(3).unwrap();
        assert_eq!(world.sim_time(), 4.0);
    }

    #[test]
    fn update_listeners_fire_once_per_update() {
        struct Counter(Arc<Mutex<usize>>);
        impl UpdateListener for Counter {
            fn updated(&mut self, _hosts: &[Host]) {
                *self.0.lock().unwrap() += 1;
            }
        }

        let count = Arc::new(Mutex::new(0));
        let mut b = WorldBuilder::new(settings(true));
        b.add_update_listener(Box::new(Counter(Arc::clone(&count))));
        let mut world = b.build().unwrap();
        world.run_ticks(7).unwrap();
        assert_eq!(*count.lock().unwrap(), 7);
    }

    #[test]
    fn movement_uses_the_full_nominal_interval() {
        // An event mid-tick advances the clock to 0.5, but the movement pass
        // still moves hosts by the whole interval — the documented
        // coarsening, preserved as-is.
        let mut b = WorldBuilder::new(settings(false));
        b.add_host(Coord::new(0.0, 0.0), Box::new(LinearMovement::new(1.0, 0.0)), &[]);
        let mut world = b.build().unwrap();
        world.schedule_update(0.5);

        world.update().unwrap();
        assert_eq!(world.sim_time(), 1.0);
        assert_eq!(world.hosts()[0].location(), Coord::new(1.0, 0.0));
    }

    #[test]
    fn warmup_moves_hosts_and_lands_on_zero() {
        let mut b = WorldBuilder::new(settings(false));
        b.add_host(Coord::new(0.0, 0.0), Box::new(LinearMovement::new(1.0, 0.0)), &[]);
        let mut world = b.build().unwrap();

        world.warmup_movement_model(5.5);
        assert_eq!(world.sim_time(), 0.0);
        // 5 whole steps plus the 0.5 landing step
        assert_eq!(world.hosts()[0].location(), Coord::new(5.5, 0.0));

        world.update().unwrap();
        assert_eq!(world.hosts()[0].location(), Coord::new(6.5, 0.0));
        assert_eq!(world.sim_time(), 1.0);
    }

    #[test]
    fn zero_warmup_is_a_noop() {
        let mut world = WorldBuilder::new(settings(false)).build().unwrap();
        world.warmup_movement_model(0.0);
        assert_eq!(world.sim_time(), 0.0);
    }

    #[test]
    fn cancellation_skips_host_updates_but_not_stepping() {
        let router = RecordingRouter::default();
        let mut b = WorldBuilder::new(settings(false));
        let addr = b.add_host(
            Coord::new(0.0, 0.0),
            Box::new(LinearMovement::new(1.0, 0.0)),
            &[],
        );
        b.set_router(addr, Box::new(router.clone()));
        let mut world = b.build().unwrap();

        let handle = world.cancel_handle();
        handle.cancel();
        assert!(handle.is_cancelled());
        world.update().unwrap();

        assert!(router.updates.lock().unwrap().is_empty(), "pass exits before any host");
        // the tick itself still completes: clock and movement advanced
        assert_eq!(world.sim_time(), 1.0);
        assert_eq!(world.hosts()[0].location(), Coord::new(1.0, 0.0));
    }
}

// ── Event processing ──────────────────────────────────────────────────────────

#[cfg(test)]
mod event_tests {
    use super::*;

    #[test]
    fn scheduled_update_forces_a_mid_tick_pass() {
        let router = RecordingRouter::default();
        let mut b = WorldBuilder::new(settings(false));
        let addr = b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[]);
        b.set_router(addr, Box::new(router.clone()));
        let mut world = b.build().unwrap();
        world.schedule_update(0.5);

        world.update().unwrap();
        // one pass at the event's time, one at the end of the tick
        assert_eq!(router.updates.lock().unwrap().as_slice(), &[0.5, 1.0]);
    }

    #[test]
    fn events_beyond_the_interval_wait_for_their_tick() {
        let router = RecordingRouter::default();
        let mut b = WorldBuilder::new(settings(false));
        let addr = b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[]);
        b.set_router(addr, Box::new(router.clone()));
        let mut world = b.build().unwrap();
        world.schedule_update(1.5);

        world.update().unwrap();
        assert_eq!(router.updates.lock().unwrap().as_slice(), &[1.0]);
        world.update().unwrap();
        assert_eq!(router.updates.lock().unwrap().as_slice(), &[1.0, 1.5, 2.0]);
    }

    #[test]
    fn same_time_events_drain_in_queue_registration_order() {
        let msg = |id: &str| ExternalEvent {
            time: 0.4,
            kind: EventKind::Message {
                from: HostAddress(0),
                to:   HostAddress(1),
                id:   id.to_owned(),
                size: 10,
                response_size: 0,
            },
        };
        let router = RecordingRouter::default();
        let mut b = WorldBuilder::new(settings(false));
        let a = b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[]);
        b.add_host(Coord::new(1.0, 0.0), Box::new(StationaryMovement), &[]);
        b.set_router(a, Box::new(router.clone()));
        b.add_event_queue(Box::new(ScriptedEventQueue::new(vec![msg("first")])));
        b.add_event_queue(Box::new(ScriptedEventQueue::new(vec![msg("second")])));
        let mut world = b.build().unwrap();

        world.update().unwrap();
        assert_eq!(
            router.messages.lock().unwrap().as_slice(),
            &["first".to_owned(), "second".to_owned()]
        );
    }

    #[test]
    fn message_event_reaches_the_source_router() {
        let router = RecordingRouter::default();
        let mut b = WorldBuilder::new(settings(false));
        let a = b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[]);
        b.add_host(Coord::new(1.0, 0.0), Box::new(StationaryMovement), &[]);
        b.set_router(a, Box::new(router.clone()));
        b.add_event_queue(Box::new(ScriptedEventQueue::new(vec![ExternalEvent {
            time: 0.25,
            kind: EventKind::Message {
                from: a,
                to:   HostAddress(1),
                id:   "M1".to_owned(),
                size: 512,
                response_size: 0,
            },
        }])));
        let mut world = b.build().unwrap();

        world.update().unwrap();
        assert_eq!(router.messages.lock().unwrap().as_slice(), &["M1".to_owned()]);
    }

    #[test]
    fn message_event_for_unknown_host_is_fatal() {
        let mut b = WorldBuilder::new(settings(false));
        b.add_event_queue(Box::new(ScriptedEventQueue::new(vec![ExternalEvent {
            time: 0.25,
            kind: EventKind::Message {
                from: HostAddress(9),
                to:   HostAddress(1),
                id:   "M1".to_owned(),
                size: 512,
                response_size: 0,
            },
        }])));
        let mut world = b.build().unwrap();
        assert!(matches!(world.update(), Err(SimError::NoSuchHost(_))));
    }

    #[test]
    fn connection_events_force_links_up_and_down() {
        // connectivity simulation off: only the trace drives the link
        let log: Log = Arc::default();
        let mut b = WorldBuilder::new(WorldSettings {
            simulate_connections: false,
            randomize_update_order: false,
            ..WorldSettings::default()
        });
        let radio = b.register_interface(&NetSettings::new("T", 10.0, 100)).unwrap();
        let a = b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[radio]);
        let c = b.add_host(Coord::new(90.0, 0.0), Box::new(StationaryMovement), &[radio]);
        b.add_connection_listener(Box::new(Recorder(Arc::clone(&log))));
        let link = |t: f64, up: bool| ExternalEvent {
            time: t,
            kind: EventKind::Connection {
                from: a,
                to:   c,
                interface_type: Some("T".to_owned()),
                up,
            },
        };
        b.add_event_queue(Box::new(ScriptedEventQueue::new(vec![
            link(0.5, true),
            link(2.5, false),
        ])));
        let mut world = b.build().unwrap();

        world.update().unwrap();
        assert_eq!(world.network().connection_count(), 1, "forced up despite distance 90");

        world.run_ticks(2).unwrap();
        assert_eq!(world.network().connection_count(), 0);
        assert_eq!(
            log.lock().unwrap().as_slice(),
            &[Ev::Up(0, 1), Ev::Down(0, 1)]
        );
    }

    #[test]
    fn connection_event_without_matching_interface_is_fatal() {
        let mut b = WorldBuilder::new(settings(false));
        let radio = b.register_interface(&NetSettings::new("T", 10.0, 100)).unwrap();
        let a = b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[radio]);
        let c = b.add_host(Coord::new(5.0, 0.0), Box::new(StationaryMovement), &[radio]);
        b.add_event_queue(Box::new(ScriptedEventQueue::new(vec![ExternalEvent {
            time: 0.5,
            kind: EventKind::Connection {
                from: a,
                to:   c,
                interface_type: Some("Bluetooth".to_owned()),
                up:   true,
            },
        }])));
        let mut world = b.build().unwrap();
        assert!(matches!(world.update(), Err(SimError::NoSuchInterface { .. })));
    }
}

// ── End-to-end connectivity scenarios ─────────────────────────────────────────

#[cfg(test)]
mod scenario_tests {
    use super::*;

    /// Two stationary hosts in range connect on the first update, and the
    /// listener fires exactly once.
    #[test]
    fn basic_handshake() {
        let log: Log = Arc::default();
        let mut b = WorldBuilder::new(settings(true));
        let radio = b.register_interface(&NetSettings::new("T", 10.0, 100)).unwrap();
        b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[radio]);
        b.add_host(Coord::new(5.0, 0.0), Box::new(StationaryMovement), &[radio]);
        b.add_connection_listener(Box::new(Recorder(Arc::clone(&log))));
        let mut world = b.build().unwrap();

        world.update().unwrap();
        assert_eq!(world.network().connection_count(), 1);

        // further ticks do not re-fire the transition
        world.run_ticks(3).unwrap();
        assert_eq!(ups(&log), 1);
        assert_eq!(downs(&log), 0);
    }

    /// The weaker radio dominates: distance 15 > min(20, 10) keeps the pair
    /// apart.
    #[test]
    fn range_asymmetry() {
        let mut b = WorldBuilder::new(settings(true));
        let long = b.register_interface(&NetSettings::new("T", 20.0, 100)).unwrap();
        let short = b.register_interface(&NetSettings::new("T", 10.0, 100)).unwrap();
        b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[long]);
        b.add_host(Coord::new(15.0, 0.0), Box::new(StationaryMovement), &[short]);
        let mut world = b.build().unwrap();

        world.run_ticks(5).unwrap();
        assert_eq!(world.network().connection_count(), 0);
    }

    /// A fly-by: the link forms the first tick the pair is mutually in
    /// range (closed bound) and breaks the first tick it is not; up and
    /// down each fire exactly once.
    #[test]
    fn fly_by_connect_and_disconnect() {
        let log: Log = Arc::default();
        let mut b = WorldBuilder::new(settings(false));
        let radio = b.register_interface(&NetSettings::new("T", 5.0, 100)).unwrap();
        b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[radio]);
        b.add_host(Coord::new(-10.0, 0.0), Box::new(LinearMovement::new(1.0, 0.0)), &[radio]);
        b.add_connection_listener(Box::new(Recorder(Arc::clone(&log))));
        let mut world = b.build().unwrap();

        run_logged(&mut world, &log, 20);

        // distance 5 exactly at tick 5 → in range; distance 6 at tick 16 →
        // out of range
        let entries = log.lock().unwrap().clone();
        let up_at = entries.iter().position(|e| matches!(e, Ev::Up(..))).unwrap();
        let down_at = entries.iter().position(|e| matches!(e, Ev::Down(..))).unwrap();
        assert_eq!(entries[up_at - 1], Ev::Tick(5), "link must form at tick 5");
        assert_eq!(entries[down_at - 1], Ev::Tick(16), "link must break at tick 16");
        assert_eq!(ups(&log), 1);
        assert_eq!(downs(&log), 1);
    }

    /// With a 5-second scan interval and random scan phases, a pair placed
    /// in range connects no later than one full scan round past the latest
    /// possible phase.
    #[test]
    fn scan_duty_cycle() {
        let log: Log = Arc::default();
        let mut b = WorldBuilder::new(settings(true));
        let radio = b
            .register_interface(&NetSettings {
                scan_interval: 5.0,
                ..NetSettings::new("T", 10.0, 100)
            })
            .unwrap();
        b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[radio]);
        b.add_host(Coord::new(3.0, 0.0), Box::new(StationaryMovement), &[radio]);
        b.add_connection_listener(Box::new(Recorder(Arc::clone(&log))));
        let mut world = b.build().unwrap();

        // phases are drawn in [0, 5); the first whole-second pulse of either
        // interface happens at floor(phase + 5) + 1 <= 10
        world.run_ticks(11).unwrap();
        assert_eq!(world.network().connection_count(), 1);
        assert_eq!(ups(&log), 1);
    }

    /// An activeness window closing tears the link down on the first update
    /// at or after the boundary; re-opening restores range and the link.
    #[test]
    fn activeness_toggle() {
        let log: Log = Arc::default();
        let mut b = WorldBuilder::new(settings(false));
        let windows = Arc::new(ActiveWindows::new(vec![(0.0, 9.0), (20.0, 1e12)]));
        let proto = b
            .make_prototype(&NetSettings::new("T", 10.0, 100))
            .unwrap()
            .with_activeness(windows);
        let radio = b.register_prototype(proto);
        b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[radio]);
        b.add_host(Coord::new(5.0, 0.0), Box::new(StationaryMovement), &[radio]);
        b.add_connection_listener(Box::new(Recorder(Arc::clone(&log))));
        let mut world = b.build().unwrap();

        run_logged(&mut world, &log, 25);

        let entries = log.lock().unwrap().clone();
        let transitions: Vec<Ev> = entries
            .iter()
            .zip(entries.iter().skip(1))
            .filter(|(_, e)| matches!(e, Ev::Up(..) | Ev::Down(..)))
            .map(|(prev, _)| {
                // pair each transition with the tick marker preceding it
                assert!(matches!(prev, Ev::Tick(_)), "one transition per tick here");
                prev.clone()
            })
            .collect();
        assert_eq!(
            transitions,
            vec![Ev::Tick(1), Ev::Tick(10), Ev::Tick(20)],
            "up at 1, down at 10, up again at 20: {entries:?}"
        );
        assert_eq!(ups(&log), 2);
        assert_eq!(downs(&log), 1);
    }

    /// Identical configuration twice → bit-identical transition sequences,
    /// with randomized update order enabled.
    #[test]
    fn deterministic_across_runs() {
        fn run_once() -> Vec<Ev> {
            let log: Log = Arc::default();
            let mut b = WorldBuilder::new(settings(true));
            let radio = b.register_interface(&NetSettings::new("T", 10.0, 100)).unwrap();
            for i in 0..10u32 {
                let x = f64::from(i % 5) * 8.0;
                let y = f64::from(i / 5) * 6.0;
                let vx = f64::from(i % 3) - 1.0;
                let vy = f64::from((i * 2) % 3) - 1.0;
                b.add_host(Coord::new(x, y), Box::new(LinearMovement::new(vx, vy)), &[radio]);
            }
            b.add_connection_listener(Box::new(Recorder(Arc::clone(&log))));
            let mut world = b.build().unwrap();
            run_logged(&mut world, &log, 15);

            // P3: no live connection may be out of range after a tick
            for con in world.network().live_connections() {
                let (a, b_) = con.endpoints();
                assert!(world.network().within_range(a, b_, world.hosts()));
            }
            let entries = log.lock().unwrap().clone();
            entries
        }

        assert_eq!(run_once(), run_once());
    }

    /// `simulate_connections_once`: connectivity freezes after the first
    /// pass, so a link survives even once the pair drifts out of range.
    #[test]
    fn connections_freeze_after_first_pass() {
        let log: Log = Arc::default();
        let mut b = WorldBuilder::new(WorldSettings {
            simulate_connections_once: true,
            randomize_update_order: false,
            ..WorldSettings::default()
        });
        let radio = b.register_interface(&NetSettings::new("T", 10.0, 100)).unwrap();
        b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[radio]);
        b.add_host(Coord::new(5.0, 0.0), Box::new(LinearMovement::new(2.0, 0.0)), &[radio]);
        b.add_connection_listener(Box::new(Recorder(Arc::clone(&log))));
        let mut world = b.build().unwrap();

        world.run_ticks(10).unwrap();

        // by tick 10 the pair sits 25 apart, yet the tick-1 link persists
        assert_eq!(world.hosts()[1].location(), Coord::new(25.0, 0.0));
        assert_eq!(world.network().connection_count(), 1);
        assert_eq!(ups(&log), 1);
        assert_eq!(downs(&log), 0);
    }
}
