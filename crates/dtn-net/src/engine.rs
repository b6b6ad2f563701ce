//! The network engine: interface arena, connection graph, and the update
//! logic that ties them to the connectivity grids.
//!
//! # Ownership
//!
//! Interfaces and connections reference each other cyclically, and an
//! interface update must read and mutate *peer* interfaces.  The engine
//! therefore owns both arenas and every cross-interface operation is an
//! engine method over IDs; hosts (with their buses and routers) are owned by
//! the world and lent in per call through [`NetCtx`].
//!
//! # Invariants maintained here
//!
//! * Bidirectionality: a connection ID appears in both endpoints' lists or
//!   in neither.  A teardown that cannot find the ID on the peer is a fatal
//!   [`SimError`].
//! * No self-loops, and at most one live connection per interface pair.
//! * Activeness–range coupling: activeness transitions publish range 0 /
//!   restore the stashed range through the host's bus, and the interface's
//!   own subscription writes the field back.

use std::sync::Arc;

use log::debug;

use dtn_core::{
    BusValue, ConnectionId, Coord, HostAddress, InterfaceId, SettingsError, SimError, SimResult,
    SimRng, ENERGY_VALUE_ID, RANGE_ID, SCAN_INTERVAL_ID, SPEED_ID,
};

use crate::connection::{Connection, ConnectionArena};
use crate::grid::GridFactory;
use crate::host::Host;
use crate::interface::{NetSettings, NetworkInterface, RadioModel};
use crate::listener::ConnectionListener;

// ── NetCtx ────────────────────────────────────────────────────────────────────

/// World-owned state lent to the engine for one operation: the host slice,
/// the connection listeners, and the current simulation time.
pub struct NetCtx<'a> {
    pub hosts:     &'a mut [Host],
    pub listeners: &'a mut [Box<dyn ConnectionListener>],
    pub now:       f64,
}

// ── NetworkEngine ─────────────────────────────────────────────────────────────

/// Owns every interface and live connection plus the per-type connectivity
/// grids.
pub struct NetworkEngine {
    interfaces:  Vec<NetworkInterface>,
    connections: ConnectionArena,
    grids:       GridFactory,
    /// Run-scoped init RNG (seed 0): interface jitter and scan phases.
    init_rng:    SimRng,
}

impl NetworkEngine {
    /// Engine for a bounded `width` × `height` world.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            interfaces:  Vec::new(),
            connections: ConnectionArena::new(),
            grids:       GridFactory::new(width, height),
            init_rng:    SimRng::for_init(),
        }
    }

    /// Build an interface prototype from settings, drawing its phases from
    /// the run's init RNG.
    pub fn make_prototype(
        &mut self,
        settings: &NetSettings,
    ) -> Result<NetworkInterface, SettingsError> {
        NetworkInterface::from_settings(settings, &mut self.init_rng)
    }

    /// Replicate `prototype` and attach the copy to `host`.
    ///
    /// Attachment registers the three `Network.*` properties on the host's
    /// bus the first time any interface of that host does so, subscribes the
    /// new interface to all three keys, and registers it with the grid of
    /// its type unless its range is zero.
    pub fn add_interface(&mut self, prototype: &NetworkInterface, host: &mut Host) -> InterfaceId {
        let mut iface = prototype.replicate(&mut self.init_rng);
        let id = InterfaceId(self.interfaces.len() as u32);
        iface.id = id;
        iface.host = host.address();

        let bus = host.com_bus_mut();
        bus.add_property(SCAN_INTERVAL_ID, BusValue::Double(iface.scan_interval()));
        bus.add_property(RANGE_ID, BusValue::Double(iface.transmit_range));
        bus.add_property(SPEED_ID, BusValue::Int(iface.transmit_speed));
        bus.subscribe(SCAN_INTERVAL_ID, id);
        bus.subscribe(RANGE_ID, id);
        bus.subscribe(SPEED_ID, id);

        if iface.transmit_range > 0.0 {
            self.grids
                .register(iface.interface_type(), iface.transmit_range, id, host.location());
            iface.registered = true;
        }

        host.interfaces.push(id);
        self.interfaces.push(iface);
        id
    }

    // ── Update logic ──────────────────────────────────────────────────────

    /// Run the connectivity update for every interface of `host`.
    pub fn update_host(&mut self, host: HostAddress, ctx: &mut NetCtx<'_>) -> SimResult<()> {
        let ids = ctx.hosts[host.index()].interfaces().to_vec();
        for id in ids {
            self.update_interface(id, ctx)?;
        }
        Ok(())
    }

    /// One interface's scan tick: refresh the spatial index, reconcile
    /// activeness and range, then open links to near compatible peers if a
    /// scan pulse is due.
    pub fn update_interface(&mut self, id: InterfaceId, ctx: &mut NetCtx<'_>) -> SimResult<()> {
        let owner = self.interfaces[id.index()].host;
        let loc = ctx.hosts[owner.index()].location();
        if self.interfaces[id.index()].registered {
            let tag = Arc::clone(self.interfaces[id.index()].type_tag());
            if let Some(grid) = self.grids.grid_mut(&tag) {
                grid.update_location(id, loc);
            }
        }

        // an interface that lost activeness keeps no links
        if !self.refresh_activeness(id, ctx)? {
            while let Some(&cid) = self.interfaces[id.index()].connections.last() {
                self.tear_down(cid, id, ctx)?;
            }
            return Ok(());
        }

        // zero-range interfaces have no optimizer and nothing to reconcile
        if !self.interfaces[id.index()].registered {
            return Ok(());
        }

        // break links that fell out of range
        for cid in self.interfaces[id.index()].connections.clone() {
            let other = self.connections[cid].other_interface(id);
            if !self.within_range(id, other, ctx.hosts) {
                self.tear_down(cid, id, ctx)?;
            }
        }

        // distance-scaled radios track host movement on their live links
        if self.interfaces[id.index()].radio == RadioModel::DistanceCapacity {
            for cid in self.interfaces[id.index()].connections.clone() {
                let other = self.connections[cid].other_interface(id);
                let speed = self.link_speed(id, other, ctx.hosts);
                self.connections[cid].speed = speed;
            }
        }

        // only a scanning interface opens new links
        if !self.interfaces[id.index()].scan_pulse(ctx.now) {
            return Ok(());
        }

        let near = {
            let iface = &self.interfaces[id.index()];
            match self.grids.grid(iface.type_tag()) {
                Some(grid) => grid.near_interfaces(id),
                None => Vec::new(),
            }
        };
        for candidate in near {
            self.try_connect(id, candidate, ctx)?;
        }
        Ok(())
    }

    /// Open a link from `id` to `candidate` if every gate passes: distinct
    /// interfaces, compatible types, not already connected, candidate
    /// active, and mutually in range.  The caller has already established
    /// that `id` is active and scanning.
    fn try_connect(
        &mut self,
        id: InterfaceId,
        candidate: InterfaceId,
        ctx: &mut NetCtx<'_>,
    ) -> SimResult<()> {
        if id == candidate {
            return Ok(());
        }
        if self.interfaces[id.index()].interface_type()
            != self.interfaces[candidate.index()].interface_type()
        {
            return Ok(());
        }
        if self.connection_between(id, candidate).is_some() {
            return Ok(());
        }
        if !self.refresh_activeness(candidate, ctx)? {
            return Ok(());
        }
        if !self.within_range(id, candidate, ctx.hosts) {
            return Ok(());
        }
        self.make_connection(id, candidate, ctx)
    }

    /// Force a link up between two interfaces, bypassing the range and
    /// scanning gates (trace-driven connectivity).  No-op when the pair is
    /// already connected or identical; the next update pass reconciles the
    /// link against the normal rules.
    pub fn create_connection(
        &mut self,
        from: InterfaceId,
        to: InterfaceId,
        ctx: &mut NetCtx<'_>,
    ) -> SimResult<()> {
        if from == to || self.connection_between(from, to).is_some() {
            return Ok(());
        }
        self.make_connection(from, to, ctx)
    }

    /// Tear down the link between `iface` and `other`, if one exists.
    pub fn destroy_connection(
        &mut self,
        iface: InterfaceId,
        other: InterfaceId,
        ctx: &mut NetCtx<'_>,
    ) -> SimResult<()> {
        match self.connection_between(iface, other) {
            Some(cid) => self.tear_down(cid, iface, ctx),
            // the connection didn't exist, do nothing
            None => Ok(()),
        }
    }

    // ── Link transitions ──────────────────────────────────────────────────

    fn make_connection(
        &mut self,
        from: InterfaceId,
        to: InterfaceId,
        ctx: &mut NetCtx<'_>,
    ) -> SimResult<()> {
        let speed = self.link_speed(from, to, ctx.hosts);
        let from_host = self.interfaces[from.index()].host;
        let to_host = self.interfaces[to.index()].host;
        let cid = self
            .connections
            .insert_with(|cid| Connection::new(cid, from, from_host, to, to_host, speed));
        self.interfaces[from.index()].connections.push(cid);
        self.interfaces[to.index()].connections.push(cid);
        debug!("link up: {from_host} <-> {to_host} ({cid})");

        for listener in ctx.listeners.iter_mut() {
            listener.hosts_connected(from_host, to_host);
        }
        let con = &self.connections[cid];
        ctx.hosts[from_host.index()].connection_up(con);
        ctx.hosts[to_host.index()].connection_up(con);
        Ok(())
    }

    /// Close `cid` from `initiator`'s side: mark it down, fan out to
    /// listeners and both routing surfaces, remove it from both endpoint
    /// lists, and free the arena slot.
    fn tear_down(
        &mut self,
        cid: ConnectionId,
        initiator: InterfaceId,
        ctx: &mut NetCtx<'_>,
    ) -> SimResult<()> {
        self.connections[cid].up = false;
        let peer = self.connections[cid].other_interface(initiator);
        let init_host = self.interfaces[initiator.index()].host;
        let peer_host = self.interfaces[peer.index()].host;
        debug!("link down: {init_host} <-> {peer_host} ({cid})");

        for listener in ctx.listeners.iter_mut() {
            listener.hosts_disconnected(init_host, peer_host);
        }

        remove_connection(&mut self.interfaces[initiator.index()], cid, initiator)?;
        remove_connection(&mut self.interfaces[peer.index()], cid, peer)?;

        // freed before the router hooks so they observe a consistent graph
        let con = match self.connections.remove(cid) {
            Some(con) => con,
            None => {
                return Err(SimError::ConnectionNotFound {
                    connection: cid,
                    interface:  initiator,
                })
            }
        };
        ctx.hosts[init_host.index()].connection_down(&con);
        ctx.hosts[peer_host.index()].connection_down(&con);
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Mutual in-range test: the weaker radio determines the link, and a
    /// pair at exactly that distance is in range (closed upper bound).
    pub fn within_range(&self, a: InterfaceId, b: InterfaceId, hosts: &[Host]) -> bool {
        let ia = &self.interfaces[a.index()];
        let ib = &self.interfaces[b.index()];
        let d = self.interface_distance(ia, ib, hosts);
        d <= ia.transmit_range.min(ib.transmit_range)
    }

    fn interface_distance(&self, a: &NetworkInterface, b: &NetworkInterface, hosts: &[Host]) -> f64 {
        let la: Coord = hosts[a.host.index()].location();
        let lb: Coord = hosts[b.host.index()].location();
        la.distance(lb)
    }

    /// Speed of a link initiated by `from`, per its radio variant.
    fn link_speed(&self, from: InterfaceId, to: InterfaceId, hosts: &[Host]) -> i32 {
        let ia = &self.interfaces[from.index()];
        match ia.radio {
            RadioModel::SimpleBroadcast => ia.transmit_speed,
            RadioModel::DistanceCapacity => {
                let ib = &self.interfaces[to.index()];
                let range = ia.transmit_range.min(ib.transmit_range);
                if range <= 0.0 {
                    return 0;
                }
                let d = self.interface_distance(ia, ib, hosts);
                let fraction = (1.0 - d / range).max(0.0);
                (ia.transmit_speed as f64 * fraction) as i32
            }
        }
    }

    /// Whether the interface may currently be on.
    ///
    /// True when no activeness handler is installed; otherwise the handler's
    /// verdict, vetoed by a flat battery if an energy model publishes
    /// `Energy.value` on the host's bus.  Transitions have a side effect:
    /// the effective range is zeroed or restored *through the bus*, so every
    /// subscriber of the host observes the change.
    pub fn is_active(&mut self, id: InterfaceId, ctx: &mut NetCtx<'_>) -> SimResult<bool> {
        self.refresh_activeness(id, ctx)
    }

    /// Whether the interface is in a scan pulse at `ctx.now`.  False when
    /// inactive; always true for continuously scanning interfaces
    /// (`scan_interval == 0`).  Advances the scan round as a side effect.
    pub fn is_scanning(&mut self, id: InterfaceId, ctx: &mut NetCtx<'_>) -> SimResult<bool> {
        if !self.refresh_activeness(id, ctx)? {
            return Ok(false);
        }
        Ok(self.interfaces[id.index()].scan_pulse(ctx.now))
    }

    fn refresh_activeness(&mut self, id: InterfaceId, ctx: &mut NetCtx<'_>) -> SimResult<bool> {
        let iface = &self.interfaces[id.index()];
        let Some(handler) = iface.activeness.as_ref() else {
            return Ok(true);
        };
        let host = iface.host;
        let mut active = handler.is_active(ctx.now, iface.jitter as f64);
        if active {
            if let Some(energy) = ctx.hosts[host.index()].com_bus().get_double(ENERGY_VALUE_ID) {
                active = energy > 0.0;
            }
        }

        let range = self.interfaces[id.index()].transmit_range;
        if !active && range > 0.0 {
            self.interfaces[id.index()].old_transmit_range = range;
            self.publish(host, RANGE_ID, BusValue::Double(0.0), ctx)?;
        } else if active && range == 0.0 {
            let restored = self.interfaces[id.index()].old_transmit_range;
            self.publish(host, RANGE_ID, BusValue::Double(restored), ctx)?;
        }
        Ok(active)
    }

    /// Set a bus property on `host` and synchronously deliver the change to
    /// every subscribed interface.
    pub fn publish(
        &mut self,
        host: HostAddress,
        key: &str,
        value: BusValue,
        ctx: &mut NetCtx<'_>,
    ) -> SimResult<()> {
        let subs = ctx.hosts[host.index()].com_bus_mut().update_property(key, value);
        for sub in subs {
            self.interfaces[sub.index()].module_value_changed(key, value)?;
        }
        Ok(())
    }

    /// The live connection between two interfaces, if any.
    pub fn connection_between(&self, a: InterfaceId, b: InterfaceId) -> Option<ConnectionId> {
        self.interfaces[a.index()]
            .connections
            .iter()
            .copied()
            .find(|&cid| self.connections[cid].involves_interface(b))
    }

    /// First interface of `host` matching `interface_type` (any type when
    /// `None`).
    pub fn interface_of_type(&self, host: &Host, interface_type: Option<&str>) -> Option<InterfaceId> {
        host.interfaces().iter().copied().find(|&id| match interface_type {
            Some(t) => self.interfaces[id.index()].interface_type() == t,
            None => true,
        })
    }

    pub fn interface(&self, id: InterfaceId) -> &NetworkInterface {
        &self.interfaces[id.index()]
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    /// Iterator over all live connections.
    pub fn live_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn interface_count(&self) -> usize {
        self.interfaces.len()
    }
}

/// Remove `cid` from one endpoint's ordered connection list.  Absence is a
/// fatal invariant violation: the graph was corrupted earlier.
fn remove_connection(
    iface: &mut NetworkInterface,
    cid: ConnectionId,
    id: InterfaceId,
) -> SimResult<()> {
    match iface.connections.iter().position(|&c| c == cid) {
        Some(pos) => {
            iface.connections.remove(pos);
            Ok(())
        }
        None => Err(SimError::ConnectionNotFound {
            connection: cid,
            interface:  id,
        }),
    }
}
