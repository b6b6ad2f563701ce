//! Hosts and the routing callback surface.

use dtn_core::{Coord, HostAddress, InterfaceId, ModuleBus};

use crate::connection::Connection;
use crate::movement::MovementModel;

// ── Router ────────────────────────────────────────────────────────────────────

/// The routing layer's callback surface.
///
/// Routing and messaging are external to this core; a host forwards link
/// transitions and injected traffic to whatever implements this trait.  All
/// methods default to no-ops so a connectivity-only simulation can run with
/// [`NoopRouter`].
pub trait Router: Send {
    /// A connection involving this host came up.
    fn connection_up(&mut self, _con: &Connection) {}

    /// A connection involving this host went down.
    fn connection_down(&mut self, _con: &Connection) {}

    /// Called once per host-update pass, after connectivity has been
    /// reconciled for this host.
    fn update(&mut self, _now: f64) {}

    /// An external event injected a new message originating at this host.
    fn message_created(
        &mut self,
        _from: HostAddress,
        _to: HostAddress,
        _id: &str,
        _size: u32,
        _response_size: u32,
    ) {
    }
}

/// A [`Router`] that ignores everything.
pub struct NoopRouter;

impl Router for NoopRouter {}

// ── Host ──────────────────────────────────────────────────────────────────────

/// A mobile node: a position, a module bus, and one or more radio
/// interfaces living in the engine's arena.
///
/// The address always equals the host's index in the world host list.
pub struct Host {
    address:  HostAddress,
    name:     String,
    location: Coord,
    bus:      ModuleBus,
    pub(crate) interfaces: Vec<InterfaceId>,
    movement: Box<dyn MovementModel>,
    router:   Box<dyn Router>,
}

impl Host {
    pub fn new(
        address:  HostAddress,
        name:     String,
        location: Coord,
        movement: Box<dyn MovementModel>,
        router:   Box<dyn Router>,
    ) -> Self {
        Self {
            address,
            name,
            location,
            bus: ModuleBus::new(),
            interfaces: Vec::new(),
            movement,
            router,
        }
    }

    pub fn address(&self) -> HostAddress {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Coord {
        self.location
    }

    /// Place the host directly, bypassing its movement model.
    pub fn set_location(&mut self, location: Coord) {
        self.location = location;
    }

    /// IDs of this host's interfaces, in attachment order.
    pub fn interfaces(&self) -> &[InterfaceId] {
        &self.interfaces
    }

    pub fn com_bus(&self) -> &ModuleBus {
        &self.bus
    }

    pub fn com_bus_mut(&mut self) -> &mut ModuleBus {
        &mut self.bus
    }

    /// Advance the host's position by `dt` seconds of movement.
    pub fn move_for(&mut self, dt: f64) {
        self.location = self.movement.step(self.address, self.location, dt);
    }

    /// Replace the router surface (e.g. to install a recording router).
    pub fn set_router(&mut self, router: Box<dyn Router>) {
        self.router = router;
    }

    // ── Routing callback fan-out ──────────────────────────────────────────

    pub fn connection_up(&mut self, con: &Connection) {
        self.router.connection_up(con);
    }

    pub fn connection_down(&mut self, con: &Connection) {
        self.router.connection_down(con);
    }

    pub fn router_update(&mut self, now: f64) {
        self.router.update(now);
    }

    pub fn message_created(
        &mut self,
        from: HostAddress,
        to: HostAddress,
        id: &str,
        size: u32,
        response_size: u32,
    ) {
        self.router.message_created(from, to, id, size, response_size);
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}) @ {}", self.name, self.address, self.location)
    }
}
