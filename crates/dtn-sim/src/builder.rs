//! Fluent builder for constructing a [`World`].

use log::info;

use dtn_core::{Coord, HostAddress, SettingsError};
use dtn_net::{
    ConnectionListener, Host, MovementModel, NetSettings, NetworkEngine, NetworkInterface,
    NoopRouter, Router,
};

use crate::events::EventQueue;
use crate::listener::UpdateListener;
use crate::world::{World, WorldSettings};

/// Handle of an interface prototype registered with a [`WorldBuilder`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProtoId(usize);

/// Assembles hosts, interface prototypes, event queues, and listeners into
/// a ready-to-step [`World`].
///
/// # Example
///
/// ```rust,ignore
/// let mut b = WorldBuilder::new(WorldSettings::default());
/// let radio = b.register_interface(&NetSettings::new("T", 10.0, 250_000))?;
/// b.add_host(Coord::new(0.0, 0.0), Box::new(StationaryMovement), &[radio]);
/// b.add_host(Coord::new(5.0, 0.0), Box::new(StationaryMovement), &[radio]);
/// let mut world = b.build()?;
/// world.update()?;
/// ```
pub struct WorldBuilder {
    settings:   WorldSettings,
    engine:     NetworkEngine,
    prototypes: Vec<NetworkInterface>,
    hosts:      Vec<Host>,
    queues:     Vec<Box<dyn EventQueue>>,
    connection_listeners: Vec<Box<dyn ConnectionListener>>,
    update_listeners:     Vec<Box<dyn UpdateListener>>,
}

impl WorldBuilder {
    pub fn new(settings: WorldSettings) -> Self {
        let engine = NetworkEngine::new(settings.width, settings.height);
        Self {
            settings,
            engine,
            prototypes: Vec::new(),
            hosts: Vec::new(),
            queues: Vec::new(),
            connection_listeners: Vec::new(),
            update_listeners: Vec::new(),
        }
    }

    // ── Interface prototypes ──────────────────────────────────────────────

    /// Validate `settings` and register an interface prototype that hosts
    /// can replicate.
    pub fn register_interface(&mut self, settings: &NetSettings) -> Result<ProtoId, SettingsError> {
        let proto = self.engine.make_prototype(settings)?;
        Ok(self.register_prototype(proto))
    }

    /// Build a prototype from settings without registering it, e.g. to
    /// install an activeness handler first.
    pub fn make_prototype(
        &mut self,
        settings: &NetSettings,
    ) -> Result<NetworkInterface, SettingsError> {
        self.engine.make_prototype(settings)
    }

    /// Register a customized prototype (see [`make_prototype`][Self::make_prototype]).
    pub fn register_prototype(&mut self, proto: NetworkInterface) -> ProtoId {
        self.prototypes.push(proto);
        ProtoId(self.prototypes.len() - 1)
    }

    // ── Hosts ─────────────────────────────────────────────────────────────

    /// Add a host at `location`, replicating one interface per prototype in
    /// `interfaces`.  The returned address equals the host's index.
    pub fn add_host(
        &mut self,
        location:   Coord,
        movement:   Box<dyn MovementModel>,
        interfaces: &[ProtoId],
    ) -> HostAddress {
        let address = HostAddress(self.hosts.len() as u32);
        let mut host = Host::new(
            address,
            format!("n{}", address.0),
            location,
            movement,
            Box::new(NoopRouter),
        );
        for &ProtoId(p) in interfaces {
            self.engine.add_interface(&self.prototypes[p], &mut host);
        }
        self.hosts.push(host);
        address
    }

    /// Install a routing surface on a previously added host.
    pub fn set_router(&mut self, host: HostAddress, router: Box<dyn Router>) {
        self.hosts[host.index()].set_router(router);
    }

    // ── Collaborators ─────────────────────────────────────────────────────

    /// Register an external event queue.  Tie-break order among queues
    /// follows registration order, after the built-in scheduled-updates
    /// queue.
    pub fn add_event_queue(&mut self, queue: Box<dyn EventQueue>) {
        self.queues.push(queue);
    }

    pub fn add_connection_listener(&mut self, listener: Box<dyn ConnectionListener>) {
        self.connection_listeners.push(listener);
    }

    pub fn add_update_listener(&mut self, listener: Box<dyn UpdateListener>) {
        self.update_listeners.push(listener);
    }

    // ── Build ─────────────────────────────────────────────────────────────

    pub fn build(self) -> Result<World, SettingsError> {
        self.settings.validate()?;
        info!(
            "world built: {} hosts, {} interfaces, {} event queues",
            self.hosts.len(),
            self.engine.interface_count(),
            self.queues.len(),
        );
        Ok(World::new(
            self.settings,
            self.hosts,
            self.engine,
            self.queues,
            self.connection_listeners,
            self.update_listeners,
        ))
    }
}
