//! Live connections and their arena.
//!
//! # Why an arena
//!
//! A connection references two interfaces and each interface holds a list of
//! its connections — a cycle.  Instead of reference counting, connections
//! live in a slab keyed by stable [`ConnectionId`]s and interfaces hold plain
//! ID lists; endpoints resolve through the arena.  Teardown frees the slot
//! for reuse, so the arena never grows beyond the peak number of
//! simultaneously live links.

use dtn_core::{ConnectionId, HostAddress, InterfaceId};

// ── Connection ────────────────────────────────────────────────────────────────

/// A symmetric link between two interfaces of matching type.
///
/// `from` is the interface whose update created the link; listener fan-out
/// reports its host first.  Apart from that ordering the link is symmetric.
#[derive(Clone, Debug)]
pub struct Connection {
    pub(crate) id:        ConnectionId,
    pub(crate) from:      InterfaceId,
    pub(crate) to:        InterfaceId,
    pub(crate) from_host: HostAddress,
    pub(crate) to_host:   HostAddress,
    pub(crate) up:        bool,
    transferring:         bool,
    pub(crate) speed:     i32,
}

impl Connection {
    pub(crate) fn new(
        id:        ConnectionId,
        from:      InterfaceId,
        from_host: HostAddress,
        to:        InterfaceId,
        to_host:   HostAddress,
        speed:     i32,
    ) -> Self {
        Self {
            id,
            from,
            to,
            from_host,
            to_host,
            up: true,
            transferring: false,
            speed,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The endpoint that is not `iface`.
    ///
    /// # Panics
    /// Panics if `iface` is not an endpoint of this connection.
    pub fn other_interface(&self, iface: InterfaceId) -> InterfaceId {
        if iface == self.from {
            self.to
        } else if iface == self.to {
            self.from
        } else {
            panic!("{iface} is not an endpoint of {}", self.id)
        }
    }

    /// The host that is not `host`.
    ///
    /// # Panics
    /// Panics if `host` owns neither endpoint.
    pub fn other_host(&self, host: HostAddress) -> HostAddress {
        if host == self.from_host {
            self.to_host
        } else if host == self.to_host {
            self.from_host
        } else {
            panic!("{host} is not an endpoint host of {}", self.id)
        }
    }

    pub fn involves_interface(&self, iface: InterfaceId) -> bool {
        self.from == iface || self.to == iface
    }

    pub fn endpoints(&self) -> (InterfaceId, InterfaceId) {
        (self.from, self.to)
    }

    pub fn hosts(&self) -> (HostAddress, HostAddress) {
        (self.from_host, self.to_host)
    }

    pub fn is_up(&self) -> bool {
        self.up
    }

    /// Current link speed in bits per second.
    pub fn speed(&self) -> i32 {
        self.speed
    }

    pub fn is_transferring(&self) -> bool {
        self.transferring
    }

    /// Mark a transfer as started or finished.  Driven by the routing layer;
    /// the core only stores the flag.
    pub fn set_transferring(&mut self, transferring: bool) {
        self.transferring = transferring;
    }
}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{} <-> {}, {}]",
            self.id,
            self.from_host,
            self.to_host,
            if self.up { "up" } else { "down" }
        )
    }
}

// ── ConnectionArena ───────────────────────────────────────────────────────────

/// Slab of live connections with free-slot recycling.
#[derive(Default)]
pub struct ConnectionArena {
    slots: Vec<Option<Connection>>,
    free:  Vec<ConnectionId>,
}

impl ConnectionArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a slot and build the connection in place via `make`, which
    /// receives the assigned ID.
    pub(crate) fn insert_with<F>(&mut self, make: F) -> ConnectionId
    where
        F: FnOnce(ConnectionId) -> Connection,
    {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = Some(make(id));
                id
            }
            None => {
                let id = ConnectionId(self.slots.len() as u32);
                self.slots.push(Some(make(id)));
                id
            }
        }
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Free a slot, returning the connection that occupied it.
    pub(crate) fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        let con = self.slots.get_mut(id.index()).and_then(Option::take)?;
        self.free.push(id);
        Some(con)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterator over all live connections, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.slots.iter().filter_map(Option::as_ref)
    }
}

impl std::ops::Index<ConnectionId> for ConnectionArena {
    type Output = Connection;

    fn index(&self, id: ConnectionId) -> &Connection {
        match self.get(id) {
            Some(con) => con,
            None => panic!("{id} refers to a freed connection slot"),
        }
    }
}

impl std::ops::IndexMut<ConnectionId> for ConnectionArena {
    fn index_mut(&mut self, id: ConnectionId) -> &mut Connection {
        match self.get_mut(id) {
            Some(con) => con,
            None => panic!("{id} refers to a freed connection slot"),
        }
    }
}
