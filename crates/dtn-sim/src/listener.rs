//! Update listeners.

use dtn_net::Host;

/// Callback fired once per completed [`World::update`][crate::World::update],
/// after the final host-update pass of the tick.
pub trait UpdateListener: Send {
    fn updated(&mut self, hosts: &[Host]);
}
