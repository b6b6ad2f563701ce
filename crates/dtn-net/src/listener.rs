//! Connection transition listeners.

use dtn_core::HostAddress;

/// Callbacks fired once per link transition.
///
/// The first argument is always the host whose interface update initiated
/// the transition; the second is the peer.  Both methods default to no-ops
/// so implementors only override what they record.
pub trait ConnectionListener: Send {
    fn hosts_connected(&mut self, _initiator: HostAddress, _peer: HostAddress) {}

    fn hosts_disconnected(&mut self, _initiator: HostAddress, _peer: HostAddress) {}
}
