//! Events emitted by the engine toward the application layer.

use std::fmt;

use driftmesh_identity::AddressHash;

/// High-level node lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Engine constructed or stopped; nothing running.
    Idle,
    /// Accepting inbound links and discovering peers, none connected.
    Listening,
    /// An outbound connection attempt is in flight.
    Connecting,
    /// At least one link is active.
    Connected,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeState::Idle => "idle",
            NodeState::Listening => "listening",
            NodeState::Connecting => "connecting",
            NodeState::Connected => "connected",
        };
        write!(f, "{}", name)
    }
}

/// Events emitted by a [`crate::MeshNode`].
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// The lifecycle state changed.
    StateChanged(NodeState),
    /// A message addressed to this node was reassembled and opened.
    MessageReceived {
        /// Decrypted message text.
        plaintext: String,
        /// Sender's wire address.
        sender: AddressHash,
        /// Whether the sender's signature verified against the directory.
        authenticated: bool,
    },
    /// A peer acknowledged delivery of a message we originated.
    Delivered {
        /// The acknowledging peer's wire address.
        peer: AddressHash,
    },
}
