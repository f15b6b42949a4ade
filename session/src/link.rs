//! Peer link identifiers and handles.

use std::fmt;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Transport-assigned identifier for one peer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

/// Which side of the connection this node is on.
///
/// A node simultaneously accepts inbound peers and holds outbound peers
/// open; both roles carry identical flooded traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// The peer connected to us.
    Server,
    /// We connected to the peer.
    Client,
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkRole::Server => write!(f, "server"),
            LinkRole::Client => write!(f, "client"),
        }
    }
}

/// An active link: its role and the channel the transport drains.
#[derive(Debug)]
pub(crate) struct LinkHandle {
    pub role: LinkRole,
    pub frame_tx: mpsc::Sender<Bytes>,
}
