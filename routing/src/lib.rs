//! Flood-relay routing, chunking, dedup, and reassembly for driftmesh.
//!
//! The [`Router`] turns sealed envelopes into wire packets and turns inbound
//! raw bytes into verdicts: relay onward, or deliver a fully reassembled
//! message. Loop suppression combines a per-node dedup record with the
//! packet TTL, bounding any flood to one rebroadcast attempt per node per
//! chunk and a finite hop count.
//!
//! The router has no I/O of its own; the session layer floods `Relay`
//! verdicts to its links and opens `Deliver` payloads.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dedup;
pub mod reassembly;
pub mod router;

pub use dedup::SeenSet;
pub use reassembly::ReassemblyBuffer;
pub use router::{Delivered, Router, RouterConfig, RouterVerdict, INITIAL_TTL};
