//! Engine configuration.

use std::time::Duration;

use driftmesh_crypto::UnknownSenderPolicy;
use driftmesh_routing::{RouterConfig, INITIAL_TTL};
use driftmesh_wire::MAX_CHUNK_PAYLOAD;

/// Configuration for a mesh node.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Hop budget for locally originated packets.
    pub initial_ttl: u8,
    /// Largest payload per packet.
    pub max_chunk_payload: usize,
    /// Retention window for processed-id records.
    pub dedup_retention: Duration,
    /// Eviction window for incomplete reassembly buffers.
    pub reassembly_timeout: Duration,
    /// How often expired records are swept.
    pub sweep_interval: Duration,
    /// Outbound frames buffered per link before the link is considered slow.
    pub link_send_buffer: usize,
    /// How messages from senders missing in the directory are handled.
    pub unknown_sender_policy: UnknownSenderPolicy,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            initial_ttl: INITIAL_TTL,
            max_chunk_payload: MAX_CHUNK_PAYLOAD,
            dedup_retention: Duration::from_secs(600),
            reassembly_timeout: Duration::from_secs(120),
            sweep_interval: Duration::from_secs(30),
            link_send_buffer: 64,
            unknown_sender_policy: UnknownSenderPolicy::default(),
        }
    }
}

impl NodeConfig {
    /// The router slice of this configuration.
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            max_chunk_payload: self.max_chunk_payload,
            initial_ttl: self.initial_ttl,
            dedup_retention: self.dedup_retention,
            reassembly_timeout: self.reassembly_timeout,
        }
    }
}
