//! The flood router: chunking on the way out, dedup/relay/reassembly on the
//! way in.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tracing::{debug, trace};

use driftmesh_wire::{AddressBytes, Packet, PacketType, MAX_CHUNK_PAYLOAD};

use crate::dedup::SeenSet;
use crate::reassembly::ReassemblyBuffer;

/// Hop budget assigned to every locally originated packet.
pub const INITIAL_TTL: u8 = 10;

/// Router tuning knobs.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Largest payload per packet; capped at the wire limit.
    pub max_chunk_payload: usize,
    /// Hop budget for originated packets.
    pub initial_ttl: u8,
    /// How long processed-id records are retained.
    pub dedup_retention: Duration,
    /// How long an incomplete reassembly buffer may linger.
    pub reassembly_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_chunk_payload: MAX_CHUNK_PAYLOAD,
            initial_ttl: INITIAL_TTL,
            dedup_retention: Duration::from_secs(600),
            reassembly_timeout: Duration::from_secs(120),
        }
    }
}

/// What the session layer should do with one inbound buffer.
#[derive(Debug)]
pub enum RouterVerdict {
    /// Packet is in transit for another node; flood it onward.
    Relay(Packet),
    /// A logical message addressed to this node completed reassembly.
    Deliver(Delivered),
}

/// A fully reassembled inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    /// Wire type of the message's packets.
    pub kind: PacketType,
    /// Originator's address digest.
    pub src_hash: AddressBytes,
    /// Reassembled (still sealed) payload bytes.
    pub payload: Vec<u8>,
}

struct RouterState {
    /// `(message_id, chunk_index)` pairs this node has already relayed.
    relay_seen: SeenSet<(u32, u16)>,
    /// Message ids fully consumed locally, including our own outbound ids.
    completed: SeenSet<u32>,
    /// Partially reassembled inbound messages.
    partial: HashMap<u32, ReassemblyBuffer>,
}

/// Splits outbound envelopes into packets and sorts inbound packets into
/// relay and delivery verdicts.
///
/// All shared state sits behind one mutex so concurrent link callbacks
/// cannot race the completion check against the dedup records.
pub struct Router {
    cfg: RouterConfig,
    self_hash: AddressBytes,
    state: Mutex<RouterState>,
}

impl Router {
    /// Create a router for the node with the given wire address.
    pub fn new(cfg: RouterConfig, self_hash: AddressBytes) -> Self {
        let state = RouterState {
            relay_seen: SeenSet::new(cfg.dedup_retention),
            completed: SeenSet::new(cfg.dedup_retention),
            partial: HashMap::new(),
        };
        Self {
            cfg,
            self_hash,
            state: Mutex::new(state),
        }
    }

    /// Split a sealed envelope into wire packets under a fresh message id.
    ///
    /// The id is recorded as already processed so a rebroadcast of our own
    /// flood heard from a neighbor is never relayed or delivered back.
    pub fn prepare(
        &self,
        envelope: &[u8],
        dest_hash: AddressBytes,
        src_hash: AddressBytes,
    ) -> Vec<Packet> {
        let message_id = rand::random::<u32>();
        let timestamp = unix_millis();
        let chunk_size = self.cfg.max_chunk_payload.min(MAX_CHUNK_PAYLOAD);

        // An empty envelope still travels as one empty chunk.
        let chunk_count = envelope.len().div_ceil(chunk_size).max(1);
        let mut packets = Vec::with_capacity(chunk_count);
        let mut offset = 0;
        for index in 0..chunk_count {
            let end = (offset + chunk_size).min(envelope.len());
            packets.push(Packet {
                kind: PacketType::Data,
                message_id,
                chunk_index: index as u16,
                chunk_count: chunk_count as u16,
                dest_hash,
                src_hash,
                ttl: self.cfg.initial_ttl,
                timestamp,
                payload: Bytes::copy_from_slice(&envelope[offset..end]),
            });
            offset = end;
        }

        self.lock_state()
            .completed
            .insert(message_id, Instant::now());
        debug!(
            message_id,
            chunks = packets.len(),
            bytes = envelope.len(),
            "prepared outbound message"
        );
        packets
    }

    /// Build a single delivery acknowledgment packet.
    pub fn prepare_ack(&self, dest_hash: AddressBytes, src_hash: AddressBytes) -> Packet {
        let message_id = rand::random::<u32>();
        self.lock_state()
            .completed
            .insert(message_id, Instant::now());
        Packet {
            kind: PacketType::Ack,
            message_id,
            chunk_index: 0,
            chunk_count: 1,
            dest_hash,
            src_hash,
            ttl: self.cfg.initial_ttl,
            timestamp: unix_millis(),
            payload: Bytes::new(),
        }
    }

    /// Process one inbound buffer from any link.
    ///
    /// Malformed, expired-TTL, and already-seen packets are dropped
    /// silently; everything else yields a verdict.
    pub fn handle_inbound(&self, raw: &[u8]) -> Option<RouterVerdict> {
        let packet = match Packet::decode(raw) {
            Ok(packet) => packet,
            Err(err) => {
                debug!(error = %err, len = raw.len(), "dropping malformed packet");
                return None;
            }
        };

        if packet.ttl == 0 {
            debug!(message_id = packet.message_id, "dropping packet with expired ttl");
            return None;
        }
        if packet.chunk_count == 0 {
            debug!(message_id = packet.message_id, "dropping packet with zero chunk count");
            return None;
        }

        let now = Instant::now();
        if packet.dest_hash != self.self_hash {
            return self.relay(packet, now);
        }
        self.accept(packet, now)
    }

    /// Evict expired dedup records and abandoned reassembly buffers.
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut state = self.lock_state();
        let relays = state.relay_seen.sweep(now);
        let completed = state.completed.sweep(now);

        let timeout = self.cfg.reassembly_timeout;
        let before = state.partial.len();
        state
            .partial
            .retain(|_, buffer| now.duration_since(buffer.created()) < timeout);
        let partials = before - state.partial.len();

        if relays + completed + partials > 0 {
            debug!(relays, completed, partials, "swept expired router records");
        }
    }

    fn relay(&self, mut packet: Packet, now: Instant) -> Option<RouterVerdict> {
        let mut state = self.lock_state();

        // Our own flood, or a message this node already consumed.
        if state.completed.contains(&packet.message_id) {
            trace!(message_id = packet.message_id, "not relaying completed message");
            return None;
        }
        if !state
            .relay_seen
            .insert((packet.message_id, packet.chunk_index), now)
        {
            trace!(
                message_id = packet.message_id,
                chunk = packet.chunk_index,
                "already relayed"
            );
            return None;
        }
        drop(state);

        packet.ttl -= 1;
        debug!(
            message_id = packet.message_id,
            chunk = packet.chunk_index,
            ttl = packet.ttl,
            "relaying packet"
        );
        Some(RouterVerdict::Relay(packet))
    }

    fn accept(&self, packet: Packet, now: Instant) -> Option<RouterVerdict> {
        let mut state = self.lock_state();

        if state.completed.contains(&packet.message_id) {
            trace!(message_id = packet.message_id, "duplicate of completed message");
            return None;
        }

        let buffer = state
            .partial
            .entry(packet.message_id)
            .or_insert_with(|| ReassemblyBuffer::new(packet.chunk_count, now));
        buffer.insert(packet.chunk_index, packet.payload.clone());

        if !buffer.is_complete() {
            return None;
        }

        let Some(buffer) = state.partial.remove(&packet.message_id) else {
            return None;
        };
        state.completed.insert(packet.message_id, now);
        drop(state);

        let payload = buffer.assemble();
        debug!(
            message_id = packet.message_id,
            bytes = payload.len(),
            "reassembled inbound message"
        );
        Some(RouterVerdict::Deliver(Delivered {
            kind: packet.kind,
            src_hash: packet.src_hash,
            payload,
        }))
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RouterState> {
        // A poisoned lock only means a panic elsewhere; the records are
        // still coherent enough to keep routing.
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
