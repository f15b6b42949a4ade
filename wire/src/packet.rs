//! The on-wire packet: fixed 84-byte header plus opaque payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::WireError;

/// Fixed header size in bytes (1 + 4 + 2 + 2 + 32 + 32 + 1 + 8 + 2)
pub const HEADER_SIZE: usize = 84;

/// Maximum payload bytes carried by one packet.
///
/// Short-range links top out near 512-byte frames; 400 leaves headroom for
/// the header on every transport the engine targets.
pub const MAX_CHUNK_PAYLOAD: usize = 400;

/// Raw 32-byte address digest as it appears on the wire
pub type AddressBytes = [u8; 32];

/// Packet types
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketType {
    /// Application data chunk
    Data = 0x01,
    /// Data chunk in transit for another node (same layout as Data)
    Relay = 0x02,
    /// Delivery acknowledgment, empty payload
    Ack = 0x03,
}

impl TryFrom<u8> for PacketType {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(PacketType::Data),
            0x02 => Ok(PacketType::Relay),
            0x03 => Ok(PacketType::Ack),
            _ => Err(WireError::Type(value)),
        }
    }
}

/// One wire packet: a chunk of a logical message, or a standalone ACK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet type
    pub kind: PacketType,
    /// Identifier shared by every chunk of one logical message
    pub message_id: u32,
    /// Zero-based index of this chunk
    pub chunk_index: u16,
    /// Total chunk count of the message
    pub chunk_count: u16,
    /// Destination address digest
    pub dest_hash: AddressBytes,
    /// Source address digest
    pub src_hash: AddressBytes,
    /// Remaining hop budget
    pub ttl: u8,
    /// Originator send time, millis since the epoch; diagnostic only
    pub timestamp: u64,
    /// Opaque payload, at most [`MAX_CHUNK_PAYLOAD`] bytes
    pub payload: Bytes,
}

impl Packet {
    /// Create a packet, rejecting oversized payloads.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: PacketType,
        message_id: u32,
        chunk_index: u16,
        chunk_count: u16,
        dest_hash: AddressBytes,
        src_hash: AddressBytes,
        ttl: u8,
        timestamp: u64,
        payload: Bytes,
    ) -> Result<Self, WireError> {
        if payload.len() > MAX_CHUNK_PAYLOAD {
            return Err(WireError::Oversize(payload.len()));
        }
        Ok(Self {
            kind,
            message_id,
            chunk_index,
            chunk_count,
            dest_hash,
            src_hash,
            ttl,
            timestamp,
            payload,
        })
    }

    /// Total encoded size in bytes.
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Encode to exactly `HEADER_SIZE + payload.len()` bytes, big-endian.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_size());
        buf.put_u8(self.kind as u8);
        buf.put_u32(self.message_id);
        buf.put_u16(self.chunk_index);
        buf.put_u16(self.chunk_count);
        buf.put_slice(&self.dest_hash);
        buf.put_slice(&self.src_hash);
        buf.put_u8(self.ttl);
        buf.put_u64(self.timestamp);
        buf.put_u16(self.payload.len() as u16);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Decode one packet from a buffer.
    ///
    /// Fails only on framing problems: a buffer shorter than the header, a
    /// declared payload length that overruns the buffer, or an unknown type
    /// byte. TTL and routing fields are not validated here. Bytes beyond the
    /// declared payload length are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < HEADER_SIZE {
            return Err(WireError::Incomplete(bytes.len()));
        }

        let mut buf = Bytes::copy_from_slice(bytes);
        let kind = PacketType::try_from(buf.get_u8())?;
        let message_id = buf.get_u32();
        let chunk_index = buf.get_u16();
        let chunk_count = buf.get_u16();

        let mut dest_hash = [0u8; 32];
        buf.copy_to_slice(&mut dest_hash);
        let mut src_hash = [0u8; 32];
        buf.copy_to_slice(&mut src_hash);

        let ttl = buf.get_u8();
        let timestamp = buf.get_u64();
        let payload_len = buf.get_u16() as usize;

        if buf.len() < payload_len {
            return Err(WireError::Length {
                declared: payload_len,
                remaining: buf.len(),
            });
        }
        let payload = buf.split_to(payload_len);

        Ok(Self {
            kind,
            message_id,
            chunk_index,
            chunk_count,
            dest_hash,
            src_hash,
            ttl,
            timestamp,
            payload,
        })
    }
}
