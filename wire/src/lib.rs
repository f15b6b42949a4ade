//! Wire packet framing and encoding/decoding for driftmesh.
//!
//! This crate provides the on-wire unit of the mesh protocol: a fixed-layout
//! binary packet with an 84-byte header and an opaque payload of at most
//! [`MAX_CHUNK_PAYLOAD`] bytes. It is a pure framing codec; routing and
//! crypto semantics live in the `driftmesh-routing` and `driftmesh-crypto`
//! crates.
//!
//! ## Wire Format
//!
//! All multi-byte integers are big-endian.
//!
//! ```text
//! +----------------+------+--------------------------------------+
//! | type           | u8   | 0x01 DATA, 0x02 RELAY, 0x03 ACK      |
//! | message_id     | u32  | random per logical message           |
//! | chunk_index    | u16  | zero-based, < chunk_count            |
//! | chunk_count    | u16  | total chunks of the message          |
//! | dest_hash      | 32B  | digest of destination identity       |
//! | src_hash       | 32B  | digest of source identity            |
//! | ttl            | u8   | hop budget, decremented per relay    |
//! | timestamp      | u64  | originator millis, diagnostic only   |
//! | payload_length | u16  | trailing payload byte count          |
//! +----------------+------+--------------------------------------+
//! | payload        | 0..=400 bytes, opaque                       |
//! +-------------------------------------------------------------+
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod packet;

pub use error::WireError;
pub use packet::{AddressBytes, Packet, PacketType, HEADER_SIZE, MAX_CHUNK_PAYLOAD};
