//! Wire codec error types.

use thiserror::Error;

/// Wire codec errors
#[derive(Error, Debug)]
pub enum WireError {
    /// Buffer shorter than the fixed header
    #[error("incomplete packet: {0} bytes")]
    Incomplete(usize),

    /// Declared payload length exceeds the buffer
    #[error("declared payload length {declared} exceeds remaining {remaining} bytes")]
    Length {
        /// Payload length from the header
        declared: usize,
        /// Bytes actually present after the header
        remaining: usize,
    },

    /// Unknown packet type byte
    #[error("unknown packet type {0:#04x}")]
    Type(u8),

    /// Payload larger than a single chunk allows
    #[error("payload of {0} bytes exceeds chunk limit")]
    Oversize(usize),
}
