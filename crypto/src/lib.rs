//! End-to-end crypto envelope for driftmesh.
//!
//! Every application payload is wrapped in a hybrid envelope before it
//! enters the transport: an ephemeral AES-256 session key encrypts the
//! plaintext under AES-GCM, the session key travels RSA-encrypted to the
//! recipient, and an RSA signature over the plaintext authenticates the
//! sender. Relay nodes see only the sealed envelope, chopped into chunks.
//!
//! ## Envelope Format
//!
//! ```text
//! +---------------------+----------------------------------------+
//! | encrypted_key       | 256B, RSA-2048 PKCS#1 v1.5             |
//! | signature           | 256B, RSA PKCS#1 v1.5 over plaintext   |
//! | aes_blob            | 12B IV || AES-256-GCM ciphertext+tag   |
//! +---------------------+----------------------------------------+
//! ```
//!
//! Session keys live for exactly one logical message and are never
//! persisted.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod envelope;
pub mod error;

pub use envelope::{
    open, seal, OpenedMessage, UnknownSenderPolicy, ENVELOPE_OVERHEAD, GCM_IV_LEN, RSA_BLOCK_LEN,
};
pub use error::EnvelopeError;
