//! Identity adapter: address hashing, key store and contact directory
//! contracts for driftmesh.
//!
//! The engine never generates or persists key material itself; it consumes
//! the [`KeyStore`] and [`Directory`] traits defined here. The host
//! application backs them with whatever platform keystore and contact
//! database it owns. In-memory implementations are provided for development
//! and tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod store;

pub use address::{address_hash, AddressHash};
pub use store::{Directory, IdentityError, KeyStore, MemoryDirectory, MemoryIdentity};

// Key material crosses the adapter boundary as `rsa` types.
pub use rsa::{RsaPrivateKey, RsaPublicKey};
