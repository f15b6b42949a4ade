//! Address hashes: the one-way digest of a node's public identity that
//! appears on the wire in place of the identity itself.

use std::fmt;

use rsa::pkcs8::EncodePublicKey;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256};

/// SHA-256 digest of a node's DER-encoded public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressHash(pub [u8; 32]);

impl AddressHash {
    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// All-zero hash, the placeholder destination before a peer is chosen.
    pub fn zero() -> Self {
        Self([0u8; 32])
    }
}

impl From<[u8; 32]> for AddressHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for AddressHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Eight hex chars identify a peer well enough in logs.
        write!(f, "{}", &hex::encode(self.0)[..8])
    }
}

impl fmt::Debug for AddressHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AddressHash({})", self)
    }
}

/// Digest a public key into its wire address.
pub fn address_hash(public_key: &RsaPublicKey) -> AddressHash {
    let der = public_key
        .to_public_key_der()
        .expect("RSA public key always encodes to DER");
    let digest = Sha256::digest(der.as_bytes());
    AddressHash(digest.into())
}
