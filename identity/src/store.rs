//! Key store and contact directory contracts, with in-memory backends for
//! development and tests.

use dashmap::DashMap;
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

use crate::address::{address_hash, AddressHash};

/// Identity adapter errors
#[derive(Error, Debug)]
pub enum IdentityError {
    /// Key pair generation failed
    #[error("key generation failed: {0}")]
    Keygen(#[from] rsa::Error),
}

/// Access to the local node's long-lived key pair.
///
/// Implementations wrap the platform keystore; the engine only reads.
pub trait KeyStore: Send + Sync {
    /// Wire address of this node.
    fn address_hash(&self) -> AddressHash;

    /// Private half, used to decrypt session keys and sign plaintext.
    fn private_key(&self) -> &RsaPrivateKey;

    /// Public half, shared with contacts out of band.
    fn public_key(&self) -> RsaPublicKey;
}

/// Lookup from a wire address to a contact's public key.
pub trait Directory: Send + Sync {
    /// Resolve a peer's public key, if the contact is known.
    fn resolve_public_key(&self, peer: &AddressHash) -> Option<RsaPublicKey>;
}

/// In-memory identity holding a freshly generated RSA-2048 pair.
///
/// For development and tests only; real deployments back [`KeyStore`] with
/// the platform keystore.
pub struct MemoryIdentity {
    private_key: RsaPrivateKey,
    hash: AddressHash,
}

impl MemoryIdentity {
    /// Generate a new 2048-bit identity.
    pub fn generate() -> Result<Self, IdentityError> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048)?;
        let hash = address_hash(&private_key.to_public_key());
        Ok(Self { private_key, hash })
    }

    /// Wrap an existing private key.
    pub fn from_private_key(private_key: RsaPrivateKey) -> Self {
        let hash = address_hash(&private_key.to_public_key());
        Self { private_key, hash }
    }
}

impl KeyStore for MemoryIdentity {
    fn address_hash(&self) -> AddressHash {
        self.hash
    }

    fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }
}

/// In-memory contact directory (dev/tests only).
#[derive(Default)]
pub struct MemoryDirectory {
    contacts: DashMap<AddressHash, RsaPublicKey>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contact; its address is derived from the key.
    pub fn insert(&self, public_key: RsaPublicKey) -> AddressHash {
        let hash = address_hash(&public_key);
        self.contacts.insert(hash, public_key);
        hash
    }
}

impl Directory for MemoryDirectory {
    fn resolve_public_key(&self, peer: &AddressHash) -> Option<RsaPublicKey> {
        self.contacts.get(peer).map(|entry| entry.value().clone())
    }
}
