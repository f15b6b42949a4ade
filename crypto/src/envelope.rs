//! Sealing and opening of the hybrid RSA/AES-GCM envelope.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use tracing::debug;

use driftmesh_identity::{AddressHash, Directory};

use crate::EnvelopeError;

/// Size of one RSA-2048 block: the wrapped key and the signature.
pub const RSA_BLOCK_LEN: usize = 256;

/// Fixed prefix before the AES blob: wrapped key plus signature.
pub const ENVELOPE_OVERHEAD: usize = 2 * RSA_BLOCK_LEN;

/// AES-GCM initialization vector length.
pub const GCM_IV_LEN: usize = 12;

const AES_KEY_LEN: usize = 32;

/// How `open` treats a sender missing from the contact directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownSenderPolicy {
    /// Deliver the message but report it unauthenticated.
    #[default]
    AcceptUnauthenticated,
    /// Discard messages whose sender cannot be verified.
    RejectUnknown,
}

/// A successfully opened envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedMessage {
    /// Recovered plaintext.
    pub plaintext: String,
    /// Whether the sender's signature verified against a directory entry.
    pub authenticated: bool,
}

/// Seal `plaintext` for `recipient`, signed by the local private key.
///
/// Generates a fresh AES-256 session key and a random 96-bit IV per call.
pub fn seal(
    plaintext: &str,
    recipient: &RsaPublicKey,
    signer: &RsaPrivateKey,
) -> Result<Vec<u8>, EnvelopeError> {
    let mut rng = rand::thread_rng();

    let mut aes_key = [0u8; AES_KEY_LEN];
    rng.fill_bytes(&mut aes_key);
    let mut iv = [0u8; GCM_IV_LEN];
    rng.fill_bytes(&mut iv);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&aes_key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|_| EnvelopeError::Cipher)?;

    let encrypted_key = recipient
        .encrypt(&mut rng, Pkcs1v15Encrypt, &aes_key)
        .map_err(EnvelopeError::KeyWrap)?;

    let signing_key = SigningKey::<Sha256>::new(signer.clone());
    let signature = signing_key
        .try_sign(plaintext.as_bytes())
        .map_err(EnvelopeError::Signing)?
        .to_vec();

    let mut envelope = Vec::with_capacity(ENVELOPE_OVERHEAD + GCM_IV_LEN + ciphertext.len());
    envelope.extend_from_slice(&encrypted_key);
    envelope.extend_from_slice(&signature);
    envelope.extend_from_slice(&iv);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Open an envelope addressed to the local node.
///
/// The signature is checked against the sender's directory entry; a sender
/// with no entry is handled per `policy`.
pub fn open(
    envelope: &[u8],
    sender: &AddressHash,
    local_key: &RsaPrivateKey,
    directory: &dyn Directory,
    policy: UnknownSenderPolicy,
) -> Result<OpenedMessage, EnvelopeError> {
    if envelope.len() < ENVELOPE_OVERHEAD + GCM_IV_LEN {
        return Err(EnvelopeError::BadFormat);
    }

    let (encrypted_key, rest) = envelope.split_at(RSA_BLOCK_LEN);
    let (signature, aes_blob) = rest.split_at(RSA_BLOCK_LEN);
    let (iv, ciphertext) = aes_blob.split_at(GCM_IV_LEN);

    let aes_key = local_key
        .decrypt(Pkcs1v15Encrypt, encrypted_key)
        .map_err(|_| EnvelopeError::KeyUnwrap)?;
    if aes_key.len() != AES_KEY_LEN {
        return Err(EnvelopeError::KeyUnwrap);
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&aes_key));
    let plaintext_bytes = cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| EnvelopeError::Cipher)?;
    let plaintext = String::from_utf8(plaintext_bytes).map_err(|_| EnvelopeError::BadFormat)?;

    let authenticated = match directory.resolve_public_key(sender) {
        Some(sender_key) => {
            let verifying_key = VerifyingKey::<Sha256>::new(sender_key);
            let signature =
                Signature::try_from(signature).map_err(|_| EnvelopeError::Forged)?;
            verifying_key
                .verify(plaintext.as_bytes(), &signature)
                .map_err(|_| EnvelopeError::Forged)?;
            true
        }
        None => match policy {
            UnknownSenderPolicy::AcceptUnauthenticated => {
                debug!(peer = %sender, "sender not in directory, accepting unauthenticated");
                false
            }
            UnknownSenderPolicy::RejectUnknown => return Err(EnvelopeError::NoKey),
        },
    };

    Ok(OpenedMessage {
        plaintext,
        authenticated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftmesh_identity::{KeyStore, MemoryDirectory, MemoryIdentity};
    use once_cell::sync::Lazy;

    // RSA keygen dominates test time; share one pair of identities.
    static ALICE: Lazy<MemoryIdentity> = Lazy::new(|| MemoryIdentity::generate().unwrap());
    static BOB: Lazy<MemoryIdentity> = Lazy::new(|| MemoryIdentity::generate().unwrap());

    fn directory_with(identities: &[&MemoryIdentity]) -> MemoryDirectory {
        let directory = MemoryDirectory::new();
        for identity in identities {
            directory.insert(identity.public_key());
        }
        directory
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let directory = directory_with(&[&ALICE]);
        let envelope = seal("hello mesh", &BOB.public_key(), ALICE.private_key()).unwrap();
        assert!(envelope.len() >= ENVELOPE_OVERHEAD + GCM_IV_LEN);

        let opened = open(
            &envelope,
            &ALICE.address_hash(),
            BOB.private_key(),
            &directory,
            UnknownSenderPolicy::default(),
        )
        .unwrap();
        assert_eq!(opened.plaintext, "hello mesh");
        assert!(opened.authenticated);
    }

    #[test]
    fn test_open_with_wrong_private_key_fails() {
        let directory = directory_with(&[&ALICE]);
        let envelope = seal("secret", &BOB.public_key(), ALICE.private_key()).unwrap();

        // Alice's key cannot unwrap a session key sealed for Bob.
        let result = open(
            &envelope,
            &ALICE.address_hash(),
            ALICE.private_key(),
            &directory,
            UnknownSenderPolicy::default(),
        );
        assert!(matches!(result, Err(EnvelopeError::KeyUnwrap)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let directory = directory_with(&[&ALICE]);
        let mut envelope = seal("secret", &BOB.public_key(), ALICE.private_key()).unwrap();

        let last = envelope.len() - 1;
        envelope[last] ^= 0x01;
        let result = open(
            &envelope,
            &ALICE.address_hash(),
            BOB.private_key(),
            &directory,
            UnknownSenderPolicy::default(),
        );
        assert!(matches!(result, Err(EnvelopeError::Cipher)));
    }

    #[test]
    fn test_tampered_signature_fails() {
        let directory = directory_with(&[&ALICE]);
        let mut envelope = seal("secret", &BOB.public_key(), ALICE.private_key()).unwrap();

        envelope[RSA_BLOCK_LEN] ^= 0x01;
        let result = open(
            &envelope,
            &ALICE.address_hash(),
            BOB.private_key(),
            &directory,
            UnknownSenderPolicy::default(),
        );
        assert!(matches!(result, Err(EnvelopeError::Forged)));
    }

    #[test]
    fn test_signature_binds_sender() {
        // Bob signs, but the packet claims Alice as source: Alice's
        // directory key must reject Bob's signature.
        let directory = directory_with(&[&ALICE, &BOB]);
        let envelope = seal("spoofed", &BOB.public_key(), BOB.private_key()).unwrap();

        let result = open(
            &envelope,
            &ALICE.address_hash(),
            BOB.private_key(),
            &directory,
            UnknownSenderPolicy::default(),
        );
        assert!(matches!(result, Err(EnvelopeError::Forged)));
    }

    #[test]
    fn test_unknown_sender_accepted_unauthenticated() {
        let directory = MemoryDirectory::new();
        let envelope = seal("who dis", &BOB.public_key(), ALICE.private_key()).unwrap();

        let opened = open(
            &envelope,
            &ALICE.address_hash(),
            BOB.private_key(),
            &directory,
            UnknownSenderPolicy::AcceptUnauthenticated,
        )
        .unwrap();
        assert_eq!(opened.plaintext, "who dis");
        assert!(!opened.authenticated);
    }

    #[test]
    fn test_unknown_sender_rejected_under_strict_policy() {
        let directory = MemoryDirectory::new();
        let envelope = seal("who dis", &BOB.public_key(), ALICE.private_key()).unwrap();

        let result = open(
            &envelope,
            &ALICE.address_hash(),
            BOB.private_key(),
            &directory,
            UnknownSenderPolicy::RejectUnknown,
        );
        assert!(matches!(result, Err(EnvelopeError::NoKey)));
    }

    #[test]
    fn test_short_envelope_rejected() {
        let directory = MemoryDirectory::new();
        let result = open(
            &[0u8; ENVELOPE_OVERHEAD - 1],
            &ALICE.address_hash(),
            BOB.private_key(),
            &directory,
            UnknownSenderPolicy::default(),
        );
        assert!(matches!(result, Err(EnvelopeError::BadFormat)));
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let directory = directory_with(&[&ALICE]);
        let envelope = seal("", &BOB.public_key(), ALICE.private_key()).unwrap();
        let opened = open(
            &envelope,
            &ALICE.address_hash(),
            BOB.private_key(),
            &directory,
            UnknownSenderPolicy::default(),
        )
        .unwrap();
        assert_eq!(opened.plaintext, "");
    }
}
