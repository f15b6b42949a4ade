//! Crypto envelope error types.

use thiserror::Error;

/// Envelope sealing/opening errors
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// No public key is known for the peer
    #[error("no public key known for destination")]
    NoKey,

    /// Envelope too short or not valid UTF-8 after decryption
    #[error("malformed envelope")]
    BadFormat,

    /// RSA encryption of the session key failed
    #[error("session key wrap failed: {0}")]
    KeyWrap(rsa::Error),

    /// RSA decryption of the session key failed (wrong recipient key)
    #[error("session key unwrap failed")]
    KeyUnwrap,

    /// AES-GCM rejected the ciphertext (tampered or wrong key)
    #[error("ciphertext authentication failed")]
    Cipher,

    /// Signature did not verify against the sender's known key
    #[error("signature verification failed")]
    Forged,

    /// Signing the plaintext failed
    #[error("signing failed: {0}")]
    Signing(rsa::signature::Error),
}
