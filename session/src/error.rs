//! Application-facing send errors.

use thiserror::Error;

use driftmesh_crypto::EnvelopeError;

/// Failure to hand a message to the mesh.
///
/// This is the only failure the engine surfaces to the application; link
/// and relay problems degrade silently per the transport's drop-and-continue
/// model.
#[derive(Error, Debug)]
pub enum SendError {
    /// No public key is known for the destination.
    #[error("no key known for destination")]
    NoKey,

    /// Sealing the envelope failed.
    #[error("encryption failed: {0}")]
    Seal(#[from] EnvelopeError),
}
