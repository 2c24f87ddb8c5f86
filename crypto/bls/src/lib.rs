//! Thin wrapper around `blst` exposing the handful of BLS12-381 operations the
//! consensus layer needs: keypair generation, signing, single and aggregate
//! verification.
//!
//! The state-transition function and the wire protocol only ever touch BLS
//! objects through this crate's types — nobody outside of here is allowed to
//! see a `blst` type directly. This keeps the crypto primitive swappable
//! (the real Lighthouse ships both a `blst` and a `milagro` backend behind
//! this same surface).

mod keypair;
mod public_key;
mod public_key_bytes;
mod secret_key;
mod signature;
mod signature_bytes;

pub use keypair::Keypair;
pub use public_key::PublicKey;
pub use public_key_bytes::PublicKeyBytes;
pub use secret_key::SecretKey;
pub use signature::{AggregateSignature, Signature};
pub use signature_bytes::SignatureBytes;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    InvalidByteLength { got: usize, expected: usize },
    InvalidSecretKeyBytes,
    InvalidPublicKeyBytes,
    InvalidSignatureBytes,
    EmptyAggregate,
}
