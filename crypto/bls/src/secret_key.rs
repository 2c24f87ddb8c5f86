use crate::{Error, PublicKey, Signature};
use blst::min_pk as blst_core;

const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

#[derive(Clone)]
pub struct SecretKey(blst_core::SecretKey);

impl SecretKey {
    /// Derives a secret key from 32+ bytes of key material, as used by deterministic
    /// interop/testnet keypair generation.
    pub fn key_gen(ikm: &[u8]) -> Result<Self, Error> {
        blst_core::SecretKey::key_gen(ikm, &[])
            .map(Self)
            .map_err(|_| Error::InvalidSecretKeyBytes)
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_raw(self.0.sk_to_pk())
    }

    pub fn sign(&self, msg: &[u8]) -> Signature {
        Signature::from_raw(self.0.sign(msg, DST, &[]))
    }

    pub fn serialize(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        blst_core::SecretKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| Error::InvalidSecretKeyBytes)
    }
}
