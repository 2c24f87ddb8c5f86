use crate::{PublicKey, SecretKey};

#[derive(Clone)]
pub struct Keypair {
    pub sk: SecretKey,
    pub pk: PublicKey,
}

impl Keypair {
    pub fn from_components(sk: SecretKey, pk: PublicKey) -> Self {
        Self { sk, pk }
    }
}

impl From<SecretKey> for Keypair {
    fn from(sk: SecretKey) -> Self {
        let pk = sk.public_key();
        Self { sk, pk }
    }
}
