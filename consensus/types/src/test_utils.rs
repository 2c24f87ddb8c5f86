use crate::*;
use bls::{Keypair, SecretKey};
use rand::{RngCore, SeedableRng};
use rand_xorshift::XorShiftRng;

pub use test_random_derive::TestRandom;

/// Produces an arbitrary value from an RNG, for building fuzz/round-trip test fixtures. Every
/// type that appears in SSZ-encoded messages implements this so tests can build full objects
/// without hand-filling every field.
pub trait TestRandom {
    fn random_for_test(rng: &mut impl RngCore) -> Self;
}

macro_rules! impl_test_random_for_int {
    ($ty: ty) => {
        impl TestRandom for $ty {
            fn random_for_test(rng: &mut impl RngCore) -> Self {
                let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                rng.fill_bytes(&mut bytes);
                <$ty>::from_le_bytes(bytes)
            }
        }
    };
}

impl_test_random_for_int!(u8);
impl_test_random_for_int!(u16);
impl_test_random_for_int!(u32);
impl_test_random_for_int!(u64);
impl_test_random_for_int!(usize);

impl TestRandom for [u8; 4] {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        let mut bytes = [0u8; 4];
        rng.fill_bytes(&mut bytes);
        bytes
    }
}

impl TestRandom for bool {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        rng.next_u32() % 2 == 0
    }
}

impl TestRandom for Hash256 {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Hash256::from_slice(&bytes)
    }
}

impl TestRandom for Slot {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        Slot::new(u64::random_for_test(rng))
    }
}

impl TestRandom for Epoch {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        Epoch::new(u64::random_for_test(rng))
    }
}

impl TestRandom for SyncCommitteePeriod {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        SyncCommitteePeriod::new(u64::random_for_test(rng))
    }
}

impl<T: TestRandom> TestRandom for Option<T> {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        Some(T::random_for_test(rng))
    }
}

impl<T: TestRandom> TestRandom for std::sync::Arc<T> {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        std::sync::Arc::new(T::random_for_test(rng))
    }
}

impl<T, N: typenum::Unsigned> TestRandom for ssz_types::FixedVector<T, N>
where
    T: TestRandom,
{
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        let values: Vec<T> = (0..N::to_usize()).map(|_| T::random_for_test(rng)).collect();
        Self::new(values).expect("vector of exactly N elements always fits")
    }
}

impl<T, N: typenum::Unsigned> TestRandom for ssz_types::VariableList<T, N>
where
    T: TestRandom,
{
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        let len = rng.next_u32() as usize % (N::to_usize().min(4) + 1);
        let values: Vec<T> = (0..len).map(|_| T::random_for_test(rng)).collect();
        Self::new(values).expect("len is bounded by N above")
    }
}

impl<N: typenum::Unsigned> TestRandom for ssz_types::BitVector<N> {
    fn random_for_test(_rng: &mut impl RngCore) -> Self {
        Self::default()
    }
}

impl<N: typenum::Unsigned> TestRandom for ssz_types::BitList<N> {
    fn random_for_test(_rng: &mut impl RngCore) -> Self {
        Self::with_capacity(N::to_usize()).expect("N is the list's own maximum capacity")
    }
}

impl TestRandom for bls::PublicKeyBytes {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        let secret = SecretKey::random_for_test(rng);
        bls::PublicKeyBytes::from(&secret.public_key())
    }
}

impl TestRandom for SecretKey {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        let mut ikm = [0u8; 32];
        rng.fill_bytes(&mut ikm);
        SecretKey::key_gen(&ikm).expect("32 bytes is sufficient key material")
    }
}

impl TestRandom for bls::Signature {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        let secret = SecretKey::random_for_test(rng);
        secret.sign(b"test_random")
    }
}

impl TestRandom for bls::AggregateSignature {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        let mut agg = bls::AggregateSignature::infinity();
        agg.add_assign(&bls::Signature::random_for_test(rng));
        agg
    }
}

impl TestRandom for bls::SignatureBytes {
    fn random_for_test(rng: &mut impl RngCore) -> Self {
        bls::SignatureBytes::from(&bls::Signature::random_for_test(rng))
    }
}

/// Deterministic, reproducible keypairs for test fixtures that need a fixed validator set (the
/// same seed always yields the same keys, so fixtures can be compared across test runs).
pub fn generate_deterministic_keypair(index: usize) -> Keypair {
    let mut preimage = [0u8; 32];
    preimage[..8].copy_from_slice(&(index as u64).to_le_bytes());
    let ikm = eth2_hashing::hash(&preimage);
    let secret = SecretKey::key_gen(&ikm).expect("hash digest is sufficient key material");
    Keypair::from(secret)
}

pub fn generate_deterministic_keypairs(count: usize) -> Vec<Keypair> {
    (0..count).map(generate_deterministic_keypair).collect()
}

pub fn test_random_instance<T: TestRandom>(seed: u64) -> T {
    let mut rng = XorShiftRng::seed_from_u64(seed);
    T::random_for_test(&mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_keypairs_are_reproducible() {
        let a = generate_deterministic_keypair(3);
        let b = generate_deterministic_keypair(3);
        assert_eq!(a.pk, b.pk);
    }

    #[test]
    fn deterministic_keypairs_differ_by_index() {
        let a = generate_deterministic_keypair(1);
        let b = generate_deterministic_keypair(2);
        assert_ne!(a.pk, b.pk);
    }
}
