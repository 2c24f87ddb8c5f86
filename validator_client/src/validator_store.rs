//! Holds the local validator keys and is the only thing in this crate allowed to produce a
//! signature. Every signing path checks [`slashing_protection::SlashingDatabase`] and commits the
//! new high-water-mark *before* calling into `bls` (spec.md §4.11: "written before the signature
//! is emitted").

use bls::{Keypair, PublicKeyBytes, SecretKey, Signature};
use parking_lot::RwLock;
use slashing_protection::{SignedBlock as SlashingBlock, SlashingDatabase};
use std::collections::HashMap;
use std::path::Path;
use tree_hash::TreeHash;
use types::{
    AttestationData, BeaconBlock, ChainSpec, Domain, Epoch, EthSpec, Fork, GenesisValidatorsRoot,
    Hash256, SignedBeaconBlock, SignedRoot,
};

/// `SigningData { object_root, domain }.tree_hash_root()`, for objects (like a bare block root)
/// that don't themselves implement [`SignedRoot`].
fn signing_root_of_hash(object_root: Hash256, domain: Hash256) -> Hash256 {
    #[derive(tree_hash_derive::TreeHash)]
    struct SigningData {
        object_root: Hash256,
        domain: Hash256,
    }
    SigningData { object_root, domain }.tree_hash_root()
}

fn fork_version_at(fork: &Fork, epoch: Epoch) -> [u8; 4] {
    if epoch < fork.epoch {
        fork.previous_version
    } else {
        fork.current_version
    }
}

#[derive(Debug)]
pub enum Error {
    SlashingProtection(slashing_protection::Error),
    UnknownValidator(usize),
}

impl From<slashing_protection::Error> for Error {
    fn from(e: slashing_protection::Error) -> Self {
        Error::SlashingProtection(e)
    }
}

struct LocalValidator {
    keypair: Keypair,
}

/// Every locally-controlled key, indexed by its validator registry index, plus the slashing
/// protection store shared across all of them.
pub struct ValidatorStore {
    validators: RwLock<HashMap<usize, LocalValidator>>,
    slashing_protection: SlashingDatabase,
    spec: ChainSpec,
    genesis_validators_root: GenesisValidatorsRoot,
}

impl ValidatorStore {
    pub fn new(
        slashing_db_path: &Path,
        spec: ChainSpec,
        genesis_validators_root: GenesisValidatorsRoot,
    ) -> Result<Self, Error> {
        let slashing_protection = if slashing_db_path.exists() {
            SlashingDatabase::open(slashing_db_path)
        } else {
            SlashingDatabase::create(slashing_db_path)
        }?;
        Ok(Self {
            validators: RwLock::new(HashMap::new()),
            slashing_protection,
            spec,
            genesis_validators_root,
        })
    }

    /// Registers a local key under `validator_index`, recording it with the slashing-protection
    /// store if it hasn't signed through this store before.
    pub fn add_validator(&self, validator_index: usize, keypair: Keypair) -> Result<(), Error> {
        let pubkey_bytes = PublicKeyBytes::from(&keypair.pk);
        self.slashing_protection.register_validator(&pubkey_bytes)?;
        self.validators
            .write()
            .insert(validator_index, LocalValidator { keypair });
        Ok(())
    }

    pub fn num_validators(&self) -> usize {
        self.validators.read().len()
    }

    pub fn validator_indices(&self) -> Vec<usize> {
        self.validators.read().keys().copied().collect()
    }

    fn secret_key(&self, validator_index: usize) -> Result<SecretKey, Error> {
        self.validators
            .read()
            .get(&validator_index)
            .map(|v| v.keypair.sk.clone())
            .ok_or(Error::UnknownValidator(validator_index))
    }

    fn pubkey_bytes(&self, validator_index: usize) -> Result<PublicKeyBytes, Error> {
        self.validators
            .read()
            .get(&validator_index)
            .map(|v| PublicKeyBytes::from(&v.keypair.pk))
            .ok_or(Error::UnknownValidator(validator_index))
    }

    fn domain(&self, domain: Domain, epoch: Epoch, fork: &Fork) -> Hash256 {
        let fork_version = fork_version_at(fork, epoch);
        self.spec
            .compute_domain(domain, fork_version, self.genesis_validators_root)
    }

    pub fn randao_reveal(&self, validator_index: usize, epoch: Epoch, fork: &Fork) -> Result<Signature, Error> {
        let domain = self.domain(Domain::Randao, epoch, fork);
        let sk = self.secret_key(validator_index)?;
        Ok(sk.sign(epoch.signing_root(domain).as_bytes()))
    }

    /// Checks slashing protection, commits the new high-water-mark, and only then signs. Returns
    /// the `AggregateSignature`-bearing `Attestation` that an attestation pool insert expects.
    pub fn sign_attestation<E: EthSpec>(
        &self,
        validator_index: usize,
        committee_position: usize,
        committee_len: usize,
        data: AttestationData,
        fork: &Fork,
    ) -> Result<types::Attestation<E>, Error> {
        let pubkey_bytes = self.pubkey_bytes(validator_index)?;
        self.slashing_protection
            .check_and_insert_attestation(&pubkey_bytes, &data)?;

        let domain = self.domain(Domain::BeaconAttester, data.target.epoch, fork);
        let sk = self.secret_key(validator_index)?;
        let signature = sk.sign(data.signing_root(domain).as_bytes());

        let mut aggregation_bits = types::BitList::with_capacity(committee_len)
            .map_err(|_| Error::UnknownValidator(validator_index))?;
        aggregation_bits
            .set(committee_position, true)
            .map_err(|_| Error::UnknownValidator(validator_index))?;

        let mut aggregate_signature = bls::AggregateSignature::infinity();
        aggregate_signature.add_assign(&signature);

        Ok(types::Attestation {
            aggregation_bits,
            data,
            signature: aggregate_signature,
        })
    }

    /// Checks slashing protection, commits the new high-water-mark, and only then signs the
    /// block, returning it wrapped ready for `BeaconChain::process_block`.
    pub fn sign_block<E: EthSpec>(
        &self,
        validator_index: usize,
        block: BeaconBlock<E>,
        fork: &Fork,
    ) -> Result<SignedBeaconBlock<E>, Error> {
        let pubkey_bytes = self.pubkey_bytes(validator_index)?;
        self.slashing_protection.check_and_insert_block_proposal(
            &pubkey_bytes,
            &SlashingBlock::new(block.slot()),
        )?;

        let domain = self.domain(Domain::BeaconProposer, block.slot().epoch(E::slots_per_epoch()), fork);
        let sk = self.secret_key(validator_index)?;
        let signature = sk.sign(block.signing_root(domain).as_bytes());

        Ok(SignedBeaconBlock {
            message: block,
            signature,
        })
    }

    /// Signs a sync-committee message over `beacon_block_root`. Sync-committee signatures are not
    /// subject to slashing protection (spec.md §4.11 only protects proposals and attestations).
    pub fn sign_sync_committee_message(
        &self,
        validator_index: usize,
        epoch: Epoch,
        beacon_block_root: Hash256,
        fork: &Fork,
    ) -> Result<Signature, Error> {
        let domain = self.domain(Domain::SyncCommittee, epoch, fork);
        let sk = self.secret_key(validator_index)?;
        let root = signing_root_of_hash(beacon_block_root, domain);
        Ok(sk.sign(root.as_bytes()))
    }
}
