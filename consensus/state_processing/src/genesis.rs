//! Builds the initial `BeaconState` from a list of deposits (the specification's
//! `initialize_beacon_state_from_eth1`), the one state-transition entry point that doesn't start
//! from an existing state. Only ever runs once per chain, at startup, so it favours fidelity to
//! the per-deposit verification path (`process_deposit`) over the speed a repeated call would need.

use crate::per_block_processing::{process_deposit, BlockProcessingError};
use merkle_proof::MerkleTree;
use tree_hash::TreeHash;
use types::{
    BeaconBlockHeader, BeaconState, BeaconStateBase, BitVector, Checkpoint, ChainSpec,
    CommitteeCache, Deposit, Epoch, Eth1Data, EthSpec, ExitCache, FixedVector, Fork, Hash256,
    PubkeyCache, Slot, VariableList,
};

/// Depth of the eth1 deposit contract's incremental Merkle tree (32 levels of real data, plus one
/// more level mixing in the deposit count — see `process_deposit`'s `DEPOSIT_CONTRACT_TREE_DEPTH
/// + 1`).
pub const DEPOSIT_CONTRACT_TREE_DEPTH: usize = 32;

#[derive(Debug, PartialEq, Clone)]
pub enum GenesisError {
    BlockProcessing(BlockProcessingError),
}

impl From<BlockProcessingError> for GenesisError {
    fn from(e: BlockProcessingError) -> Self {
        GenesisError::BlockProcessing(e)
    }
}

/// Applies `deposits` to a freshly-allocated, empty state, one at a time, exactly the way the
/// specification's genesis procedure does: before each deposit is processed, `eth1_data` is
/// advanced to the deposit-contract root it would have had at the moment that deposit arrived,
/// so `process_deposit`'s own Merkle check (run unmodified, not bypassed) verifies it correctly.
///
/// `genesis_time` is left at `eth1_timestamp`; callers building an interop/dev genesis
/// conventionally overwrite it afterwards with whatever wall-clock time they want the chain to
/// start at.
pub fn initialize_beacon_state_from_eth1<T: EthSpec>(
    eth1_block_hash: Hash256,
    eth1_timestamp: u64,
    deposits: Vec<Deposit>,
    spec: &ChainSpec,
) -> Result<BeaconState<T>, GenesisError> {
    let mut state = empty_state::<T>(eth1_block_hash, eth1_timestamp, spec);

    let leaves: Vec<Hash256> = deposits
        .iter()
        .map(|deposit| deposit.data.tree_hash_root())
        .collect();

    for (i, deposit) in deposits.iter().enumerate() {
        let tree = MerkleTree::create(&leaves[..=i], DEPOSIT_CONTRACT_TREE_DEPTH);
        let deposit_count = (i + 1) as u64;

        *state.eth1_data_mut() = Eth1Data {
            deposit_root: mix_in_length(tree.root(), deposit_count),
            deposit_count,
            block_hash: eth1_block_hash,
        };

        process_deposit(&mut state, deposit, spec)?;
    }

    activate_genesis_validators(&mut state, spec);

    Ok(state)
}

/// The specification activates any validator deposited with a full effective balance immediately,
/// rather than queueing it through the normal epoch-by-epoch activation churn — there's no
/// meaningful queue to rate-limit at a chain's very first slot.
fn activate_genesis_validators<T: EthSpec>(state: &mut BeaconState<T>, spec: &ChainSpec) {
    let genesis_epoch = T::genesis_epoch();
    for validator in state.validators_mut().iter_mut() {
        if validator.effective_balance >= spec.max_effective_balance {
            validator.activation_eligibility_epoch = genesis_epoch;
            validator.activation_epoch = genesis_epoch;
        }
    }
}

fn mix_in_length(root: Hash256, count: u64) -> Hash256 {
    let mut preimage = Vec::with_capacity(64);
    preimage.extend_from_slice(root.as_bytes());
    preimage.extend_from_slice(&int_to_bytes32(count));
    Hash256::from_slice(&eth2_hashing::hash(&preimage))
}

fn int_to_bytes32(int: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[..8].copy_from_slice(&int.to_le_bytes());
    out
}

fn empty_state<T: EthSpec>(
    eth1_block_hash: Hash256,
    eth1_timestamp: u64,
    spec: &ChainSpec,
) -> BeaconState<T> {
    BeaconState::Base(BeaconStateBase {
        genesis_time: eth1_timestamp,
        genesis_validators_root: Hash256::zero(),
        slot: Slot::new(0),
        fork: Fork {
            previous_version: spec.genesis_fork_version,
            current_version: spec.genesis_fork_version,
            epoch: Epoch::new(0),
        },
        latest_block_header: BeaconBlockHeader {
            slot: Slot::new(0),
            proposer_index: 0,
            parent_root: Hash256::zero(),
            state_root: Hash256::zero(),
            body_root: Hash256::zero(),
        },
        block_roots: FixedVector::from(vec![Hash256::zero(); T::slots_per_historical_root()]),
        state_roots: FixedVector::from(vec![Hash256::zero(); T::slots_per_historical_root()]),
        historical_roots: VariableList::empty(),
        eth1_data: Eth1Data {
            deposit_root: Hash256::zero(),
            deposit_count: 0,
            block_hash: eth1_block_hash,
        },
        eth1_data_votes: VariableList::empty(),
        eth1_deposit_index: 0,
        validators: VariableList::empty(),
        balances: VariableList::empty(),
        randao_mixes: FixedVector::from(vec![Hash256::zero(); T::epochs_per_historical_vector()]),
        slashings: FixedVector::from(vec![0; T::epochs_per_slashings_vector()]),
        previous_epoch_attestations: VariableList::empty(),
        current_epoch_attestations: VariableList::empty(),
        justification_bits: BitVector::default(),
        previous_justified_checkpoint: Checkpoint::new(Epoch::new(0), Hash256::zero()),
        current_justified_checkpoint: Checkpoint::new(Epoch::new(0), Hash256::zero()),
        finalized_checkpoint: Checkpoint::new(Epoch::new(0), Hash256::zero()),
        committee_caches: [
            CommitteeCache::default(),
            CommitteeCache::default(),
            CommitteeCache::default(),
        ],
        pubkey_cache: PubkeyCache::default(),
        exit_cache: ExitCache::default(),
        tree_hash_cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{test_utils::generate_deterministic_keypairs, Domain, DepositData, MinimalEthSpec, SignedRoot};

    /// Mirrors the interop genesis builder's own deposit-proof construction: each deposit's proof
    /// is generated against the tree containing exactly the deposits up to and including it, with
    /// the deposit count mixed in as the final branch element (see `mix_in_length`).
    fn build_deposits(count: usize, spec: &ChainSpec) -> Vec<Deposit> {
        let keypairs = generate_deterministic_keypairs(count);
        let domain = spec.compute_domain(Domain::Deposit, spec.genesis_fork_version, Hash256::zero());

        let datas: Vec<DepositData> = keypairs
            .iter()
            .map(|kp| {
                let mut data = DepositData {
                    pubkey: bls::PublicKeyBytes::from(&kp.pk),
                    withdrawal_credentials: Hash256::zero(),
                    amount: spec.max_effective_balance,
                    signature: bls::SignatureBytes::from(&bls::Signature::empty()),
                };
                let sig = kp.sk.sign(data.signing_root(domain).as_bytes());
                data.signature = bls::SignatureBytes::from(&sig);
                data
            })
            .collect();

        let leaves: Vec<Hash256> = datas.iter().map(|d| d.tree_hash_root()).collect();

        datas
            .into_iter()
            .enumerate()
            .map(|(i, data)| {
                let tree = MerkleTree::create(&leaves[..=i], DEPOSIT_CONTRACT_TREE_DEPTH);
                let (_, mut proof) = tree.generate_proof(i, DEPOSIT_CONTRACT_TREE_DEPTH);
                proof.push(Hash256::from_slice(&int_to_bytes32((i + 1) as u64)));
                Deposit {
                    proof: FixedVector::from(proof),
                    data,
                }
            })
            .collect()
    }

    #[test]
    fn genesis_state_activates_every_validator() {
        let spec = MinimalEthSpec::default_spec();
        let deposits = build_deposits(8, &spec);

        let state = initialize_beacon_state_from_eth1::<MinimalEthSpec>(
            Hash256::repeat_byte(0x42),
            1_600_000_000,
            deposits,
            &spec,
        )
        .expect("genesis state should build");

        assert_eq!(state.validators().len(), 8);
        assert_eq!(state.eth1_data().deposit_count, 8);
        for validator in state.validators() {
            assert_eq!(validator.activation_epoch, Epoch::new(0));
        }
    }

    #[test]
    fn rejects_a_deposit_with_a_bad_proof() {
        let spec = MinimalEthSpec::default_spec();
        let mut deposits = build_deposits(2, &spec);
        deposits[0].proof[0] = Hash256::repeat_byte(0xaa);

        let result = initialize_beacon_state_from_eth1::<MinimalEthSpec>(
            Hash256::repeat_byte(0x42),
            1_600_000_000,
            deposits,
            &spec,
        );
        assert!(matches!(
            result,
            Err(GenesisError::BlockProcessing(BlockProcessingError::DepositInvalid))
        ));
    }
}
