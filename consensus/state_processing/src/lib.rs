//! Pure state-transition functions for the beacon chain (§4.3): everything here is a function of
//! `(state, input, spec) -> Result<..>` with no I/O and no knowledge of fork choice, the network,
//! or storage. `beacon_chain` is the only caller that matters; this crate exists so its core
//! transition logic can be fuzzed and unit-tested in isolation from all of that.

pub mod common;
pub mod genesis;
pub mod per_block_processing;
pub mod per_epoch_processing;
pub mod per_slot_processing;

pub use genesis::{initialize_beacon_state_from_eth1, GenesisError};
pub use per_block_processing::{per_block_processing, BlockProcessingError, VerifySignatures};
pub use per_epoch_processing::{process_epoch, EpochProcessingError, EpochProcessingSummary};
pub use per_slot_processing::{per_slot_processing, process_slots};

use types::{BeaconState, ChainSpec, EthSpec, SignedBeaconBlock};

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    PerSlotProcessing(per_slot_processing::Error),
    PerBlockProcessing(BlockProcessingError),
    StateSlotAfterBlockSlot {
        state_slot: types::Slot,
        block_slot: types::Slot,
    },
}

impl From<per_slot_processing::Error> for Error {
    fn from(e: per_slot_processing::Error) -> Self {
        Error::PerSlotProcessing(e)
    }
}

impl From<BlockProcessingError> for Error {
    fn from(e: BlockProcessingError) -> Self {
        Error::PerBlockProcessing(e)
    }
}

/// Equivalent to the specification `state_transition` function: advances `state` to
/// `signed_block`'s slot (running any epoch transitions along the way), then applies the block
/// itself. Does not check `signed_block`'s root against any external expectation; the caller
/// (typically `beacon_chain`, per §4.3) is responsible for that and for choosing which parts of
/// `VerifySignatures` are still necessary given signatures it has already checked.
pub fn state_transition<T: EthSpec>(
    state: &mut BeaconState<T>,
    signed_block: &SignedBeaconBlock<T>,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), Error> {
    let block_slot = signed_block.message.slot();
    if state.slot() > block_slot {
        return Err(Error::StateSlotAfterBlockSlot {
            state_slot: state.slot(),
            block_slot,
        });
    }

    if state.slot() < block_slot {
        process_slots(state, block_slot, spec)?;
    }

    per_block_processing(state, signed_block, verify_signatures, spec)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::test_utils::generate_deterministic_keypairs;
    use types::*;

    fn build_state<T: EthSpec>(validator_count: usize) -> BeaconState<T> {
        let spec = T::default_spec();
        let kp = generate_deterministic_keypairs(validator_count);

        let mut validators = Vec::with_capacity(validator_count);
        let mut balances = Vec::with_capacity(validator_count);
        for keypair in &kp {
            let pubkey = PublicKeyBytes::from(&keypair.pk);
            let mut validator =
                Validator::from_deposit(pubkey, Hash256::zero(), spec.max_effective_balance, &spec);
            validator.activation_eligibility_epoch = Epoch::new(0);
            validator.activation_epoch = Epoch::new(0);
            validators.push(validator);
            balances.push(spec.max_effective_balance);
        }

        BeaconState::Base(BeaconStateBase {
            genesis_time: 0,
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
                block_hash: Hash256::zero(),
            },
            eth1_data_votes: VariableList::empty(),
            eth1_deposit_index: 0,
            validators: VariableList::new(validators).expect("fits registry limit"),
            balances: VariableList::new(balances).expect("fits registry limit"),
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

    #[test]
    fn state_transition_rejects_block_behind_state() {
        let spec = MinimalEthSpec::default_spec();
        let mut state = build_state::<MinimalEthSpec>(16);
        *state.slot_mut() = Slot::new(5);

        let mut block = BeaconBlock::empty(&spec);
        *block.slot_mut() = Slot::new(1);
        let signed_block = SignedBeaconBlock {
            message: block,
            signature: bls::Signature::empty(),
        };

        let result = state_transition(&mut state, &signed_block, VerifySignatures::False, &spec);
        assert!(matches!(result, Err(Error::StateSlotAfterBlockSlot { .. })));
    }
}
