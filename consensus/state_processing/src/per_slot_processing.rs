use crate::per_epoch_processing::{process_epoch, EpochProcessingError};
use safe_arith::SafeArith;
use types::{BeaconState, BeaconStateError, ChainSpec, EthSpec, Slot};

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    SlotInPast { target_slot: Slot, state_slot: Slot },
    BeaconStateError(BeaconStateError),
    EpochProcessingError(EpochProcessingError),
}

impl From<BeaconStateError> for Error {
    fn from(e: BeaconStateError) -> Self {
        Error::BeaconStateError(e)
    }
}

impl From<EpochProcessingError> for Error {
    fn from(e: EpochProcessingError) -> Self {
        Error::EpochProcessingError(e)
    }
}

/// Advances `state` by exactly one slot: caches the outgoing slot's state root, rotates the
/// randao mix forward so empty slots still have a mix to seed from, and runs `process_epoch`
/// whenever the new slot crosses an epoch boundary.
pub fn per_slot_processing<T: EthSpec>(
    state: &mut BeaconState<T>,
    state_root: Option<types::Hash256>,
    spec: &ChainSpec,
) -> Result<(), Error> {
    cache_state(state, state_root)?;

    if state
        .slot()
        .safe_add(Slot::new(1))?
        .as_u64()
        .safe_rem(T::slots_per_epoch())?
        == 0
    {
        process_epoch(state, spec)?;
    }

    state.slot_mut().safe_add_assign(Slot::new(1))?;

    let next_epoch = state.current_epoch();
    let mix_index =
        next_epoch.as_u64() as usize % T::epochs_per_historical_vector();
    let previous_index = (mix_index + T::epochs_per_historical_vector() - 1)
        % T::epochs_per_historical_vector();
    let previous_mix = *state
        .randao_mixes()
        .get(previous_index)
        .ok_or(BeaconStateError::InsufficientRandaoMixes)?;
    *state
        .randao_mixes_mut()
        .get_mut(mix_index)
        .ok_or(BeaconStateError::InsufficientRandaoMixes)? = previous_mix;

    Ok(())
}

fn cache_state<T: EthSpec>(
    state: &mut BeaconState<T>,
    state_root: Option<types::Hash256>,
) -> Result<(), BeaconStateError> {
    let previous_state_root = match state_root {
        Some(root) => root,
        None => state.update_tree_hash_cache()?,
    };
    state.set_state_root(state.slot(), previous_state_root)?;

    if state.latest_block_header().state_root == types::Hash256::zero() {
        state.latest_block_header_mut().state_root = previous_state_root;
    }

    let previous_block_root = state.latest_block_header().canonical_root();
    state.set_block_root(state.slot(), previous_block_root)?;

    Ok(())
}

/// Advances `state` one slot at a time until it reaches `target_slot`. `SlotInPast` if
/// `target_slot <= state.slot()`, matching the specification's `process_slots`.
pub fn process_slots<T: EthSpec>(
    state: &mut BeaconState<T>,
    target_slot: Slot,
    spec: &ChainSpec,
) -> Result<(), Error> {
    if target_slot <= state.slot() {
        return Err(Error::SlotInPast {
            target_slot,
            state_slot: state.slot(),
        });
    }

    while state.slot() < target_slot {
        per_slot_processing(state, None, spec)?;
    }

    Ok(())
}
