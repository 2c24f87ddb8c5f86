//! Altair epoch processing: rewards/penalties weighted by `ParticipationFlags` rather than
//! `PendingAttestation`s, plus the `inactivity_scores` leak mechanism.

mod participation_cache;

pub use participation_cache::ParticipationCache;

use super::justification_and_finalization::weigh_justification_and_finalization;
use super::registry_updates::process_registry_updates;
use super::{process_final_updates, process_slashings, EpochProcessingError, EpochProcessingSummary};
use crate::common::{decrease_balance, increase_balance};
use safe_arith::SafeArith;
use types::consts::altair::{
    NUM_FLAG_INDICES, PROPOSER_WEIGHT, TIMELY_HEAD_FLAG_INDEX, TIMELY_HEAD_WEIGHT,
    TIMELY_SOURCE_FLAG_INDEX, TIMELY_SOURCE_WEIGHT, TIMELY_TARGET_FLAG_INDEX,
    TIMELY_TARGET_WEIGHT, WEIGHT_DENOMINATOR,
};
use types::{BeaconState, ChainSpec, EthSpec, ParticipationFlags};

const FLAG_INDICES_AND_WEIGHTS: [(usize, u64); 3] = [
    (TIMELY_SOURCE_FLAG_INDEX, TIMELY_SOURCE_WEIGHT),
    (TIMELY_TARGET_FLAG_INDEX, TIMELY_TARGET_WEIGHT),
    (TIMELY_HEAD_FLAG_INDEX, TIMELY_HEAD_WEIGHT),
];

fn base_reward<T: EthSpec>(
    state: &BeaconState<T>,
    val_index: usize,
    total_active_balance_sqrt: u64,
    spec: &ChainSpec,
) -> Result<u64, EpochProcessingError> {
    let effective_balance = state.get_effective_balance(val_index)?;
    Ok(effective_balance
        .safe_mul(spec.base_reward_factor)?
        .safe_div(total_active_balance_sqrt)?)
}

/// Equivalent to the specification `get_flag_index_deltas` / `process_rewards_and_penalties`
/// functions, combined into a single pass over the eligible validator set.
fn process_rewards_and_penalties<T: EthSpec>(
    state: &mut BeaconState<T>,
    participation_cache: &ParticipationCache,
    spec: &ChainSpec,
) -> Result<(), EpochProcessingError> {
    if state.current_epoch() == T::genesis_epoch() {
        return Ok(());
    }

    let total_active_balance = participation_cache.current_epoch_total_active_balance();
    let total_active_balance_sqrt = integer_sqrt(total_active_balance.max(1));
    let previous_epoch = state.previous_epoch();

    for &index in participation_cache.eligible_validator_indices() {
        let base_reward = base_reward(state, index, total_active_balance_sqrt, spec)?;

        for &(flag_index, weight) in FLAG_INDICES_AND_WEIGHTS.iter() {
            let unslashed_participating_indices = participation_cache
                .get_unslashed_participating_indices(flag_index, previous_epoch)?;
            let unslashed_participating_balance = unslashed_participating_indices.total_balance()?;
            let unslashed_participating_increments =
                unslashed_participating_balance.safe_div(spec.effective_balance_increment)?;
            let active_increments =
                total_active_balance.safe_div(spec.effective_balance_increment)?;

            if unslashed_participating_indices.contains(index)? {
                if !state.is_in_inactivity_leak(previous_epoch, spec) {
                    let reward_numerator = base_reward
                        .safe_mul(weight)?
                        .safe_mul(unslashed_participating_increments)?;
                    let reward = reward_numerator
                        .safe_div(active_increments)?
                        .safe_div(WEIGHT_DENOMINATOR)?;
                    increase_balance(state, index, reward)?;
                }
            } else if flag_index != TIMELY_HEAD_FLAG_INDEX {
                let penalty = base_reward
                    .safe_mul(weight)?
                    .safe_div(WEIGHT_DENOMINATOR)?;
                decrease_balance(state, index, penalty)?;
            }
        }
    }

    Ok(())
}

/// Equivalent to the specification `process_inactivity_updates` function.
fn process_inactivity_updates<T: EthSpec>(
    state: &mut BeaconState<T>,
    participation_cache: &ParticipationCache,
    spec: &ChainSpec,
) -> Result<(), EpochProcessingError> {
    if state.current_epoch() == T::genesis_epoch() {
        return Ok(());
    }

    let previous_epoch = state.previous_epoch();
    let in_leak = state.is_in_inactivity_leak(previous_epoch, spec);

    for &index in participation_cache.eligible_validator_indices() {
        let target_indices =
            participation_cache.get_unslashed_participating_indices(TIMELY_TARGET_FLAG_INDEX, previous_epoch)?;

        let score = state.get_inactivity_score(index)?;
        let new_score = if target_indices.contains(index)? {
            score.saturating_sub(1)
        } else {
            score.safe_add(spec.inactivity_score_bias)?
        };
        let new_score = if in_leak {
            new_score
        } else {
            new_score.saturating_sub(spec.inactivity_score_recovery_rate)
        };
        state.set_inactivity_score(index, new_score)?;
    }

    Ok(())
}

/// Rotates the current epoch's `ParticipationFlags` list back to `previous_epoch_participation`
/// and resets `current_epoch_participation` to its default (unset) value.
fn process_participation_flag_updates<T: EthSpec>(
    state: &mut BeaconState<T>,
) -> Result<(), EpochProcessingError> {
    let current = state.current_epoch_participation()?.clone();
    *state.previous_epoch_participation_mut()? = current;
    *state.current_epoch_participation_mut()? = types::VariableList::new(vec![
        ParticipationFlags::default();
        state.validators().len()
    ])
    .map_err(|_| types::BeaconStateError::ParticipationOutOfBounds(state.validators().len()))?;

    Ok(())
}

pub fn process_epoch<T: EthSpec>(
    state: &mut BeaconState<T>,
    spec: &ChainSpec,
) -> Result<EpochProcessingSummary, EpochProcessingError> {
    let participation_cache = ParticipationCache::new(state, spec)?;

    weigh_justification_and_finalization(
        state,
        participation_cache.current_epoch_total_active_balance(),
        participation_cache.previous_epoch_target_attesting_balance()?,
        participation_cache
            .get_unslashed_participating_indices(TIMELY_TARGET_FLAG_INDEX, state.current_epoch())?
            .total_balance()?,
    )?;

    process_inactivity_updates(state, &participation_cache, spec)?;
    process_rewards_and_penalties(state, &participation_cache, spec)?;
    process_registry_updates(state, spec)?;
    process_slashings(
        state,
        participation_cache.current_epoch_total_active_balance(),
        spec,
    )?;
    process_final_updates(state, spec)?;
    process_participation_flag_updates(state)?;

    Ok(EpochProcessingSummary::Altair {
        participation_cache,
    })
}

fn integer_sqrt(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}
