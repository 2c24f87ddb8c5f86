//! Small state mutations shared by per-slot, per-block and per-epoch processing: balance
//! updates, exit initiation and slashing. Kept as free functions rather than `BeaconState`
//! methods so they stay in one place regardless of which caller needs them.

use safe_arith::SafeArith;
use types::{BeaconState, BeaconStateError, ChainSpec, Epoch, EthSpec, RelativeEpoch};

pub fn increase_balance<T: EthSpec>(
    state: &mut BeaconState<T>,
    index: usize,
    delta: u64,
) -> Result<(), BeaconStateError> {
    let balance = state
        .balances_mut()
        .get_mut(index)
        .ok_or(BeaconStateError::UnknownValidator(index))?;
    balance.safe_add_assign(delta)?;
    Ok(())
}

pub fn decrease_balance<T: EthSpec>(
    state: &mut BeaconState<T>,
    index: usize,
    delta: u64,
) -> Result<(), BeaconStateError> {
    let balance = state
        .balances_mut()
        .get_mut(index)
        .ok_or(BeaconStateError::UnknownValidator(index))?;
    *balance = balance.saturating_sub(delta);
    Ok(())
}

/// Equivalent to the specification `initiate_validator_exit` function: a no-op if the validator
/// has already initiated exit, otherwise assigns `exit_epoch`/`withdrawable_epoch` according to
/// the current exit-queue churn.
pub fn initiate_validator_exit<T: EthSpec>(
    state: &mut BeaconState<T>,
    index: usize,
    spec: &ChainSpec,
) -> Result<(), BeaconStateError> {
    if state.get_validator(index)?.exit_epoch != Epoch::far_future() {
        return Ok(());
    }

    let current_epoch = state.current_epoch();
    let active_validator_count = state
        .get_cached_active_validator_indices(RelativeEpoch::Current)?
        .len() as u64;
    let churn_limit = std::cmp::max(
        spec.min_per_epoch_churn_limit,
        active_validator_count.safe_div(spec.churn_limit_quotient)?,
    );
    let exit_queue_epoch =
        state
            .exit_cache_mut()
            .exit_epoch_for_churn(current_epoch, churn_limit, spec);
    let withdrawable_epoch = exit_queue_epoch.safe_add(spec.min_validator_withdrawability_delay)?;

    let validator = state
        .validators_mut()
        .get_mut(index)
        .ok_or(BeaconStateError::UnknownValidator(index))?;
    validator.exit_epoch = exit_queue_epoch;
    validator.withdrawable_epoch = withdrawable_epoch;
    Ok(())
}

/// Equivalent to the specification `slash_validator` function: marks the validator slashed,
/// initiates its exit, applies the initial slashing penalty, moves its effective balance into
/// the current epoch's `slashings` accumulator, and rewards the whistleblower/proposer.
pub fn slash_validator<T: EthSpec>(
    state: &mut BeaconState<T>,
    slashed_index: usize,
    whistleblower_index: Option<usize>,
    spec: &ChainSpec,
) -> Result<(), BeaconStateError> {
    let epoch = state.current_epoch();
    initiate_validator_exit(state, slashed_index, spec)?;

    let validator = state
        .validators_mut()
        .get_mut(slashed_index)
        .ok_or(BeaconStateError::UnknownValidator(slashed_index))?;
    validator.slashed = true;
    validator.withdrawable_epoch = std::cmp::max(
        validator.withdrawable_epoch,
        epoch.safe_add(Epoch::new(T::epochs_per_slashings_vector() as u64))?,
    );
    let effective_balance = validator.effective_balance;

    let slashings_index = epoch.as_u64() as usize % T::epochs_per_slashings_vector();
    let slashings_entry = state
        .slashings_mut()
        .get_mut(slashings_index)
        .ok_or(BeaconStateError::InsufficientRandaoMixes)?;
    slashings_entry.safe_add_assign(effective_balance)?;

    decrease_balance(
        state,
        slashed_index,
        effective_balance.safe_div(spec.min_slashing_penalty_quotient)?,
    )?;

    let proposer_index = state.get_beacon_proposer_index(state.slot(), spec)?;
    let whistleblower_index = whistleblower_index.unwrap_or(proposer_index);
    let whistleblower_reward = effective_balance.safe_div(spec.whistleblower_reward_quotient)?;
    let proposer_reward = whistleblower_reward.safe_div(spec.proposer_reward_quotient)?;
    increase_balance(state, proposer_index, proposer_reward)?;
    increase_balance(
        state,
        whistleblower_index,
        whistleblower_reward.safe_sub(proposer_reward)?,
    )?;

    Ok(())
}
