//! Runs at every epoch boundary, dispatched by fork: phase0 states use `PendingAttestation`
//! bookkeeping (`base`), altair+ states use the packed `ParticipationFlags` scheme (`altair`).
//! `justification_and_finalization` and `registry_updates` are shared between the two since
//! Casper FFG and the activation/exit queue don't change across forks.

pub mod altair;
pub mod base;
mod epoch_processing_summary;
mod justification_and_finalization;
mod registry_updates;
pub mod validator_statuses;

pub use epoch_processing_summary::EpochProcessingSummary;

use safe_arith::{ArithError, SafeArith};
use tree_hash::TreeHash;
use types::{BeaconState, BeaconStateError, ChainSpec, EthSpec, ForkName, Hash256};

#[derive(Debug, PartialEq, Clone)]
pub enum EpochProcessingError {
    BeaconStateError(BeaconStateError),
    ArithError(ArithError),
}

impl From<BeaconStateError> for EpochProcessingError {
    fn from(e: BeaconStateError) -> Self {
        EpochProcessingError::BeaconStateError(e)
    }
}

impl From<ArithError> for EpochProcessingError {
    fn from(e: ArithError) -> Self {
        EpochProcessingError::ArithError(e)
    }
}

/// Dispatches to the fork-appropriate epoch transition.
pub fn process_epoch<T: EthSpec>(
    state: &mut BeaconState<T>,
    spec: &ChainSpec,
) -> Result<EpochProcessingSummary, EpochProcessingError> {
    match spec.fork_name_at_epoch(state.current_epoch()) {
        ForkName::Base => base::process_epoch(state, spec),
        ForkName::Altair | ForkName::Bellatrix => altair::process_epoch(state, spec),
    }
}

/// The number of EPOCHS_PER_ETH1_VOTING_PERIOD epochs the `eth1_data_votes` list accumulates
/// over before being reset; fixed by the specification, not configurable per network.
const EPOCHS_PER_ETH1_VOTING_PERIOD: u64 = 64;

/// Validator effective-balance hysteresis, so a balance oscillating by a few Gwei around a
/// threshold doesn't repeatedly retrigger committee-cache rebuilds.
const HYSTERESIS_QUOTIENT: u64 = 4;
const HYSTERESIS_DOWNWARD_MULTIPLIER: u64 = 1;
const HYSTERESIS_UPWARD_MULTIPLIER: u64 = 5;

/// Equivalent to the specification `process_slashings` function: spreads the total slashed
/// balance (summed over the slashings vector) proportionally across every currently-slashed
/// validator still within its withdrawal-penalty window.
pub fn process_slashings<T: EthSpec>(
    state: &mut BeaconState<T>,
    total_balance: u64,
    spec: &ChainSpec,
) -> Result<(), EpochProcessingError> {
    let epoch = state.current_epoch();
    let sum_slashings: u64 = state.slashings().iter().copied().try_fold(0u64, |acc, x| {
        acc.safe_add(x).map_err(EpochProcessingError::from)
    })?;

    let increment = spec.effective_balance_increment;
    let adjusted_total_slashing_balance = std::cmp::min(sum_slashings.safe_mul(3)?, total_balance);

    let indices: Vec<usize> = state
        .validators()
        .iter()
        .enumerate()
        .filter(|(_, v)| {
            v.slashed
                && epoch.safe_add(types::Epoch::new(T::epochs_per_slashings_vector() as u64 / 2))
                    .map(|w| w == v.withdrawable_epoch)
                    .unwrap_or(false)
        })
        .map(|(i, _)| i)
        .collect();

    for index in indices {
        let effective_balance = state.get_effective_balance(index)?;
        let penalty_numerator = effective_balance
            .safe_div(increment)?
            .safe_mul(adjusted_total_slashing_balance)?;
        let penalty = penalty_numerator
            .safe_div(total_balance.max(1))?
            .safe_mul(increment)?;
        crate::common::decrease_balance(state, index, penalty)?;
    }

    Ok(())
}

/// Effective-balance hysteresis update, eth1-voting-period reset, historical-roots batching and
/// slashings-vector rotation: every bit of per-epoch housekeeping that isn't rewards/penalties
/// or justification/finalization, and so is identical across forks.
pub fn process_final_updates<T: EthSpec>(
    state: &mut BeaconState<T>,
    spec: &ChainSpec,
) -> Result<(), EpochProcessingError> {
    let next_epoch = state.next_epoch();
    let increment = spec.effective_balance_increment;
    let hysteresis_increment = increment.safe_div(HYSTERESIS_QUOTIENT)?;
    let downward_threshold = hysteresis_increment.safe_mul(HYSTERESIS_DOWNWARD_MULTIPLIER)?;
    let upward_threshold = hysteresis_increment.safe_mul(HYSTERESIS_UPWARD_MULTIPLIER)?;

    let balances: Vec<u64> = state.balances().iter().copied().collect();
    for (index, validator) in state.validators_mut().iter_mut().enumerate() {
        let balance = balances[index];
        if balance.safe_add(downward_threshold)? < validator.effective_balance
            || validator.effective_balance.safe_add(upward_threshold)? < balance
        {
            validator.effective_balance = std::cmp::min(
                balance.safe_sub(balance.safe_rem(increment)?)?,
                spec.max_effective_balance,
            );
        }
    }

    let slashings_index = next_epoch.as_u64() as usize % T::epochs_per_slashings_vector();
    *state
        .slashings_mut()
        .get_mut(slashings_index)
        .ok_or(BeaconStateError::InsufficientRandaoMixes)? = 0;

    if next_epoch.as_u64().safe_rem(EPOCHS_PER_ETH1_VOTING_PERIOD)? == 0 {
        *state.eth1_data_votes_mut() = Default::default();
    }

    if next_epoch
        .as_u64()
        .safe_rem((T::slots_per_historical_root() as u64).safe_div(T::slots_per_epoch())?)?
        == 0
    {
        #[derive(tree_hash_derive::TreeHash)]
        struct HistoricalBatch<'a> {
            block_roots: &'a [Hash256],
            state_roots: &'a [Hash256],
        }
        let root = HistoricalBatch {
            block_roots: state.block_roots(),
            state_roots: state.state_roots(),
        }
        .tree_hash_root();
        state
            .historical_roots_mut()
            .push(root)
            .map_err(BeaconStateError::from)?;
    }

    Ok(())
}
