//! Phase0 epoch processing: rewards/penalties computed from `PendingAttestation`s rather than
//! the altair `ParticipationFlags` scheme.

use super::justification_and_finalization::weigh_justification_and_finalization;
use super::registry_updates::process_registry_updates;
use super::validator_statuses::{process_attestations, InclusionInfo};
use super::{process_final_updates, process_slashings, EpochProcessingError};
use crate::common::{decrease_balance, increase_balance};
use crate::per_epoch_processing::epoch_processing_summary::EpochProcessingSummary;
use safe_arith::SafeArith;
use types::{BeaconState, ChainSpec, EthSpec};

/// Accumulated effective-balance sums for the current/previous epoch's active and attesting
/// validator sets, used both by `weigh_justification_and_finalization` and by the base-reward
/// formula.
#[derive(Default, PartialEq, Debug, Clone, Copy)]
pub struct TotalBalances {
    pub(crate) current_epoch: u64,
    pub(crate) current_epoch_attesters: u64,
    pub(crate) current_epoch_target_attesters: u64,
    pub(crate) previous_epoch: u64,
    pub(crate) previous_epoch_attesters: u64,
    pub(crate) previous_epoch_target_attesters: u64,
    pub(crate) previous_epoch_head_attesters: u64,
}

impl TotalBalances {
    pub fn current_epoch(&self) -> u64 {
        self.current_epoch
    }
    pub fn current_epoch_attesters(&self) -> u64 {
        self.current_epoch_attesters
    }
    pub fn current_epoch_target_attesters(&self) -> u64 {
        self.current_epoch_target_attesters
    }
    pub fn previous_epoch(&self) -> u64 {
        self.previous_epoch
    }
    pub fn previous_epoch_attesters(&self) -> u64 {
        self.previous_epoch_attesters
    }
    pub fn previous_epoch_target_attesters(&self) -> u64 {
        self.previous_epoch_target_attesters
    }
    pub fn previous_epoch_head_attesters(&self) -> u64 {
        self.previous_epoch_head_attesters
    }
}

/// Per-validator summary of its activity during the current/previous epoch, computed once up
/// front so the reward/penalty pass doesn't re-scan the attestation lists per validator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatorStatus {
    pub is_slashed: bool,
    pub is_withdrawable_in_current_epoch: bool,
    pub is_active_in_current_epoch: bool,
    pub is_active_in_previous_epoch: bool,
    pub current_epoch_effective_balance: u64,

    pub is_current_epoch_attester: bool,
    pub is_current_epoch_target_attester: bool,
    pub is_previous_epoch_attester: bool,
    pub is_previous_epoch_target_attester: bool,
    pub is_previous_epoch_head_attester: bool,

    pub inclusion_info: Option<InclusionInfo>,

    pub is_eligible: bool,
}

impl ValidatorStatus {
    /// Merges a second vote (e.g. from a second covering attestation) into `self`, taking the
    /// logical OR of every boolean flag and the earliest inclusion delay seen.
    pub fn update(&mut self, other: &Self) {
        if other.is_current_epoch_attester {
            self.is_current_epoch_attester = true;
        }
        if other.is_current_epoch_target_attester {
            self.is_current_epoch_target_attester = true;
        }
        if other.is_previous_epoch_attester {
            self.is_previous_epoch_attester = true;
        }
        if other.is_previous_epoch_target_attester {
            self.is_previous_epoch_target_attester = true;
        }
        if other.is_previous_epoch_head_attester {
            self.is_previous_epoch_head_attester = true;
        }
        match (self.inclusion_info, other.inclusion_info) {
            (Some(a), Some(b)) if b.delay < a.delay => self.inclusion_info = other.inclusion_info,
            (None, Some(_)) => self.inclusion_info = other.inclusion_info,
            _ => {}
        }
    }
}

/// There are four components a validator can be rewarded/penalized for per epoch (source,
/// target, head, inclusion-delay); `get_base_reward` divides evenly by this count.
const BASE_REWARDS_PER_EPOCH: u64 = 4;

/// The specification `get_base_reward`: proportional to the square root of the total active
/// balance, so individual rewards shrink as the validator set grows.
fn base_reward(
    effective_balance: u64,
    total_active_balance_sqrt: u64,
    spec: &ChainSpec,
) -> Result<u64, EpochProcessingError> {
    Ok(effective_balance
        .safe_mul(spec.base_reward_factor)?
        .safe_div(total_active_balance_sqrt)?
        .safe_div(BASE_REWARDS_PER_EPOCH)?)
}

fn process_rewards_and_penalties<T: EthSpec>(
    state: &mut BeaconState<T>,
    statuses: &[ValidatorStatus],
    total_balances: &TotalBalances,
    spec: &ChainSpec,
) -> Result<(), EpochProcessingError> {
    if state.current_epoch() == T::genesis_epoch() {
        return Ok(());
    }

    let total_active_balance_sqrt = integer_sqrt(total_balances.current_epoch().max(1));

    for (index, status) in statuses.iter().enumerate() {
        if !status.is_eligible {
            continue;
        }

        let base_reward = base_reward(
            status.current_epoch_effective_balance,
            total_active_balance_sqrt,
            spec,
        )?;

        if status.is_previous_epoch_attester {
            let reward = base_reward
                .safe_mul(total_balances.previous_epoch_attesters())?
                .safe_div(total_balances.previous_epoch().max(1))?;
            increase_balance(state, index, reward)?;

            if let Some(inclusion) = status.inclusion_info {
                let proposer_reward = base_reward.safe_div(spec.proposer_reward_quotient)?;
                increase_balance(state, inclusion.proposer_index, proposer_reward)?;
                let attester_reward = base_reward.safe_sub(proposer_reward)?;
                let delay_reward = attester_reward.safe_div(inclusion.delay.max(1))?;
                increase_balance(state, index, delay_reward)?;
            }
        } else {
            decrease_balance(state, index, base_reward)?;
        }

        if status.is_previous_epoch_target_attester {
            let reward = base_reward
                .safe_mul(total_balances.previous_epoch_target_attesters())?
                .safe_div(total_balances.previous_epoch().max(1))?;
            increase_balance(state, index, reward)?;
        } else {
            decrease_balance(state, index, base_reward)?;
        }

        if status.is_previous_epoch_head_attester {
            let reward = base_reward
                .safe_mul(total_balances.previous_epoch_head_attesters())?
                .safe_div(total_balances.previous_epoch().max(1))?;
            increase_balance(state, index, reward)?;
        } else {
            decrease_balance(state, index, base_reward)?;
        }
    }

    Ok(())
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

pub fn process_epoch<T: EthSpec>(
    state: &mut BeaconState<T>,
    spec: &ChainSpec,
) -> Result<EpochProcessingSummary, EpochProcessingError> {
    let (statuses, total_balances) = process_attestations(state, spec)?;

    weigh_justification_and_finalization(
        state,
        total_balances.current_epoch(),
        total_balances.previous_epoch_target_attesters(),
        total_balances.current_epoch_target_attesters(),
    )?;

    process_rewards_and_penalties(state, &statuses, &total_balances, spec)?;
    process_registry_updates(state, spec)?;
    process_slashings(state, total_balances.current_epoch(), spec)?;
    process_final_updates(state, spec)?;

    // Base-fork `PendingAttestation`s live only for the epoch they were included in.
    let current = state.current_epoch_attestations()?.clone();
    *state.previous_epoch_attestations_mut()? = current;
    *state.current_epoch_attestations_mut()? = Default::default();

    Ok(EpochProcessingSummary::Base {
        total_balances,
        statuses,
    })
}
