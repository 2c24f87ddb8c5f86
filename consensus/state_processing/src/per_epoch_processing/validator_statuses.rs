use super::base::{TotalBalances, ValidatorStatus};
use super::EpochProcessingError;
use safe_arith::SafeArith;
use types::{BeaconState, ChainSpec, EthSpec, PendingAttestation, RelativeEpoch};

/// How late a validator's attestation was included on-chain, and who proposed the block that
/// included it (the proposer is due a share of the attester's reward for doing so).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InclusionInfo {
    pub delay: u64,
    pub proposer_index: usize,
}

fn status_for_attestation<T: EthSpec>(
    state: &BeaconState<T>,
    attestation: &PendingAttestation<T>,
    is_previous_epoch: bool,
) -> Result<ValidatorStatus, EpochProcessingError> {
    let mut status = ValidatorStatus::default();

    let is_matching_source = true; // only source-matching attestations are admitted into the list
    let is_matching_target = is_previous_epoch
        && attestation.data.target.root == *state.get_block_root_at_epoch(state.previous_epoch())?
        || !is_previous_epoch
            && attestation.data.target.root == *state.get_block_root_at_epoch(state.current_epoch())?;
    let is_matching_head = is_matching_target
        && attestation.data.beacon_block_root == *state.get_block_root(attestation.data.slot)?;

    if is_previous_epoch {
        status.is_previous_epoch_attester = is_matching_source;
        status.is_previous_epoch_target_attester = is_matching_target;
        status.is_previous_epoch_head_attester = is_matching_head;
        status.inclusion_info = Some(InclusionInfo {
            delay: attestation.inclusion_delay,
            proposer_index: attestation.proposer_index as usize,
        });
    } else {
        status.is_current_epoch_attester = is_matching_source;
        status.is_current_epoch_target_attester = is_matching_target;
    }

    Ok(status)
}

/// Builds the per-validator `ValidatorStatus` table and the `TotalBalances` summary from the
/// base-fork `previous_epoch_attestations`/`current_epoch_attestations` lists.
pub fn process_attestations<T: EthSpec>(
    state: &BeaconState<T>,
    spec: &ChainSpec,
) -> Result<(Vec<ValidatorStatus>, TotalBalances), EpochProcessingError> {
    let current_epoch = state.current_epoch();
    let previous_epoch = state.previous_epoch();

    let mut statuses = vec![ValidatorStatus::default(); state.validators().len()];

    for (index, validator) in state.validators().iter().enumerate() {
        let status = &mut statuses[index];
        status.is_slashed = validator.slashed;
        status.is_active_in_current_epoch = validator.is_active_at(current_epoch);
        status.is_active_in_previous_epoch = validator.is_active_at(previous_epoch);
        status.is_withdrawable_in_current_epoch = validator.is_withdrawable_at(current_epoch);
        status.current_epoch_effective_balance = validator.effective_balance;
        status.is_eligible = state.is_eligible_validator(index)?;
    }

    for attestation in state.current_epoch_attestations()?.iter() {
        let committee =
            state.get_beacon_committee(attestation.data.slot, attestation.data.index)?;
        let attester_status = status_for_attestation(state, attestation, false)?;
        for (position, &validator_index) in committee.committee.iter().enumerate() {
            if attestation.aggregation_bits.get(position).unwrap_or(false) {
                statuses[validator_index].update(&attester_status);
            }
        }
    }

    for attestation in state.previous_epoch_attestations()?.iter() {
        let committee =
            state.get_beacon_committee(attestation.data.slot, attestation.data.index)?;
        let attester_status = status_for_attestation(state, attestation, true)?;
        for (position, &validator_index) in committee.committee.iter().enumerate() {
            if attestation.aggregation_bits.get(position).unwrap_or(false) {
                statuses[validator_index].update(&attester_status);
            }
        }
    }

    let effective_balance_increment = spec.effective_balance_increment;
    let mut total_balances = TotalBalances::default();
    for status in &statuses {
        let balance = status.current_epoch_effective_balance;

        if status.is_active_in_current_epoch {
            total_balances.current_epoch.safe_add_assign(balance)?;
            if status.is_current_epoch_attester {
                total_balances.current_epoch_attesters.safe_add_assign(balance)?;
            }
            if status.is_current_epoch_target_attester {
                total_balances
                    .current_epoch_target_attesters
                    .safe_add_assign(balance)?;
            }
        }
        if status.is_active_in_previous_epoch {
            total_balances.previous_epoch.safe_add_assign(balance)?;
            if status.is_previous_epoch_attester {
                total_balances.previous_epoch_attesters.safe_add_assign(balance)?;
            }
            if status.is_previous_epoch_target_attester {
                total_balances
                    .previous_epoch_target_attesters
                    .safe_add_assign(balance)?;
            }
            if status.is_previous_epoch_head_attester {
                total_balances
                    .previous_epoch_head_attesters
                    .safe_add_assign(balance)?;
            }
        }
    }
    // Every sum above is a multiple of the effective-balance increment already; this keeps the
    // minimum floor explicit for callers that treat a zero total as "no active validators yet".
    total_balances.current_epoch = total_balances.current_epoch.max(effective_balance_increment);
    total_balances.previous_epoch = total_balances.previous_epoch.max(effective_balance_increment);

    Ok((statuses, total_balances))
}
