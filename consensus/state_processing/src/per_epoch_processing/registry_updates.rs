use crate::common::initiate_validator_exit;
use safe_arith::SafeArith;
use types::{BeaconState, BeaconStateError, ChainSpec, Epoch, EthSpec};

/// Equivalent to the specification `process_registry_updates`: advances the activation-
/// eligibility and activation queues, and starts the exit of anyone newly ejectable.
pub fn process_registry_updates<T: EthSpec>(
    state: &mut BeaconState<T>,
    spec: &ChainSpec,
) -> Result<(), BeaconStateError> {
    let current_epoch = state.current_epoch();
    let finalized_epoch = state.finalized_checkpoint().epoch;

    let mut eligible = Vec::new();
    let mut ejectable = Vec::new();
    for (index, validator) in state.validators().iter().enumerate() {
        if validator.is_eligible_for_activation_queue(spec) {
            eligible.push(index);
        }
        if validator.is_active_at(current_epoch) && validator.effective_balance <= spec.ejection_balance {
            ejectable.push(index);
        }
    }

    for index in eligible {
        state.validators_mut()[index].activation_eligibility_epoch = current_epoch;
    }

    for index in ejectable {
        initiate_validator_exit(state, index, spec)?;
    }

    // Activation queue: everyone whose eligibility epoch is already finalized, ordered by
    // eligibility epoch then registry index, admitted up to the per-epoch churn limit.
    let delayed_activation_epoch = current_epoch
        .safe_add(spec.max_seed_lookahead)?
        .safe_add(Epoch::new(1))?;

    let active_validator_count = state
        .get_cached_active_validator_indices(types::RelativeEpoch::Current)?
        .len() as u64;
    let churn_limit = std::cmp::max(
        spec.min_per_epoch_churn_limit,
        active_validator_count.safe_div(spec.churn_limit_quotient)?,
    );

    let mut queue: Vec<usize> = state
        .validators()
        .iter()
        .enumerate()
        .filter(|(_, v)| {
            v.activation_eligibility_epoch != Epoch::far_future()
                && v.activation_epoch == Epoch::far_future()
                && v.activation_eligibility_epoch <= finalized_epoch
        })
        .map(|(i, _)| i)
        .collect();
    queue.sort_by_key(|&i| state.validators()[i].activation_eligibility_epoch);

    for &index in queue.iter().take(churn_limit as usize) {
        state.validators_mut()[index].activation_epoch = delayed_activation_epoch;
    }

    Ok(())
}
