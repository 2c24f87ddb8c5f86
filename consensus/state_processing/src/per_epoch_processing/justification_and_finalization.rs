//! Shared between `base::process_epoch` and `altair::process_epoch`: both forks weigh the same
//! justification bits against the same three Casper FFG rules, they just source the attesting
//! balances differently (`TotalBalances` vs `ParticipationCache`).

use safe_arith::SafeArith;
use types::{BeaconState, BeaconStateError, Checkpoint, Epoch, EthSpec};

const JUSTIFICATION_BITS_LENGTH: usize = 4;

/// Equivalent to the specification `weigh_justification_and_finalization` function.
pub fn weigh_justification_and_finalization<T: EthSpec>(
    state: &mut BeaconState<T>,
    total_active_balance: u64,
    previous_epoch_target_balance: u64,
    current_epoch_target_balance: u64,
) -> Result<(), BeaconStateError> {
    let previous_epoch = state.previous_epoch();
    let current_epoch = state.current_epoch();

    let old_previous_justified_checkpoint = *state.previous_justified_checkpoint();
    let old_current_justified_checkpoint = *state.current_justified_checkpoint();

    // Process justifications.
    *state.previous_justified_checkpoint_mut() = old_current_justified_checkpoint;
    let bits = state.justification_bits_mut();
    for i in (1..JUSTIFICATION_BITS_LENGTH).rev() {
        let bit = bits.get(i - 1).map_err(|_| BeaconStateError::InvalidBitfield)?;
        bits.set(i, bit).map_err(|_| BeaconStateError::InvalidBitfield)?;
    }
    bits.set(0, false).map_err(|_| BeaconStateError::InvalidBitfield)?;

    if previous_epoch_target_balance.safe_mul(3)? >= total_active_balance.safe_mul(2)? {
        *state.current_justified_checkpoint_mut() = Checkpoint::new(
            previous_epoch,
            *state.get_block_root_at_epoch(previous_epoch)?,
        );
        state
            .justification_bits_mut()
            .set(1, true)
            .map_err(|_| BeaconStateError::InvalidBitfield)?;
    }

    if current_epoch_target_balance.safe_mul(3)? >= total_active_balance.safe_mul(2)? {
        *state.current_justified_checkpoint_mut() = Checkpoint::new(
            current_epoch,
            *state.get_block_root_at_epoch(current_epoch)?,
        );
        state
            .justification_bits_mut()
            .set(0, true)
            .map_err(|_| BeaconStateError::InvalidBitfield)?;
    }

    // Process finalizations, checking the four standard source/target distances.
    let bits = state.justification_bits().clone();
    let bit = |i: usize| bits.get(i).unwrap_or(false);

    // The 2nd/3rd/4th most recent epochs are justified, the 2nd using the 3rd as source.
    if bit(1) && bit(2) && bit(3) && old_previous_justified_checkpoint.epoch.safe_add(Epoch::new(3))? == current_epoch {
        *state.finalized_checkpoint_mut() = old_previous_justified_checkpoint;
    }
    // The 2nd/3rd most recent epochs are justified, the 2nd using the 3rd as source.
    if bit(1) && bit(2) && old_previous_justified_checkpoint.epoch.safe_add(Epoch::new(2))? == current_epoch {
        *state.finalized_checkpoint_mut() = old_previous_justified_checkpoint;
    }
    // The 1st/2nd/3rd most recent epochs are justified, the 1st using the 2nd as source.
    if bit(0) && bit(1) && bit(2) && old_current_justified_checkpoint.epoch.safe_add(Epoch::new(2))? == current_epoch {
        *state.finalized_checkpoint_mut() = old_current_justified_checkpoint;
    }
    // The 1st/2nd most recent epochs are justified, the 1st using the 2nd as source.
    if bit(0) && bit(1) && old_current_justified_checkpoint.epoch.safe_add(Epoch::new(1))? == current_epoch {
        *state.finalized_checkpoint_mut() = old_current_justified_checkpoint;
    }

    Ok(())
}
