use crate::beacon_fork_choice_store::ForkChoiceError;
use state_processing::BlockProcessingError;
use types::{BeaconStateError, Hash256, Slot};

/// Catch-all error type for anything that can go wrong while importing a block, producing one,
/// or servicing an attestation. Most variants just wrap the lower-level crate's own error; a
/// handful (`MissingBeaconBlock`, `InsufficientValidators`, ...) describe conditions that are only
/// meaningful once the pieces those crates don't know about (the DAG, the quarantine) are
/// involved.
#[derive(Debug)]
pub enum BeaconChainError {
    InvalidBlockSlot(Slot),
    InsufficientValidators,
    UnableToReadSlot,
    RevertedFinalizedEpoch {
        previous_epoch: types::Epoch,
        new_epoch: types::Epoch,
    },
    SlotClockDidNotStart,
    NoStateForSlot(Slot),
    UnableToFindTargetRoot(Slot),
    BeaconStateError(BeaconStateError),
    DBError(store::Error),
    ForkChoiceError(ForkChoiceError),
    StateTransitionError(state_processing::Error),
    BlockProcessingError(BlockProcessingError),
    MissingBeaconBlock(Hash256),
    MissingBeaconState(Hash256),
    BlockIsNotLaterThanParent {
        block_slot: Slot,
        parent_slot: Slot,
    },
    UnknownParent(Hash256),
    CannotAttestToFutureState,
    OperationPoolError(operation_pool::Error),
}

impl From<BeaconStateError> for BeaconChainError {
    fn from(e: BeaconStateError) -> Self {
        BeaconChainError::BeaconStateError(e)
    }
}

impl From<store::Error> for BeaconChainError {
    fn from(e: store::Error) -> Self {
        BeaconChainError::DBError(e)
    }
}

impl From<ForkChoiceError> for BeaconChainError {
    fn from(e: ForkChoiceError) -> Self {
        BeaconChainError::ForkChoiceError(e)
    }
}

impl From<state_processing::Error> for BeaconChainError {
    fn from(e: state_processing::Error) -> Self {
        BeaconChainError::StateTransitionError(e)
    }
}

impl From<BlockProcessingError> for BeaconChainError {
    fn from(e: BlockProcessingError) -> Self {
        BeaconChainError::BlockProcessingError(e)
    }
}

impl From<operation_pool::Error> for BeaconChainError {
    fn from(e: operation_pool::Error) -> Self {
        BeaconChainError::OperationPoolError(e)
    }
}
