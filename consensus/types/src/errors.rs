use crate::*;
use safe_arith::ArithError;
use ssz_types::Error as SszTypesError;

/// Everything that can go wrong reading or mutating a `BeaconState`, from malformed committee
/// caches to out-of-range validator indices. Mirrors the per-module hand-rolled `enum Error`
/// idiom used throughout this codebase (never a single stringly-typed error).
#[derive(Debug, PartialEq, Clone)]
pub enum BeaconStateError {
    EpochOutOfBounds,
    SlotOutOfBounds,
    UnknownValidator(usize),
    UnableToDetermineProducer,
    InvalidBitfield,
    ValidatorStatusesInconsistent,
    InvalidRelativeEpoch {
        slot: Slot,
        epoch: Epoch,
    },
    CommitteeCacheUninitialized(Option<RelativeEpoch>),
    InvalidCommitteeCacheValidatorCount,
    TreeHashCacheNotInitialized,
    NonLinearTreeHashCacheHistory,
    InvalidDepositState {
        deposit_count: u64,
        deposit_index: u64,
    },
    ArithError(ArithError),
    SszTypesError(SszTypesError),
    InsufficientValidators,
    InsufficientRandaoMixes,
    InsufficientBlockRoots,
    InsufficientIndexRoots,
    InsufficientAttestations,
    InsufficientCommittees,
    InsufficientStateRoots,
    NoCommitteeFound {
        slot: Slot,
        index: u64,
    },
    IncorrectStateVariant,
    ParticipationOutOfBounds(usize),
}

impl From<ArithError> for BeaconStateError {
    fn from(e: ArithError) -> Self {
        BeaconStateError::ArithError(e)
    }
}

impl From<SszTypesError> for BeaconStateError {
    fn from(e: SszTypesError) -> Self {
        BeaconStateError::SszTypesError(e)
    }
}

/// Which of the three epochs relative to the state's current slot a cache/seed query concerns.
/// Used instead of a raw `Epoch` so the committee cache can be indexed by a small fixed set of
/// keys rather than an unbounded map.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum RelativeEpoch {
    Previous,
    Current,
    Next,
}

impl RelativeEpoch {
    pub fn into_epoch(self, base: Epoch) -> Epoch {
        match self {
            RelativeEpoch::Previous => base.saturating_sub(Epoch::new(1)),
            RelativeEpoch::Current => base,
            RelativeEpoch::Next => base + 1,
        }
    }

    pub fn from_epoch(base: Epoch, other: Epoch) -> Result<Self, BeaconStateError> {
        if other == base {
            Ok(RelativeEpoch::Current)
        } else if other + 1 == base {
            Ok(RelativeEpoch::Previous)
        } else if base + 1 == other {
            Ok(RelativeEpoch::Next)
        } else {
            Err(BeaconStateError::InvalidRelativeEpoch {
                slot: base.start_slot(1),
                epoch: other,
            })
        }
    }
}
