use types::{Epoch, Hash256};

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    InvalidDeltaLen { deltas: usize, indices: usize },
    InvalidNodeIndex(usize),
    InvalidNodeDelta(usize),
    DeltaOverflow(usize),
    InvalidParentDelta(usize),
    InvalidBestDescendant(usize),
    InvalidJustifiedIndex(usize),
    InvalidBestNode {
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
        node_justified_epoch: Epoch,
        node_finalized_epoch: Epoch,
    },
    JustifiedNodeUnknown(Hash256),
    FinalizedNodeUnknown(Hash256),
    UnknownAncestor { ancestor_slot: types::Slot, descendant_root: Hash256 },
    RevertedFinalizedEpoch {
        current_finalized_epoch: Epoch,
        new_finalized_epoch: Epoch,
    },
    IndexOverflow(&'static str),
    InvalidIndexMapping,
    FailedToDeserialize(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}

impl From<Error> for String {
    fn from(e: Error) -> String {
        e.to_string()
    }
}
