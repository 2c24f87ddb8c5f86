use types::Slot;

/// The only fact the store remembers about a proposal: the slot it was made for. A validator
/// that has signed slot `s` must never be asked to sign any slot `<= s` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedBlock {
    pub slot: Slot,
}

impl SignedBlock {
    pub fn new(slot: Slot) -> Self {
        Self { slot }
    }
}
