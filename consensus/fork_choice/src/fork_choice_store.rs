use crate::fork_choice::compute_slots_since_epoch_start;
use types::{BeaconBlock, BeaconState, Checkpoint, EthSpec, Hash256, Slot};

/// Approximates the `Store` in "Ethereum 2.0 Phase 0 -- Beacon Chain Fork Choice":
///
/// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#store
///
/// ## Detail
///
/// This is only an approximation for two reasons:
///
/// - This crate stores the actual block DAG in `ProtoArrayForkChoice`.
/// - `time` is represented using `Slot` instead of UNIX epoch `u64`.
pub trait ForkChoiceStore<T: EthSpec>: Sized {
    type Error;

    /// Returns the last value passed to `Self::set_current_slot`.
    fn get_current_slot(&self) -> Slot;

    /// Set the value to be returned by `Self::get_current_slot`.
    ///
    /// ## Notes
    ///
    /// This should only ever be called from within the `on_tick` logic in `fork_choice.rs`.
    fn set_current_slot(&mut self, slot: Slot);

    /// Updates the `justified_checkpoint` to the `best_justified_checkpoint`.
    ///
    /// ## Specification
    ///
    /// Implementation must be equivalent to:
    ///
    /// ```ignore
    /// store.justified_checkpoint = store.best_justified_checkpoint
    /// ```
    fn set_justified_checkpoint_to_best_justified_checkpoint(&mut self) -> Result<(), Self::Error>;

    /// Returns the `justified_checkpoint`.
    fn justified_checkpoint(&self) -> &Checkpoint;

    /// Returns the effective balances of every validator in the state identified by
    /// `justified_checkpoint.root`.
    fn justified_balances(&self) -> &[u64];

    /// Returns the `best_justified_checkpoint`.
    fn best_justified_checkpoint(&self) -> &Checkpoint;

    /// Returns the `finalized_checkpoint`.
    fn finalized_checkpoint(&self) -> &Checkpoint;

    /// Sets `finalized_checkpoint`.
    fn set_finalized_checkpoint(&mut self, checkpoint: Checkpoint);

    /// Sets the `justified_checkpoint` from a verified state, refreshing
    /// `Self::justified_balances` along the way.
    fn set_justified_checkpoint(&mut self, state: &BeaconState<T>) -> Result<(), Self::Error>;

    /// Sets the `best_justified_checkpoint` from a verified state.
    fn set_best_justified_checkpoint(&mut self, state: &BeaconState<T>);

    /// Returns the block root of an ancestor of `block_root` at the given `slot`. (Note: `slot`
    /// refers to the block that is *returned*, not the one that is supplied.)
    ///
    /// The root of `state` must match the `block.state_root` of the block identified by
    /// `block_root`.
    ///
    /// ## Specification
    ///
    /// Implementation must be equivalent to:
    ///
    /// https://github.com/ethereum/eth2.0-specs/blob/v0.12.0/specs/phase0/fork-choice.md#get_ancestor
    fn ancestor_at_slot(
        &self,
        state: &BeaconState<T>,
        block_root: Hash256,
        ancestor_slot: Slot,
    ) -> Result<Hash256, Self::Error>;

    /// Called by `ForkChoice::on_block` once a block has been registered with the fork choice
    /// DAG, giving the implementer a chance to update any caches keyed on verified blocks (e.g.
    /// a balances cache keyed on `block_root`).
    fn after_block(
        &mut self,
        block: &BeaconBlock<T>,
        block_root: Hash256,
        state: &BeaconState<T>,
    ) -> Result<(), Self::Error>;
}

/// Calculate how far `slot` lies from the start of its epoch, re-exported so implementers of
/// `ForkChoiceStore` do not need a direct dependency on `fork_choice::fork_choice`.
pub fn slots_since_epoch_start<T: EthSpec>(slot: Slot) -> Slot {
    compute_slots_since_epoch_start::<T>(slot)
}
