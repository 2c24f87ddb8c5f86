//! Pool of `SignedVoluntaryExit`s awaiting inclusion, keyed by the exiting validator index so a
//! validator can only ever have one exit queued regardless of how many times it is gossiped.

use std::collections::HashMap;
use types::typenum::Unsigned;
use types::{BeaconState, EthSpec, SignedVoluntaryExit};

#[derive(Default)]
pub struct ExitPool {
    by_validator: HashMap<u64, SignedVoluntaryExit>,
}

impl ExitPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, exit: SignedVoluntaryExit) {
        self.by_validator
            .entry(exit.message.validator_index)
            .or_insert(exit);
    }

    pub fn len(&self) -> usize {
        self.by_validator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_validator.is_empty()
    }

    /// Up to `T::MaxVoluntaryExits` exits whose validator is still active (and so still eligible
    /// to exit) as of `state`'s current epoch.
    pub fn get_voluntary_exits<T: EthSpec>(&self, state: &BeaconState<T>) -> Vec<SignedVoluntaryExit> {
        let current_epoch = state.current_epoch();
        self.by_validator
            .values()
            .filter(|exit| {
                state
                    .validators()
                    .get(exit.message.validator_index as usize)
                    .map_or(false, |v| v.is_active_at(current_epoch))
            })
            .take(T::MaxVoluntaryExits::to_usize())
            .cloned()
            .collect()
    }

    /// Drops exits for validators that have already left the active set.
    pub fn prune<T: EthSpec>(&mut self, state: &BeaconState<T>) {
        let current_epoch = state.current_epoch();
        self.by_validator.retain(|validator_index, _| {
            state
                .validators()
                .get(*validator_index as usize)
                .map_or(false, |v| v.is_active_at(current_epoch))
        });
    }

    pub fn snapshot(&self) -> Vec<SignedVoluntaryExit> {
        self.by_validator.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Epoch, Signature, VoluntaryExit};

    fn exit(validator_index: u64, epoch: u64) -> SignedVoluntaryExit {
        SignedVoluntaryExit {
            message: VoluntaryExit {
                epoch: Epoch::new(epoch),
                validator_index,
            },
            signature: Signature::empty(),
        }
    }

    #[test]
    fn duplicate_insert_keeps_first() {
        let mut pool = ExitPool::new();
        pool.insert(exit(5, 1));
        pool.insert(exit(5, 2));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.by_validator[&5].message.epoch, Epoch::new(1));
    }

    #[test]
    fn starts_empty() {
        let pool = ExitPool::new();
        assert!(pool.is_empty());
    }
}
