use crate::test_utils::TestRandom;
use test_random_derive::TestRandom;
use crate::{ChainSpec, Epoch, Hash256};
use bls::PublicKeyBytes;
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// One entry in the validator registry. Append-mostly: once written, `pubkey` and
/// `withdrawal_credentials` never change, which is what lets the store de-duplicate them into
/// `immutable_validators` (§4.2).
#[derive(
    Debug, Clone, PartialEq, Default, Serialize, Deserialize, Encode, Decode, TreeHash, TestRandom,
)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: Hash256,
    pub effective_balance: u64,
    pub slashed: bool,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
}

impl Validator {
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }

    pub fn is_exited_at(&self, epoch: Epoch) -> bool {
        self.exit_epoch <= epoch
    }

    pub fn is_withdrawable_at(&self, epoch: Epoch) -> bool {
        epoch >= self.withdrawable_epoch
    }

    pub fn is_eligible_for_activation_queue(&self, spec: &ChainSpec) -> bool {
        self.activation_eligibility_epoch == Epoch::far_future()
            && self.effective_balance == spec.max_effective_balance
    }

    /// Initializes a brand-new validator from a deposit, with every epoch field at
    /// `FAR_FUTURE_EPOCH` until fork choice / epoch processing assigns real values.
    pub fn from_deposit(
        pubkey: PublicKeyBytes,
        withdrawal_credentials: Hash256,
        amount: u64,
        spec: &ChainSpec,
    ) -> Self {
        let max_effective_balance = spec.max_effective_balance;
        let effective_balance = std::cmp::min(
            amount - amount % spec.effective_balance_increment,
            max_effective_balance,
        );
        Self {
            pubkey,
            withdrawal_credentials,
            activation_eligibility_epoch: Epoch::far_future(),
            activation_epoch: Epoch::far_future(),
            exit_epoch: Epoch::far_future(),
            withdrawable_epoch: Epoch::far_future(),
            effective_balance,
            slashed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_active_before_activation_epoch() {
        let mut v = Validator::default();
        v.activation_epoch = Epoch::new(5);
        v.exit_epoch = Epoch::far_future();
        assert!(!v.is_active_at(Epoch::new(4)));
        assert!(v.is_active_at(Epoch::new(5)));
    }
}
