//! `Slot`, `Epoch` and `SyncCommitteePeriod`: unsigned 64-bit counters from genesis.
//!
//! Each has a `FAR_FUTURE` sentinel and saturating arithmetic: adding past `u64::MAX` or
//! subtracting past zero clamps rather than wraps or panics, matching the "explicit saturation"
//! rule for slot/epoch math.

use crate::{ChainSpec, SignedRoot};
use safe_arith::{ArithError, SafeArith};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use std::fmt;
use std::iter::Iterator;
use std::ops::{Add, AddAssign, Div, Mul, Rem, Sub, SubAssign};
use tree_hash::TreeHash;

macro_rules! impl_common {
    ($type:ident) => {
        #[derive(
            Eq,
            Debug,
            Clone,
            Copy,
            Default,
            Hash,
            PartialEq,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
            Encode,
            Decode,
        )]
        #[serde(transparent)]
        pub struct $type(u64);

        impl $type {
            pub const fn new(slot: u64) -> $type {
                $type(slot)
            }

            pub fn max_value() -> $type {
                $type(u64::MAX)
            }

            pub fn as_u64(&self) -> u64 {
                self.0
            }

            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }

            pub fn checked_sub(&self, other: $type) -> Option<$type> {
                self.0.checked_sub(other.0).map($type)
            }

            pub fn saturating_sub(&self, other: $type) -> $type {
                $type(self.0.saturating_sub(other.0))
            }

            pub fn saturating_add(&self, other: $type) -> $type {
                $type(self.0.saturating_add(other.0))
            }

            pub fn safe_add(&self, other: $type) -> Result<$type, ArithError> {
                self.0.safe_add(other.0).map($type)
            }

            pub fn safe_sub(&self, other: $type) -> Result<$type, ArithError> {
                self.0.safe_sub(other.0).map($type)
            }
        }

        impl From<u64> for $type {
            fn from(x: u64) -> $type {
                $type(x)
            }
        }

        impl From<$type> for u64 {
            fn from(x: $type) -> u64 {
                x.0
            }
        }

        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Add<u64> for $type {
            type Output = $type;
            fn add(self, other: u64) -> $type {
                $type(self.0.saturating_add(other))
            }
        }

        impl AddAssign<u64> for $type {
            fn add_assign(&mut self, other: u64) {
                self.0 = self.0.saturating_add(other);
            }
        }

        impl Sub<u64> for $type {
            type Output = $type;
            fn sub(self, other: u64) -> $type {
                $type(self.0.saturating_sub(other))
            }
        }

        impl SubAssign<u64> for $type {
            fn sub_assign(&mut self, other: u64) {
                self.0 = self.0.saturating_sub(other);
            }
        }

        impl Mul<u64> for $type {
            type Output = $type;
            fn mul(self, rhs: u64) -> $type {
                $type(self.0.saturating_mul(rhs))
            }
        }

        impl Div<u64> for $type {
            type Output = $type;
            fn div(self, rhs: u64) -> $type {
                assert!(rhs != 0, "Cannot divide by zero");
                $type(self.0 / rhs)
            }
        }

        impl Rem<u64> for $type {
            type Output = $type;
            fn rem(self, modulus: u64) -> $type {
                $type(self.0 % modulus)
            }
        }

        impl SignedRoot for $type {}

        impl TreeHash for $type {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                u64::tree_hash_type()
            }
            fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
                self.0.tree_hash_packed_encoding()
            }
            fn tree_hash_packing_factor() -> usize {
                u64::tree_hash_packing_factor()
            }
            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                self.0.tree_hash_root()
            }
        }
    };
}

impl_common!(Slot);
impl_common!(Epoch);
impl_common!(SyncCommitteePeriod);

impl Slot {
    /// The sentinel meaning "never", used for e.g. a validator's activation/exit slot that has
    /// not yet been decided. Arithmetic on it saturates rather than overflowing.
    pub fn far_future() -> Slot {
        Slot::new(u64::MAX)
    }

    pub fn epoch(&self, slots_per_epoch: u64) -> Epoch {
        if *self == Slot::far_future() {
            return Epoch::far_future();
        }
        Epoch::new(self.0 / slots_per_epoch)
    }

    pub fn sync_committee_period(&self, spec: &ChainSpec) -> SyncCommitteePeriod {
        self.epoch(spec.slots_per_epoch)
            .sync_committee_period(spec)
    }
}

impl Epoch {
    pub fn far_future() -> Epoch {
        Epoch::new(u64::MAX)
    }

    pub fn start_slot(&self, slots_per_epoch: u64) -> Slot {
        if *self == Epoch::far_future() {
            return Slot::far_future();
        }
        Slot::new(self.0.saturating_mul(slots_per_epoch))
    }

    pub fn end_slot(&self, slots_per_epoch: u64) -> Slot {
        self.start_slot(slots_per_epoch) + (slots_per_epoch - 1)
    }

    pub fn slot_iter(&self, slots_per_epoch: u64) -> impl Iterator<Item = Slot> {
        let start = self.start_slot(slots_per_epoch).as_u64();
        (start..start + slots_per_epoch).map(Slot::new)
    }

    pub fn sync_committee_period(&self, spec: &ChainSpec) -> SyncCommitteePeriod {
        if *self == Epoch::far_future() {
            return SyncCommitteePeriod::new(u64::MAX);
        }
        SyncCommitteePeriod::new(self.0 / spec.epochs_per_sync_committee_period)
    }

    /// True when `self` is the first epoch of its sync-committee period.
    pub fn is_sync_committee_period_boundary(&self, spec: &ChainSpec) -> bool {
        self.0 % spec.epochs_per_sync_committee_period == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_epoch_far_future() {
        assert_eq!(Slot::far_future().epoch(32), Epoch::far_future());
    }

    #[test]
    fn epoch_start_slot_far_future() {
        assert_eq!(Epoch::far_future().start_slot(32), Slot::far_future());
    }

    #[test]
    fn saturating_sub_never_panics() {
        assert_eq!(Slot::new(3).saturating_sub(Slot::new(10)), Slot::new(0));
    }

    #[test]
    fn epoch_slot_iter_len() {
        let slots: Vec<_> = Epoch::new(0).slot_iter(8).collect();
        assert_eq!(slots.len(), 8);
        assert_eq!(slots[0], Slot::new(0));
    }
}
