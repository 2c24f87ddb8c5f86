//! A compact, array-backed representation of the non-finalized block DAG, plus the LMD-GHOST
//! weight function over it.
//!
//! Nodes are stored in a single growable `Vec` (`ProtoArray::nodes`) addressed by
//! `HashMap<Hash256, usize>`, so both `on_new_block` and `find_head` are allocation-free after
//! the DAG has warmed up; `fork_choice` is the only consumer and holds no block data of its own.

mod error;
mod proto_array;
mod proto_array_fork_choice;
mod ssz_container;

pub use crate::proto_array::Block;
pub use crate::proto_array_fork_choice::{ElasticList, ProtoArrayForkChoice, VoteTracker};
pub use error::Error;

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Epoch, Hash256, MainnetEthSpec, Slot};

    type E = MainnetEthSpec;

    fn hash_from_index(i: u64) -> Hash256 {
        Hash256::from_low_u64_be(i + 1)
    }

    #[test]
    fn finds_genesis_as_head_with_no_other_blocks() {
        let fc = ProtoArrayForkChoice::new(
            Slot::new(0),
            Hash256::zero(),
            Epoch::new(0),
            Epoch::new(0),
            Hash256::zero(),
        )
        .expect("should init with a genesis block");

        let head = fc
            .find_head(Epoch::new(0), Hash256::zero(), Epoch::new(0), &[])
            .expect("should find the head");

        assert_eq!(head, Hash256::zero());
    }

    #[test]
    fn prefers_heavier_child_by_weight() {
        let genesis_root = Hash256::zero();
        let fc = ProtoArrayForkChoice::new(
            Slot::new(0),
            Hash256::zero(),
            Epoch::new(0),
            Epoch::new(0),
            genesis_root,
        )
        .unwrap();

        let block_a = hash_from_index(0);
        let block_b = hash_from_index(1);

        for root in [block_a, block_b] {
            fc.process_block(Block {
                slot: Slot::new(1),
                root,
                parent_root: Some(genesis_root),
                target_root: genesis_root,
                state_root: Hash256::zero(),
                justified_epoch: Epoch::new(0),
                finalized_epoch: Epoch::new(0),
            })
            .unwrap();
        }

        // Two validators vote for `block_a`, one for `block_b`.
        fc.process_attestation(0, block_a, Epoch::new(1)).unwrap();
        fc.process_attestation(1, block_a, Epoch::new(1)).unwrap();
        fc.process_attestation(2, block_b, Epoch::new(1)).unwrap();

        let balances = vec![1, 1, 1];
        let head = fc
            .find_head(Epoch::new(0), genesis_root, Epoch::new(0), &balances)
            .unwrap();

        assert_eq!(head, block_a);
    }

    #[test]
    fn persists_through_ssz_round_trip() {
        let fc = ProtoArrayForkChoice::new(
            Slot::new(0),
            Hash256::zero(),
            Epoch::new(0),
            Epoch::new(0),
            Hash256::zero(),
        )
        .unwrap();

        let child = hash_from_index(0);
        fc.process_block(Block {
            slot: Slot::new(1),
            root: child,
            parent_root: Some(Hash256::zero()),
            target_root: Hash256::zero(),
            state_root: Hash256::zero(),
            justified_epoch: Epoch::new(0),
            finalized_epoch: Epoch::new(0),
        })
        .unwrap();

        let bytes = fc.as_bytes();
        let restored = ProtoArrayForkChoice::from_bytes(&bytes).unwrap();

        assert!(restored.contains_block(&child));
        assert_eq!(fc.len(), restored.len());
    }
}
