//! Caches every deposit log observed on the execution layer's deposit contract, in contract
//! order, and can hand back a `(Deposit, proof)` for any contiguous range of them — the data a
//! genesis builder or a block proposer needs, without ever speaking JSON-RPC itself (that's the
//! external collaborator's job; this crate only holds what it hands us).

use crate::metrics;
use merkle_proof::MerkleTree;
use tree_hash::TreeHash;
use types::{Deposit, DepositData, FixedVector, Hash256};

/// Matches the real deposit contract: 32 levels of real data, one more level mixing in the
/// running deposit count.
pub const DEPOSIT_CONTRACT_TREE_DEPTH: usize = 32;

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    /// A log arrived out of order; the cache only ever appends, so a skipped or repeated index
    /// would desynchronize it from the real contract's log order.
    NonConsecutive { expected: u64, found: u64 },
    InconsistentDepositCount { in_file: u64, on_disk: u64 },
    DepositIndexTooHigh,
    DepositCountInvalid,
}

/// One entry from the deposit contract's `DepositEvent` log, already SSZ-decoded.
#[derive(Debug, PartialEq, Clone)]
pub struct DepositLog {
    pub deposit_data: DepositData,
    /// The deposit contract's own running count at the time this deposit was included (the
    /// "index" used by `process_deposit`'s Merkle check).
    pub deposit_count: u64,
    pub block_number: u64,
}

/// An append-only log of deposits plus the incremental Merkle tree needed to prove any one of
/// them against the deposit-contract root active at its own inclusion time.
#[derive(Default)]
pub struct DepositCache {
    logs: Vec<DepositLog>,
    /// `leaves[i]` is `logs[i].deposit_data.tree_hash_root()`, kept alongside so proofs can be
    /// regenerated for any historical index without re-hashing every deposit.
    leaves: Vec<Hash256>,
}

impl DepositCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Appends `log`, which must be the very next deposit in contract order.
    pub fn insert_log(&mut self, log: DepositLog) -> Result<(), Error> {
        let expected = self.logs.len() as u64;
        if log.deposit_count != expected + 1 {
            return Err(Error::NonConsecutive {
                expected: expected + 1,
                found: log.deposit_count,
            });
        }

        self.leaves.push(log.deposit_data.tree_hash_root());
        self.logs.push(log);

        metrics::set_gauge(&metrics::DEPOSIT_CACHE_LEN, self.logs.len() as i64);
        metrics::set_gauge(
            &metrics::HIGHEST_PROCESSED_DEPOSIT_BLOCK,
            self.logs.last().map_or(0, |l| l.block_number) as i64,
        );

        Ok(())
    }

    /// The deposit-contract root as it stood right after `deposit_count` deposits had been
    /// included — the same root `process_deposit` checks a `deposit_count`-th deposit's proof
    /// against.
    pub fn root_at_count(&self, deposit_count: u64) -> Result<Hash256, Error> {
        if deposit_count == 0 || deposit_count as usize > self.leaves.len() {
            return Err(Error::DepositCountInvalid);
        }
        let tree = MerkleTree::create(
            &self.leaves[..deposit_count as usize],
            DEPOSIT_CONTRACT_TREE_DEPTH,
        );
        Ok(mix_in_length(tree.root(), deposit_count))
    }

    /// Builds a `Deposit` (data + Merkle proof) for 1-indexed deposit `deposit_count`, proved
    /// against the root the deposit contract had at the moment that deposit was included.
    pub fn get(&self, deposit_count: u64) -> Result<Deposit, Error> {
        if deposit_count == 0 || deposit_count as usize > self.logs.len() {
            return Err(Error::DepositIndexTooHigh);
        }
        let index = (deposit_count - 1) as usize;
        let tree = MerkleTree::create(
            &self.leaves[..deposit_count as usize],
            DEPOSIT_CONTRACT_TREE_DEPTH,
        );
        let (_, mut proof) = tree.generate_proof(index, DEPOSIT_CONTRACT_TREE_DEPTH);
        proof.push(Hash256::from_slice(&int_to_bytes32(deposit_count)));

        Ok(Deposit {
            proof: FixedVector::from(proof),
            data: self.logs[index].deposit_data.clone(),
        })
    }

    /// Every deposit in `1..=deposit_count`, each proved against the deposit-contract root it was
    /// included under — exactly what genesis construction needs to replay the whole history.
    pub fn get_deposits(&self, deposit_count: u64) -> Result<Vec<Deposit>, Error> {
        (1..=deposit_count).map(|i| self.get(i)).collect()
    }
}

fn mix_in_length(root: Hash256, count: u64) -> Hash256 {
    let mut preimage = Vec::with_capacity(64);
    preimage.extend_from_slice(root.as_bytes());
    preimage.extend_from_slice(&int_to_bytes32(count));
    Hash256::from_slice(&eth2_hashing::hash(&preimage))
}

fn int_to_bytes32(int: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[..8].copy_from_slice(&int.to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::PublicKeyBytes;

    fn log(count: u64) -> DepositLog {
        DepositLog {
            deposit_data: DepositData {
                pubkey: PublicKeyBytes::default(),
                withdrawal_credentials: Hash256::from_low_u64_be(count),
                amount: 32_000_000_000,
                signature: Default::default(),
            },
            deposit_count: count,
            block_number: count,
        }
    }

    #[test]
    fn rejects_out_of_order_logs() {
        let mut cache = DepositCache::new();
        cache.insert_log(log(1)).unwrap();
        assert_eq!(
            cache.insert_log(log(3)),
            Err(Error::NonConsecutive {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn proofs_verify_against_their_own_root() {
        let mut cache = DepositCache::new();
        for i in 1..=5 {
            cache.insert_log(log(i)).unwrap();
        }

        for i in 1..=5 {
            let deposit = cache.get(i).unwrap();
            let root = cache.root_at_count(i).unwrap();
            let leaf = deposit.data.tree_hash_root();
            assert!(merkle_proof::verify_merkle_proof(
                leaf,
                &deposit.proof,
                DEPOSIT_CONTRACT_TREE_DEPTH + 1,
                (i - 1) as usize,
                root,
            ));
        }
    }
}
