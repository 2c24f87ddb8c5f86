//! Caches eth1 blocks by number, in ascending order, so an eth1 voting scheme (not implemented
//! here — see spec.md §1's exclusion of the JSON-RPC follower) or a genesis builder can look up
//! the `Eth1Data` a given eth1 block implies without re-fetching it.

use crate::metrics;
use types::Hash256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eth1Block {
    pub hash: Hash256,
    pub number: u64,
    pub timestamp: u64,
    /// The deposit-contract root and count as of this block, i.e. the values a voting validator
    /// would place in `Eth1Data` if it chose this block.
    pub deposit_root: Hash256,
    pub deposit_count: u64,
}

impl Eth1Block {
    pub fn eth1_data(&self) -> types::Eth1Data {
        types::Eth1Data {
            deposit_root: self.deposit_root,
            deposit_count: self.deposit_count,
            block_hash: self.hash,
        }
    }
}

#[derive(Debug, Default)]
pub struct BlockCache {
    blocks: Vec<Eth1Block>,
}

impl BlockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn highest_block_number(&self) -> Option<u64> {
        self.blocks.last().map(|b| b.number)
    }

    /// Appends `block`, which must have a strictly greater number than anything cached so far;
    /// the eth1 chain only ever grows, so out-of-order insertion means something upstream is
    /// broken rather than a normal reorg the cache should quietly absorb.
    pub fn insert_root_or_child(&mut self, block: Eth1Block) -> Result<(), String> {
        if let Some(highest) = self.highest_block_number() {
            if block.number <= highest {
                return Err(format!(
                    "block {} is not higher than cached block {}",
                    block.number, highest
                ));
            }
        }

        self.blocks.push(block);
        metrics::set_gauge(&metrics::BLOCK_CACHE_LEN, self.blocks.len() as i64);
        metrics::set_gauge(
            &metrics::LATEST_CACHED_BLOCK_TIMESTAMP,
            self.blocks.last().map_or(0, |b| b.timestamp) as i64,
        );
        Ok(())
    }

    pub fn block_by_number(&self, number: u64) -> Option<&Eth1Block> {
        self.blocks
            .binary_search_by_key(&number, |b| b.number)
            .ok()
            .map(|i| &self.blocks[i])
    }

    pub fn latest_block(&self) -> Option<&Eth1Block> {
        self.blocks.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(number: u64) -> Eth1Block {
        Eth1Block {
            hash: Hash256::from_low_u64_be(number),
            number,
            timestamp: number * 10,
            deposit_root: Hash256::from_low_u64_be(number),
            deposit_count: number,
        }
    }

    #[test]
    fn rejects_non_increasing_blocks() {
        let mut cache = BlockCache::new();
        cache.insert_root_or_child(block(5)).unwrap();
        assert!(cache.insert_root_or_child(block(5)).is_err());
        assert!(cache.insert_root_or_child(block(4)).is_err());
    }

    #[test]
    fn finds_block_by_number() {
        let mut cache = BlockCache::new();
        for n in 1..=10 {
            cache.insert_root_or_child(block(n)).unwrap();
        }
        assert_eq!(cache.block_by_number(7).unwrap().number, 7);
        assert!(cache.block_by_number(11).is_none());
        assert_eq!(cache.latest_block().unwrap().number, 10);
    }
}
