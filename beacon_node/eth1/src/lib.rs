//! Support types for the eth1 side of genesis and deposit processing: an append-only deposit
//! cache that can reconstruct a Merkle proof for any historical deposit, and a block cache
//! indexing the eth1 blocks those deposits arrived in.
//!
//! Fetching this data from an execution-layer JSON-RPC endpoint is out of scope (spec.md §1) —
//! this crate only holds and proves what an external collaborator feeds it through
//! [`DepositCache::insert_log`] and [`BlockCache::insert_root_or_child`].

#[macro_use]
extern crate lazy_static;

mod block_cache;
mod deposit_cache;
pub mod metrics;

pub use block_cache::{BlockCache, Eth1Block};
pub use deposit_cache::{DepositCache, DepositLog, Error as DepositCacheError};
