//! Builds a genesis `BeaconState`/`BeaconBlock` pair either from an eth1 deposit history (via
//! [`eth1::DepositCache`]) or, for local testnets, from a deterministic set of interop keypairs.
//!
//! Reference: https://github.com/ethereum/eth2.0-pm/tree/6e41fcf383ebeb5125938850d8e9b4e9888389b4/interop/mocked_start

use eth1::DepositCache;
use eth2_hashing::hash;
use ssz::Encode;
use state_processing::initialize_beacon_state_from_eth1;
use std::time::{SystemTime, UNIX_EPOCH};
use tree_hash::TreeHash;
use types::{
    test_utils::generate_deterministic_keypairs, BeaconBlock, BeaconState, ChainSpec, Deposit,
    DepositData, Domain, EthSpec, FixedVector, Hash256, PublicKey, SignedRoot,
};

/// Wraps `eth1::DepositCacheError` and `state_processing::GenesisError` — the two ways building a
/// genesis state from a real deposit history can fail.
#[derive(Debug)]
pub enum Error {
    DepositCache(eth1::DepositCacheError),
    Genesis(state_processing::GenesisError),
}

impl From<eth1::DepositCacheError> for Error {
    fn from(e: eth1::DepositCacheError) -> Self {
        Error::DepositCache(e)
    }
}

impl From<state_processing::GenesisError> for Error {
    fn from(e: state_processing::GenesisError) -> Self {
        Error::Genesis(e)
    }
}

/// The genesis block for any chain is simply the `BeaconBlock::empty` with its `state_root` set
/// to the genesis state's root; there's no parent block to reference.
pub fn genesis_block<T: EthSpec>(genesis_state: &BeaconState<T>, spec: &ChainSpec) -> BeaconBlock<T> {
    let mut block = BeaconBlock::empty(spec);
    *block.state_root_mut() = genesis_state.tree_hash_root();
    block
}

/// Replays every deposit in `cache` against an empty state, in contract order, producing the
/// genesis state an eth1-following node would agree on with its peers.
pub fn state_from_deposit_cache<T: EthSpec>(
    eth1_block_hash: Hash256,
    eth1_timestamp: u64,
    genesis_time: u64,
    cache: &DepositCache,
    spec: &ChainSpec,
) -> Result<BeaconState<T>, Error> {
    let deposits = cache.get_deposits(cache.len() as u64)?;

    let mut state =
        initialize_beacon_state_from_eth1(eth1_block_hash, eth1_timestamp, deposits, spec)?;
    *state.genesis_time_mut() = genesis_time;

    Ok(state)
}

/// Builds a genesis state from `validator_count` deterministic interop keypairs, each deposited
/// with a full effective balance against coordinated junk eth1 data — the standard way local
/// testnets and spec-test fixtures bootstrap a chain without touching a real deposit contract.
pub fn interop_genesis_state<T: EthSpec>(
    validator_count: usize,
    genesis_time: u64,
    spec: &ChainSpec,
) -> Result<BeaconState<T>, Error> {
    let keypairs = generate_deterministic_keypairs(validator_count);
    let eth1_block_hash = Hash256::from_slice(&[0x42; 32]);
    let eth1_timestamp = 2_u64.pow(40);
    let amount = spec.max_effective_balance;

    let withdrawal_credentials = |pubkey: &PublicKey| {
        let mut credentials = hash(&pubkey.as_ssz_bytes());
        credentials[0] = spec.bls_withdrawal_prefix_byte;
        Hash256::from_slice(&credentials)
    };

    let domain = spec.compute_domain(Domain::Deposit, spec.genesis_fork_version, Hash256::zero());

    let datas: Vec<DepositData> = keypairs
        .iter()
        .map(|keypair| {
            let mut data = DepositData {
                withdrawal_credentials: withdrawal_credentials(&keypair.pk),
                pubkey: (&keypair.pk).into(),
                amount,
                signature: bls::SignatureBytes::from(&bls::Signature::empty()),
            };
            let sig = keypair.sk.sign(data.signing_root(domain).as_bytes());
            data.signature = bls::SignatureBytes::from(&sig);
            data
        })
        .collect();

    let leaves: Vec<Hash256> = datas.iter().map(|data| data.tree_hash_root()).collect();

    // Not efficient: a `DepositCache` rebuilds its tree once per call too, so this mirrors that
    // same cost rather than hand-rolling a second, divergent tree-building path just for interop.
    let deposits: Vec<Deposit> = datas
        .into_iter()
        .enumerate()
        .map(|(i, data)| {
            let tree = merkle_proof::MerkleTree::create(
                &leaves[..=i],
                spec.deposit_contract_tree_depth as usize,
            );
            let (_, mut proof) =
                tree.generate_proof(i, spec.deposit_contract_tree_depth as usize);
            proof.push(Hash256::from_slice(&int_to_bytes32((i + 1) as u64)));

            Deposit {
                proof: FixedVector::from(proof),
                data,
            }
        })
        .collect();

    let mut state =
        initialize_beacon_state_from_eth1(eth1_block_hash, eth1_timestamp, deposits, spec)?;
    *state.genesis_time_mut() = genesis_time;

    Ok(state)
}

fn int_to_bytes32(int: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[..8].copy_from_slice(&int.to_le_bytes());
    out
}

/// Returns the system time, rounded down to the start of the current `minutes`-long period — an
/// easy way to pick a genesis time recent testnets all agree on without any coordination.
pub fn recent_genesis_time(minutes: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let secs_after_last_period = now.checked_rem(minutes * 60).unwrap_or(0);
    now - secs_after_last_period
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::MinimalEthSpec;

    type TestEthSpec = MinimalEthSpec;

    #[test]
    fn interop_state() {
        let validator_count = 16;
        let genesis_time = 42;
        let spec = &TestEthSpec::default_spec();

        let state = interop_genesis_state::<TestEthSpec>(validator_count, genesis_time, spec)
            .expect("should build state");

        assert_eq!(
            state.eth1_data().block_hash,
            Hash256::from_slice(&[0x42; 32]),
            "eth1 block hash should be co-ordinated junk"
        );
        assert_eq!(state.genesis_time(), genesis_time);

        for b in state.balances() {
            assert_eq!(*b, spec.max_effective_balance);
        }

        for v in state.validators() {
            let creds = v.withdrawal_credentials.as_bytes();
            assert_eq!(creds[0], spec.bls_withdrawal_prefix_byte);
            assert_eq!(&creds[1..], &hash(&v.pubkey.as_ssz_bytes())[1..]);
        }

        assert_eq!(state.balances().len(), validator_count);
        assert_eq!(state.validators().len(), validator_count);
    }

    #[test]
    fn genesis_block_references_genesis_state_root() {
        let spec = &TestEthSpec::default_spec();
        let state = interop_genesis_state::<TestEthSpec>(4, 1_600_000_000, spec).unwrap();
        let block = genesis_block(&state, spec);
        assert_eq!(block.state_root(), state.tree_hash_root());
    }
}
