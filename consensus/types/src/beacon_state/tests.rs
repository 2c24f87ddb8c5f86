#![cfg(test)]
use crate::test_utils::*;
use crate::*;
use std::ops::{Add, Div, Mul};
use swap_or_not_shuffle::compute_shuffled_index;

pub const MAX_VALIDATOR_COUNT: usize = 129;

fn keypairs() -> Vec<Keypair> {
    generate_deterministic_keypairs(MAX_VALIDATOR_COUNT)
}

/// Builds a bare genesis-like `BeaconState` with `validator_count` already-active validators and
/// no history; good enough to exercise committee/proposer/cache logic without a full chain.
fn build_state<T: EthSpec>(validator_count: usize) -> BeaconState<T> {
    let spec = T::default_spec();
    let kp = keypairs();

    let mut validators = Vec::with_capacity(validator_count);
    let mut balances = Vec::with_capacity(validator_count);
    for i in 0..validator_count {
        let pubkey = PublicKeyBytes::from(&kp[i].pk);
        let mut validator = Validator::from_deposit(
            pubkey,
            Hash256::zero(),
            spec.max_effective_balance,
            &spec,
        );
        validator.activation_eligibility_epoch = Epoch::new(0);
        validator.activation_epoch = Epoch::new(0);
        validators.push(validator);
        balances.push(spec.max_effective_balance);
    }

    let mut state = BeaconState::Base(BeaconStateBase {
        genesis_time: 0,
        genesis_validators_root: Hash256::zero(),
        slot: Slot::new(0),
        fork: Fork {
            previous_version: spec.genesis_fork_version,
            current_version: spec.genesis_fork_version,
            epoch: Epoch::new(0),
        },
        latest_block_header: BeaconBlockHeader {
            slot: Slot::new(0),
            proposer_index: 0,
            parent_root: Hash256::zero(),
            state_root: Hash256::zero(),
            body_root: Hash256::zero(),
        },
        block_roots: FixedVector::from(vec![Hash256::zero(); T::slots_per_historical_root()]),
        state_roots: FixedVector::from(vec![Hash256::zero(); T::slots_per_historical_root()]),
        historical_roots: VariableList::empty(),
        eth1_data: Eth1Data {
            deposit_root: Hash256::zero(),
            deposit_count: 0,
            block_hash: Hash256::zero(),
        },
        eth1_data_votes: VariableList::empty(),
        eth1_deposit_index: 0,
        validators: VariableList::new(validators).expect("fits registry limit"),
        balances: VariableList::new(balances).expect("fits registry limit"),
        randao_mixes: FixedVector::from(vec![Hash256::zero(); T::epochs_per_historical_vector()]),
        slashings: FixedVector::from(vec![0; T::epochs_per_slashings_vector()]),
        previous_epoch_attestations: VariableList::empty(),
        current_epoch_attestations: VariableList::empty(),
        justification_bits: BitVector::default(),
        previous_justified_checkpoint: Checkpoint::new(Epoch::new(0), Hash256::zero()),
        current_justified_checkpoint: Checkpoint::new(Epoch::new(0), Hash256::zero()),
        finalized_checkpoint: Checkpoint::new(Epoch::new(0), Hash256::zero()),
        committee_caches: [
            CommitteeCache::default(),
            CommitteeCache::default(),
            CommitteeCache::default(),
        ],
        pubkey_cache: PubkeyCache::default(),
        exit_cache: ExitCache::default(),
        tree_hash_cache: None,
    });

    state
        .build_committee_cache(RelativeEpoch::Current, &spec)
        .unwrap();
    state
}

fn test_beacon_proposer_index<T: EthSpec>() {
    let spec = T::default_spec();

    let ith_candidate = |state: &BeaconState<T>, slot: Slot, i: usize, spec: &ChainSpec| {
        let epoch = slot.epoch(T::slots_per_epoch());
        let seed = state.get_beacon_proposer_seed(slot, spec).unwrap();
        let active_validators = state.get_active_validator_indices(epoch, spec).unwrap();
        active_validators[compute_shuffled_index(
            i,
            active_validators.len(),
            &seed,
            spec.shuffle_round_count,
        )
        .unwrap()]
    };

    let test = |state: &BeaconState<T>, slot: Slot, candidate_index: usize| {
        assert_eq!(
            state.get_beacon_proposer_index(slot, &spec),
            Ok(ith_candidate(state, slot, candidate_index, &spec))
        );
    };

    let state = build_state::<T>(T::slots_per_epoch() as usize);
    for i in 0..T::slots_per_epoch() {
        test(&state, Slot::from(i), 0);
    }

    let mut state = build_state::<T>((T::slots_per_epoch() as usize).mul(2));
    let slot0_candidate0 = ith_candidate(&state, Slot::new(0), 0, &spec);
    state.validators_mut()[slot0_candidate0].effective_balance = 0;
    test(&state, Slot::new(0), 1);
    for i in 1..T::slots_per_epoch() {
        test(&state, Slot::from(i), 0);
    }
}

#[test]
fn beacon_proposer_index() {
    test_beacon_proposer_index::<MinimalEthSpec>();
}

/// Using the cache before it's built fails; after it's built it passes; after it's dropped it
/// fails again.
fn test_cache_initialization<T: EthSpec>(
    state: &mut BeaconState<T>,
    relative_epoch: RelativeEpoch,
    spec: &ChainSpec,
) {
    let slot = relative_epoch
        .into_epoch(state.slot().epoch(T::slots_per_epoch()))
        .start_slot(T::slots_per_epoch());

    state.build_committee_cache(relative_epoch, spec).unwrap();
    state.get_beacon_committee(slot, 0).unwrap();

    state.drop_committee_cache(relative_epoch);
    assert_eq!(
        state.get_beacon_committee(slot, 0),
        Err(BeaconStateError::CommitteeCacheUninitialized(Some(
            relative_epoch
        )))
    );
}

#[test]
fn cache_initialization() {
    let spec = MinimalEthSpec::default_spec();
    let mut state = build_state::<MinimalEthSpec>(16);

    *state.slot_mut() =
        (MinimalEthSpec::genesis_epoch() + 1).start_slot(MinimalEthSpec::slots_per_epoch());

    test_cache_initialization(&mut state, RelativeEpoch::Previous, &spec);
    test_cache_initialization(&mut state, RelativeEpoch::Current, &spec);
    test_cache_initialization(&mut state, RelativeEpoch::Next, &spec);
}

fn test_clone_config<E: EthSpec>(base_state: &BeaconState<E>, clone_config: CloneConfig) {
    let state = base_state.clone_with(clone_config);
    if clone_config.committee_caches {
        state
            .committee_cache(RelativeEpoch::Previous)
            .expect("committee cache exists");
        state
            .committee_cache(RelativeEpoch::Current)
            .expect("committee cache exists");
        state
            .committee_cache(RelativeEpoch::Next)
            .expect("committee cache exists");
    } else {
        state
            .committee_cache(RelativeEpoch::Previous)
            .expect_err("shouldn't exist");
        state
            .committee_cache(RelativeEpoch::Current)
            .expect_err("shouldn't exist");
        state
            .committee_cache(RelativeEpoch::Next)
            .expect_err("shouldn't exist");
    }
    if clone_config.pubkey_cache {
        assert_ne!(state.pubkey_cache().len(), 0);
    } else {
        assert_eq!(state.pubkey_cache().len(), 0);
    }
    if clone_config.exit_cache {
        state
            .exit_cache()
            .check_initialized()
            .expect("exit cache exists");
    } else {
        state
            .exit_cache()
            .check_initialized()
            .expect_err("exit cache doesn't exist");
    }
    if clone_config.tree_hash_cache {
        assert!(state.tree_hash_cache().is_some());
    } else {
        assert!(state.tree_hash_cache().is_none(), "{:?}", clone_config);
    }
}

#[test]
fn clone_config() {
    let spec = MinimalEthSpec::default_spec();
    let mut state = build_state::<MinimalEthSpec>(16);

    state.build_all_caches(&spec).unwrap();
    state
        .update_tree_hash_cache()
        .expect("should update tree hash cache");

    let num_caches = 4;
    let all_configs = (0..2u8.pow(num_caches)).map(|i| CloneConfig {
        committee_caches: (i & 1) != 0,
        current_sync_committee_cache: false,
        pubkey_cache: ((i >> 1) & 1) != 0,
        exit_cache: ((i >> 2) & 1) != 0,
        tree_hash_cache: ((i >> 3) & 1) != 0,
    });

    for config in all_configs {
        test_clone_config(&state, config);
    }
}

/// Tests committee-specific components.
mod committees {
    use super::*;
    use swap_or_not_shuffle::shuffle_list;

    fn execute_committee_consistency_test<T: EthSpec>(
        state: BeaconState<T>,
        epoch: Epoch,
        validator_count: usize,
        spec: &ChainSpec,
    ) {
        let active_indices: Vec<usize> = (0..validator_count).collect();
        let seed = state.get_seed(epoch, Domain::BeaconAttester, spec).unwrap();
        let relative_epoch = RelativeEpoch::from_epoch(state.current_epoch(), epoch).unwrap();

        let mut ordered_indices = state
            .get_cached_active_validator_indices(relative_epoch)
            .unwrap()
            .to_vec();
        ordered_indices.sort_unstable();
        assert_eq!(
            active_indices, ordered_indices,
            "Validator indices mismatch"
        );

        let shuffling =
            shuffle_list(active_indices, spec.shuffle_round_count, &seed[..], false).unwrap();

        let mut expected_indices_iter = shuffling.iter();

        for slot in epoch.slot_iter(T::slots_per_epoch()) {
            let beacon_committees = state.get_beacon_committees_at_slot(slot).unwrap();

            assert_eq!(
                beacon_committees.len() as u64,
                state
                    .get_epoch_committee_count(relative_epoch)
                    .unwrap()
                    .div(T::slots_per_epoch())
            );

            for (committee_index, bc) in beacon_committees.iter().enumerate() {
                assert_eq!(committee_index as u64, bc.index);
                assert_eq!(
                    state.get_beacon_committee(bc.slot, bc.index).unwrap().committee,
                    bc.committee
                );

                for (committee_i, validator_i) in bc.committee.iter().enumerate() {
                    assert_eq!(
                        *validator_i,
                        *expected_indices_iter.next().unwrap(),
                        "Non-sequential validators."
                    );
                    let attestation_duty = state
                        .get_attestation_duties(*validator_i, relative_epoch)
                        .unwrap()
                        .unwrap();
                    assert_eq!(attestation_duty.slot, slot);
                    assert_eq!(attestation_duty.index, bc.index);
                    assert_eq!(attestation_duty.committee_position, committee_i);
                    assert_eq!(attestation_duty.committee_len, bc.committee.len());
                }
            }
        }

        assert!(expected_indices_iter.next().is_none());
    }

    fn committee_consistency_test<T: EthSpec>(
        validator_count: usize,
        state_epoch: Epoch,
        cache_epoch: RelativeEpoch,
    ) {
        let spec = &T::default_spec();

        let mut state = build_state::<T>(validator_count);
        *state.slot_mut() = state_epoch.start_slot(T::slots_per_epoch());

        state
            .force_build_committee_cache(RelativeEpoch::Previous, spec)
            .unwrap();
        state
            .force_build_committee_cache(RelativeEpoch::Current, spec)
            .unwrap();
        state
            .force_build_committee_cache(RelativeEpoch::Next, spec)
            .unwrap();

        let cache_epoch = cache_epoch.into_epoch(state_epoch);

        execute_committee_consistency_test(state, cache_epoch, validator_count, spec);
    }

    fn committee_consistency_test_suite<T: EthSpec>(cached_epoch: RelativeEpoch) {
        let spec = T::default_spec();

        let validator_count = spec
            .max_committees_per_slot
            .mul(T::slots_per_epoch() as usize)
            .mul(spec.target_committee_size)
            .add(1);

        committee_consistency_test::<T>(validator_count, Epoch::new(0), cached_epoch);

        committee_consistency_test::<T>(validator_count, T::genesis_epoch() + 4, cached_epoch);
    }

    #[test]
    fn current_epoch_committee_consistency() {
        committee_consistency_test_suite::<MinimalEthSpec>(RelativeEpoch::Current);
    }

    #[test]
    fn previous_epoch_committee_consistency() {
        committee_consistency_test_suite::<MinimalEthSpec>(RelativeEpoch::Previous);
    }

    #[test]
    fn next_epoch_committee_consistency() {
        committee_consistency_test_suite::<MinimalEthSpec>(RelativeEpoch::Next);
    }
}

mod get_outstanding_deposit_len {
    use super::*;

    fn state() -> BeaconState<MinimalEthSpec> {
        build_state(16)
    }

    #[test]
    fn returns_ok() {
        let mut state = state();
        assert_eq!(state.get_outstanding_deposit_len(), Ok(0));

        state.eth1_data_mut().deposit_count = 17;
        *state.eth1_deposit_index_mut() = 16;
        assert_eq!(state.get_outstanding_deposit_len(), Ok(1));
    }

    #[test]
    fn returns_err_if_the_state_is_invalid() {
        let mut state = state();
        state.eth1_data_mut().deposit_count = 16;
        *state.eth1_deposit_index_mut() = 17;

        assert_eq!(
            state.get_outstanding_deposit_len(),
            Err(BeaconStateError::InvalidDepositState {
                deposit_count: 16,
                deposit_index: 17,
            })
        );
    }
}
