//! Applies the operations carried in a block body to `state`, after `per_slot_processing` has
//! already advanced the slot counter and run any due epoch transition.

use crate::common::{decrease_balance, increase_balance, initiate_validator_exit, slash_validator};
use merkle_proof::verify_merkle_proof;
use safe_arith::{ArithError, SafeArith};
use types::{
    AttesterSlashing, BeaconBlock, BeaconBlockBodyAltair, BeaconBlockBodyBase,
    BeaconBlockBodyBellatrix, BeaconState, BeaconStateError, ChainSpec, Deposit, Domain, Epoch,
    Eth1Data, EthSpec, Hash256, ProposerSlashing, SignedBeaconBlock, SignedVoluntaryExit,
    SyncAggregate, Validator,
};

#[derive(Debug, PartialEq, Clone)]
pub enum BlockProcessingError {
    BeaconStateError(BeaconStateError),
    ArithError(ArithError),
    IncorrectBlockProposer { block: u64, local_shuffling: u64 },
    ProposerSlashed(usize),
    StateSlotMismatch,
    ParentRootMismatch,
    BadSignature,
    HeaderInvalid,
    ProposerSlashingInvalid,
    AttesterSlashingInvalid,
    AttestationInvalid,
    ExitInvalid,
    DepositInvalid,
    SyncAggregateInvalid,
}

impl From<BeaconStateError> for BlockProcessingError {
    fn from(e: BeaconStateError) -> Self {
        BlockProcessingError::BeaconStateError(e)
    }
}

impl From<ArithError> for BlockProcessingError {
    fn from(e: ArithError) -> Self {
        BlockProcessingError::ArithError(e)
    }
}

/// Selects how much signature verification `per_block_processing` performs: full verification
/// for blocks received over gossip/RPC, proposer-only for blocks already known-valid except for
/// their wrapping (e.g. during block production dry-runs), and none for trusted replay (e.g.
/// loading a weak-subjectivity checkpoint already vetted by a peer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifySignatures {
    True,
    OnlyProposer,
    False,
}

impl VerifySignatures {
    fn verify_proposer(self) -> bool {
        !matches!(self, VerifySignatures::False)
    }

    fn verify_non_proposer(self) -> bool {
        matches!(self, VerifySignatures::True)
    }
}

/// Every field shared across `BeaconBlockBody{Base,Altair,Bellatrix}`, so `process_operations`
/// doesn't need to be duplicated three times for what's otherwise identical logic.
trait BlockOperations<T: EthSpec> {
    fn randao_reveal(&self) -> &bls::Signature;
    fn eth1_data(&self) -> &Eth1Data;
    fn proposer_slashings(&self) -> &[ProposerSlashing];
    fn attester_slashings(&self) -> &[AttesterSlashing<T>];
    fn attestations(&self) -> &[types::Attestation<T>];
    fn deposits(&self) -> &[Deposit];
    fn voluntary_exits(&self) -> &[SignedVoluntaryExit];
}

macro_rules! impl_block_operations {
    ($type:ident) => {
        impl<T: EthSpec> BlockOperations<T> for $type<T> {
            fn randao_reveal(&self) -> &bls::Signature {
                &self.randao_reveal
            }
            fn eth1_data(&self) -> &Eth1Data {
                &self.eth1_data
            }
            fn proposer_slashings(&self) -> &[ProposerSlashing] {
                &self.proposer_slashings
            }
            fn attester_slashings(&self) -> &[AttesterSlashing<T>] {
                &self.attester_slashings
            }
            fn attestations(&self) -> &[types::Attestation<T>] {
                &self.attestations
            }
            fn deposits(&self) -> &[Deposit] {
                &self.deposits
            }
            fn voluntary_exits(&self) -> &[SignedVoluntaryExit] {
                &self.voluntary_exits
            }
        }
    };
}
impl_block_operations!(BeaconBlockBodyBase);
impl_block_operations!(BeaconBlockBodyAltair);
impl_block_operations!(BeaconBlockBodyBellatrix);

/// Top-level entry point: applies every block operation to `state`, which must already be at
/// `block.slot()` (i.e. `per_slot_processing`/`process_slots` has already run).
pub fn per_block_processing<T: EthSpec>(
    state: &mut BeaconState<T>,
    signed_block: &SignedBeaconBlock<T>,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let block = &signed_block.message;

    process_block_header(state, block, spec)?;
    if verify_signatures.verify_proposer() {
        verify_block_signature(state, signed_block, spec)?;
    }
    process_randao(state, block, verify_signatures, spec)?;
    process_eth1_data(state, block_eth1_data(block))?;

    match block {
        BeaconBlock::Base(inner) => process_operations(state, &inner.body, verify_signatures, spec)?,
        BeaconBlock::Altair(inner) => {
            process_operations(state, &inner.body, verify_signatures, spec)?;
            process_sync_aggregate(state, &inner.body.sync_aggregate, verify_signatures, spec)?;
        }
        BeaconBlock::Bellatrix(inner) => {
            process_operations(state, &inner.body, verify_signatures, spec)?;
            process_sync_aggregate(state, &inner.body.sync_aggregate, verify_signatures, spec)?;
        }
    }

    Ok(())
}

/// Helper only used to pick the right `eth1_data` out of whichever variant `block` is, without
/// repeating the match in the caller.
fn block_eth1_data<'a, T: EthSpec>(block: &'a BeaconBlock<T>) -> &'a Eth1Data {
    match block {
        BeaconBlock::Base(inner) => &inner.body.eth1_data,
        BeaconBlock::Altair(inner) => &inner.body.eth1_data,
        BeaconBlock::Bellatrix(inner) => &inner.body.eth1_data,
    }
}

/// Equivalent to the specification `process_block_header` function.
fn process_block_header<T: EthSpec>(
    state: &mut BeaconState<T>,
    block: &BeaconBlock<T>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    if block.slot() != state.slot() {
        return Err(BlockProcessingError::StateSlotMismatch);
    }

    if block.slot() <= state.latest_block_header().slot {
        return Err(BlockProcessingError::HeaderInvalid);
    }

    let expected_proposer = state.get_beacon_proposer_index(state.slot(), spec)? as u64;
    if block.proposer_index() != expected_proposer {
        return Err(BlockProcessingError::IncorrectBlockProposer {
            block: block.proposer_index(),
            local_shuffling: expected_proposer,
        });
    }

    if block.parent_root() != state.latest_block_header().canonical_root() {
        return Err(BlockProcessingError::ParentRootMismatch);
    }

    *state.latest_block_header_mut() = block.temporary_block_header();

    let proposer = state.get_validator(block.proposer_index() as usize)?;
    if proposer.slashed {
        return Err(BlockProcessingError::ProposerSlashed(
            block.proposer_index() as usize
        ));
    }

    Ok(())
}

/// Verifies `signed_block.signature` against the block's proposer over `Domain::BeaconProposer`.
/// Carried out once at the top of `per_block_processing` rather than inside
/// `process_block_header`, since the signature belongs to the outer `SignedBeaconBlock`, not the
/// inner message the header fields are drawn from.
fn verify_block_signature<T: EthSpec>(
    state: &BeaconState<T>,
    signed_block: &SignedBeaconBlock<T>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    use types::SignedRoot;
    let block = &signed_block.message;
    let proposer = state.get_validator(block.proposer_index() as usize)?;
    let proposer_pubkey = proposer
        .pubkey
        .decompress()
        .map_err(|_| BlockProcessingError::BadSignature)?;
    let domain = spec.get_domain(
        block.epoch(),
        Domain::BeaconProposer,
        &state.fork(),
        state.genesis_validators_root(),
    );
    let message = block.signing_root(domain);
    if !signed_block
        .signature
        .verify(&proposer_pubkey, message.as_bytes())
    {
        return Err(BlockProcessingError::BadSignature);
    }
    Ok(())
}

/// Equivalent to the specification `process_randao` function.
fn process_randao<T: EthSpec>(
    state: &mut BeaconState<T>,
    block: &BeaconBlock<T>,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let epoch = state.current_epoch();
    let randao_reveal = match block {
        BeaconBlock::Base(inner) => &inner.body.randao_reveal,
        BeaconBlock::Altair(inner) => &inner.body.randao_reveal,
        BeaconBlock::Bellatrix(inner) => &inner.body.randao_reveal,
    };

    if verify_signatures.verify_proposer() {
        let proposer = state.get_validator(block.proposer_index() as usize)?;
        let proposer_pubkey = proposer
            .pubkey
            .decompress()
            .map_err(|_| BlockProcessingError::BadSignature)?;
        let domain = spec.get_domain(
            epoch,
            Domain::Randao,
            &state.fork(),
            state.genesis_validators_root(),
        );
        use types::SignedRoot;
        let message = epoch.signing_root(domain);
        if !randao_reveal.verify(&proposer_pubkey, message.as_bytes()) {
            return Err(BlockProcessingError::BadSignature);
        }
    }

    let mix_index = epoch.as_u64() as usize % T::epochs_per_historical_vector();
    let hash = eth2_hashing::hash(&randao_reveal.serialize());
    let mut reveal_hash = [0u8; 32];
    reveal_hash.copy_from_slice(&hash[..32]);
    let existing_mix = *state
        .randao_mixes()
        .get(mix_index)
        .ok_or(BeaconStateError::InsufficientRandaoMixes)?;
    let mut new_mix = [0u8; 32];
    for i in 0..32 {
        new_mix[i] = existing_mix.as_bytes()[i] ^ reveal_hash[i];
    }
    *state
        .randao_mixes_mut()
        .get_mut(mix_index)
        .ok_or(BeaconStateError::InsufficientRandaoMixes)? = Hash256::from(new_mix);

    Ok(())
}

const EPOCHS_PER_ETH1_VOTING_PERIOD: u64 = 64;

/// Equivalent to the specification `process_eth1_data` function.
fn process_eth1_data<T: EthSpec>(
    state: &mut BeaconState<T>,
    eth1_data: &Eth1Data,
) -> Result<(), BlockProcessingError> {
    state
        .eth1_data_votes_mut()
        .push(*eth1_data)
        .map_err(BeaconStateError::from)?;

    let vote_count = state
        .eth1_data_votes()
        .iter()
        .filter(|vote| *vote == eth1_data)
        .count();
    let threshold = (EPOCHS_PER_ETH1_VOTING_PERIOD as usize)
        .safe_mul(T::slots_per_epoch() as usize)?
        .safe_div(2)?;

    if vote_count.safe_mul(2)? > threshold {
        *state.eth1_data_mut() = *eth1_data;
    }

    Ok(())
}

fn process_operations<T: EthSpec, B: BlockOperations<T>>(
    state: &mut BeaconState<T>,
    body: &B,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    for proposer_slashing in body.proposer_slashings() {
        process_proposer_slashing(state, proposer_slashing, verify_signatures, spec)?;
    }
    for attester_slashing in body.attester_slashings() {
        process_attester_slashing(state, attester_slashing, verify_signatures, spec)?;
    }
    for attestation in body.attestations() {
        process_attestation(state, attestation, verify_signatures, spec)?;
    }
    for deposit in body.deposits() {
        process_deposit(state, deposit, spec)?;
    }
    for exit in body.voluntary_exits() {
        process_exit(state, exit, verify_signatures, spec)?;
    }
    Ok(())
}

/// Equivalent to the specification `process_proposer_slashing` function.
fn process_proposer_slashing<T: EthSpec>(
    state: &mut BeaconState<T>,
    proposer_slashing: &ProposerSlashing,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let header_1 = &proposer_slashing.signed_header_1.message;
    let header_2 = &proposer_slashing.signed_header_2.message;

    if header_1.slot != header_2.slot || header_1.proposer_index != header_2.proposer_index {
        return Err(BlockProcessingError::ProposerSlashingInvalid);
    }
    if header_1 == header_2 {
        return Err(BlockProcessingError::ProposerSlashingInvalid);
    }

    let proposer = state.get_validator(header_1.proposer_index as usize)?.clone();
    if proposer.slashed || !proposer.is_active_at(state.current_epoch()) {
        return Err(BlockProcessingError::ProposerSlashingInvalid);
    }

    if verify_signatures.verify_non_proposer() {
        let pubkey = proposer
            .pubkey
            .decompress()
            .map_err(|_| BlockProcessingError::BadSignature)?;
        for signed_header in [
            &proposer_slashing.signed_header_1,
            &proposer_slashing.signed_header_2,
        ] {
            use types::SignedRoot;
            let epoch = signed_header.message.slot.epoch(T::slots_per_epoch());
            let domain = spec.get_domain(
                epoch,
                Domain::BeaconProposer,
                &state.fork(),
                state.genesis_validators_root(),
            );
            let message = signed_header.message.signing_root(domain);
            if !signed_header.signature.verify(&pubkey, message.as_bytes()) {
                return Err(BlockProcessingError::BadSignature);
            }
        }
    }

    slash_validator(state, header_1.proposer_index as usize, None, spec)?;

    Ok(())
}

/// Equivalent to the specification `process_attester_slashing` function.
fn process_attester_slashing<T: EthSpec>(
    state: &mut BeaconState<T>,
    attester_slashing: &AttesterSlashing<T>,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let attestation_1 = &attester_slashing.attestation_1;
    let attestation_2 = &attester_slashing.attestation_2;

    if !attestation_1.is_double_vote(attestation_2) && !attestation_1.is_surround_vote(attestation_2)
    {
        return Err(BlockProcessingError::AttesterSlashingInvalid);
    }

    if verify_signatures.verify_non_proposer() {
        verify_indexed_attestation_signature(state, attestation_1, spec)?;
        verify_indexed_attestation_signature(state, attestation_2, spec)?;
    }

    let indices_2: std::collections::HashSet<u64> =
        attestation_2.attesting_indices.iter().copied().collect();
    let mut slashed_any = false;
    let mut slashable_indices: Vec<u64> = attestation_1
        .attesting_indices
        .iter()
        .copied()
        .filter(|i| indices_2.contains(i))
        .collect();
    slashable_indices.sort_unstable();

    for index in slashable_indices {
        let validator = state.get_validator(index as usize)?;
        if validator.slashed {
            continue;
        }
        if validator.is_active_at(state.current_epoch())
            || validator.is_active_at(state.previous_epoch())
        {
            slash_validator(state, index as usize, None, spec)?;
            slashed_any = true;
        }
    }

    if !slashed_any {
        return Err(BlockProcessingError::AttesterSlashingInvalid);
    }

    Ok(())
}

fn verify_indexed_attestation_signature<T: EthSpec>(
    state: &BeaconState<T>,
    indexed_attestation: &types::IndexedAttestation<T>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    use types::SignedRoot;
    let pubkeys: Vec<bls::PublicKey> = indexed_attestation
        .attesting_indices
        .iter()
        .map(|&index| {
            state
                .get_validator(index as usize)
                .map_err(BlockProcessingError::from)
                .and_then(|v| v.pubkey.decompress().map_err(|_| BlockProcessingError::BadSignature))
        })
        .collect::<Result<_, _>>()?;
    let pubkey_refs: Vec<&bls::PublicKey> = pubkeys.iter().collect();

    let domain = spec.get_domain(
        indexed_attestation.data.target.epoch,
        Domain::BeaconAttester,
        &state.fork(),
        state.genesis_validators_root(),
    );
    let message = indexed_attestation.data.signing_root(domain);

    if !indexed_attestation
        .signature
        .fast_aggregate_verify(message.as_bytes(), &pubkey_refs)
    {
        return Err(BlockProcessingError::BadSignature);
    }
    Ok(())
}

/// Equivalent to the specification `process_attestation` function; dispatches between the
/// base-fork `PendingAttestation` bookkeeping and the altair+ `ParticipationFlags` scheme.
fn process_attestation<T: EthSpec>(
    state: &mut BeaconState<T>,
    attestation: &types::Attestation<T>,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let data = &attestation.data;
    let committee = state.get_beacon_committee(data.slot, data.index)?;
    if attestation.aggregation_bits.len() != committee.committee.len() {
        return Err(BlockProcessingError::AttestationInvalid);
    }

    let current_epoch = state.current_epoch();
    let previous_epoch = state.previous_epoch();
    if data.target.epoch != current_epoch && data.target.epoch != previous_epoch {
        return Err(BlockProcessingError::AttestationInvalid);
    }
    if data.target.epoch != data.slot.epoch(T::slots_per_epoch()) {
        return Err(BlockProcessingError::AttestationInvalid);
    }
    if data.slot.safe_add(types::Slot::new(spec.min_attestation_inclusion_delay))? > state.slot() {
        return Err(BlockProcessingError::AttestationInvalid);
    }
    let expected_source = if data.target.epoch == current_epoch {
        state.current_justified_checkpoint()
    } else {
        state.previous_justified_checkpoint()
    };
    if data.source != *expected_source {
        return Err(BlockProcessingError::AttestationInvalid);
    }

    let indexed_attestation = get_indexed_attestation(&committee, attestation)?;

    if verify_signatures.verify_non_proposer() {
        verify_indexed_attestation_signature(state, &indexed_attestation, spec)?;
    }

    match state {
        BeaconState::Base(_) => {
            let proposer_index = state.get_beacon_proposer_index(state.slot(), spec)? as u64;
            let pending_attestation = types::PendingAttestation {
                aggregation_bits: attestation.aggregation_bits.clone(),
                data: data.clone(),
                inclusion_delay: state.slot().as_u64().safe_sub(data.slot.as_u64())?,
                proposer_index,
            };
            if data.target.epoch == current_epoch {
                state
                    .current_epoch_attestations_mut()?
                    .push(pending_attestation)
                    .map_err(BeaconStateError::from)?;
            } else {
                state
                    .previous_epoch_attestations_mut()?
                    .push(pending_attestation)
                    .map_err(BeaconStateError::from)?;
            }
        }
        BeaconState::Altair(_) | BeaconState::Bellatrix(_) => {
            process_altair_attestation_participation(state, &indexed_attestation, spec)?;
        }
    }

    Ok(())
}

fn get_indexed_attestation<T: EthSpec>(
    committee: &types::BeaconCommittee<'_>,
    attestation: &types::Attestation<T>,
) -> Result<types::IndexedAttestation<T>, BlockProcessingError> {
    let mut attesting_indices: Vec<u64> = committee
        .committee
        .iter()
        .enumerate()
        .filter(|(i, _)| attestation.aggregation_bits.get(*i).unwrap_or(false))
        .map(|(_, &validator_index)| validator_index as u64)
        .collect();
    attesting_indices.sort_unstable();

    Ok(types::IndexedAttestation {
        attesting_indices: types::VariableList::new(attesting_indices)
            .map_err(BeaconStateError::from)?,
        data: attestation.data.clone(),
        signature: attestation.signature.clone(),
    })
}

/// Equivalent to the specification's altair `process_attestation`: updates the touched
/// validators' current/previous `ParticipationFlags` according to source/target/head timeliness,
/// rewarding the proposer immediately rather than waiting for epoch processing.
fn process_altair_attestation_participation<T: EthSpec>(
    state: &mut BeaconState<T>,
    indexed_attestation: &types::IndexedAttestation<T>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    use types::consts::altair::{
        NUM_FLAG_INDICES, PROPOSER_WEIGHT, TIMELY_HEAD_FLAG_INDEX, TIMELY_SOURCE_FLAG_INDEX,
        TIMELY_TARGET_FLAG_INDEX, WEIGHT_DENOMINATOR,
    };

    let data = &indexed_attestation.data;
    let current_epoch = state.current_epoch();
    let is_current = data.target.epoch == current_epoch;

    let inclusion_delay = state.slot().as_u64().safe_sub(data.slot.as_u64())?;
    let is_matching_target = is_current
        && data.target.root == *state.get_block_root_at_epoch(current_epoch)?
        || !is_current
            && data.target.root == *state.get_block_root_at_epoch(state.previous_epoch())?;
    let is_matching_head =
        is_matching_target && data.beacon_block_root == *state.get_block_root(data.slot)?;

    let mut participation_flags = types::ParticipationFlags::default();
    if inclusion_delay <= integer_sqrt(spec.slots_per_epoch) {
        participation_flags.add_flag(TIMELY_SOURCE_FLAG_INDEX)?;
    }
    if is_matching_target && inclusion_delay <= spec.slots_per_epoch {
        participation_flags.add_flag(TIMELY_TARGET_FLAG_INDEX)?;
    }
    if is_matching_head && inclusion_delay == spec.min_attestation_inclusion_delay {
        participation_flags.add_flag(TIMELY_HEAD_FLAG_INDEX)?;
    }

    let proposer_index = state.get_beacon_proposer_index(state.slot(), spec)? as usize;

    for &validator_index in indexed_attestation.attesting_indices.iter() {
        let validator_index = validator_index as usize;
        let existing = if is_current {
            *state
                .current_epoch_participation()?
                .get(validator_index)
                .ok_or(BeaconStateError::ParticipationOutOfBounds(validator_index))?
        } else {
            *state
                .previous_epoch_participation()?
                .get(validator_index)
                .ok_or(BeaconStateError::ParticipationOutOfBounds(validator_index))?
        };

        let mut reward_numerator = 0u64;
        for flag_index in 0..NUM_FLAG_INDICES {
            if participation_flags.has_flag(flag_index)? && !existing.has_flag(flag_index)? {
                let weight = match flag_index {
                    i if i == TIMELY_SOURCE_FLAG_INDEX => {
                        types::consts::altair::TIMELY_SOURCE_WEIGHT
                    }
                    i if i == TIMELY_TARGET_FLAG_INDEX => {
                        types::consts::altair::TIMELY_TARGET_WEIGHT
                    }
                    _ => types::consts::altair::TIMELY_HEAD_WEIGHT,
                };
                let base_reward = base_reward_for(state, validator_index, spec)?;
                reward_numerator.safe_add_assign(base_reward.safe_mul(weight)?)?;
            }
        }

        let mut new_flags = existing;
        for flag_index in 0..NUM_FLAG_INDICES {
            if participation_flags.has_flag(flag_index)? {
                new_flags.add_flag(flag_index)?;
            }
        }
        if is_current {
            *state
                .current_epoch_participation_mut()?
                .get_mut(validator_index)
                .ok_or(BeaconStateError::ParticipationOutOfBounds(validator_index))? = new_flags;
        } else {
            *state
                .previous_epoch_participation_mut()?
                .get_mut(validator_index)
                .ok_or(BeaconStateError::ParticipationOutOfBounds(validator_index))? = new_flags;
        }

        if reward_numerator > 0 {
            let proposer_reward = reward_numerator
                .safe_div(WEIGHT_DENOMINATOR.safe_sub(PROPOSER_WEIGHT)?)?
                .safe_div(PROPOSER_WEIGHT)?
                .max(1);
            increase_balance(state, proposer_index, proposer_reward)?;
        }
    }

    Ok(())
}

fn base_reward_for<T: EthSpec>(
    state: &BeaconState<T>,
    validator_index: usize,
    spec: &ChainSpec,
) -> Result<u64, BlockProcessingError> {
    let total_active_balance = state
        .get_cached_active_validator_indices(types::RelativeEpoch::Current)?
        .iter()
        .try_fold(0u64, |acc, &i| -> Result<u64, BlockProcessingError> {
            Ok(acc.safe_add(state.get_effective_balance(i)?)?)
        })?
        .max(spec.effective_balance_increment);
    let sqrt = integer_sqrt(total_active_balance);
    let effective_balance = state.get_effective_balance(validator_index)?;
    Ok(effective_balance.safe_mul(spec.base_reward_factor)?.safe_div(sqrt)?)
}

fn integer_sqrt(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

pub(crate) use crate::genesis::DEPOSIT_CONTRACT_TREE_DEPTH;

/// Equivalent to the specification `process_deposit` function: verifies the deposit's Merkle
/// proof against `state.eth1_data.deposit_root`, then either tops up an existing validator's
/// balance or (if its signature verifies) registers a brand-new one.
///
/// `pub(crate)` rather than private: genesis construction (`crate::genesis`) calls this same
/// function per deposit, exactly as the specification's genesis procedure does.
pub(crate) fn process_deposit<T: EthSpec>(
    state: &mut BeaconState<T>,
    deposit: &Deposit,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    use tree_hash::TreeHash;

    let leaf = deposit.data.tree_hash_root();
    let deposit_index = state.eth1_deposit_index();
    if !verify_merkle_proof(
        leaf,
        &deposit.proof,
        DEPOSIT_CONTRACT_TREE_DEPTH + 1,
        deposit_index as usize,
        state.eth1_data().deposit_root,
    ) {
        return Err(BlockProcessingError::DepositInvalid);
    }

    *state.eth1_deposit_index_mut() = deposit_index.safe_add(1)?;

    let pubkey = deposit.data.pubkey;
    let existing = state
        .validators()
        .iter()
        .position(|v| v.pubkey == pubkey);

    match existing {
        Some(index) => {
            increase_balance(state, index, deposit.data.amount)?;
        }
        None => {
            use types::SignedRoot;
            let public_key = match pubkey.decompress() {
                Ok(pk) => pk,
                Err(_) => return Ok(()), // an unverifiable pubkey cannot be activated; spec treats this as a no-op, not an error
            };
            let domain = spec.compute_domain(
                Domain::Deposit,
                spec.genesis_fork_version,
                Hash256::zero(),
            );
            let message = deposit.data.signing_root(domain);
            if !deposit.data.signature.decompress().map_or(false, |sig| {
                sig.verify(&public_key, message.as_bytes())
            }) {
                return Ok(());
            }

            let validator = Validator::from_deposit(
                pubkey,
                deposit.data.withdrawal_credentials,
                deposit.data.amount,
                spec,
            );
            state
                .validators_mut()
                .push(validator)
                .map_err(BeaconStateError::from)?;
            state
                .balances_mut()
                .push(deposit.data.amount)
                .map_err(BeaconStateError::from)?;
            push_fresh_participation_and_inactivity_entries(state)?;
        }
    }

    Ok(())
}

/// Altair+ states keep one `ParticipationFlags`/`inactivity_scores` entry per validator; a
/// freshly-registered validator needs a matching zeroed entry in both.
fn push_fresh_participation_and_inactivity_entries<T: EthSpec>(
    state: &mut BeaconState<T>,
) -> Result<(), BlockProcessingError> {
    match state {
        BeaconState::Base(_) => Ok(()),
        BeaconState::Altair(_) | BeaconState::Bellatrix(_) => {
            state
                .previous_epoch_participation_mut()?
                .push(types::ParticipationFlags::default())
                .map_err(BeaconStateError::from)?;
            state
                .current_epoch_participation_mut()?
                .push(types::ParticipationFlags::default())
                .map_err(BeaconStateError::from)?;
            state
                .inactivity_scores_mut()?
                .push(0)
                .map_err(BeaconStateError::from)?;
            Ok(())
        }
    }
}

/// Equivalent to the specification `process_voluntary_exit` function (named `process_exit` here
/// to match the one already validated against `validator_client`'s usage).
fn process_exit<T: EthSpec>(
    state: &mut BeaconState<T>,
    signed_exit: &SignedVoluntaryExit,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    use types::SignedRoot;
    let exit = &signed_exit.message;
    let validator_index = exit.validator_index as usize;
    let validator = state.get_validator(validator_index)?.clone();
    let current_epoch = state.current_epoch();

    if !validator.is_active_at(current_epoch) {
        return Err(BlockProcessingError::ExitInvalid);
    }
    if validator.exit_epoch != Epoch::far_future() {
        return Err(BlockProcessingError::ExitInvalid);
    }
    if current_epoch < exit.epoch {
        return Err(BlockProcessingError::ExitInvalid);
    }
    if current_epoch
        < validator
            .activation_epoch
            .safe_add(Epoch::new(spec.persistent_committee_period))?
    {
        return Err(BlockProcessingError::ExitInvalid);
    }

    if verify_signatures.verify_non_proposer() {
        let pubkey = validator
            .pubkey
            .decompress()
            .map_err(|_| BlockProcessingError::BadSignature)?;
        let domain = spec.get_domain(
            exit.epoch,
            Domain::VoluntaryExit,
            &state.fork(),
            state.genesis_validators_root(),
        );
        let message = exit.signing_root(domain);
        if !signed_exit.signature.verify(&pubkey, message.as_bytes()) {
            return Err(BlockProcessingError::BadSignature);
        }
    }

    initiate_validator_exit(state, validator_index, spec)?;

    Ok(())
}

/// Equivalent to the specification `process_sync_aggregate` function: rewards/penalizes the
/// current sync committee by comparing `sync_committee_bits` against a `fast_aggregate_verify`
/// over the previous block's root.
fn process_sync_aggregate<T: EthSpec>(
    state: &mut BeaconState<T>,
    sync_aggregate: &SyncAggregate<T>,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let committee_pubkeys = state.current_sync_committee()?.pubkeys.clone();

    if verify_signatures.verify_non_proposer() {
        let participant_pubkeys: Vec<bls::PublicKey> = committee_pubkeys
            .iter()
            .enumerate()
            .filter(|(i, _)| sync_aggregate.sync_committee_bits.get(*i).unwrap_or(false))
            .map(|(_, pk)| pk.decompress().map_err(|_| BlockProcessingError::BadSignature))
            .collect::<Result<_, _>>()?;
        let pubkey_refs: Vec<&bls::PublicKey> = participant_pubkeys.iter().collect();

        let previous_slot = state.slot().saturating_sub(types::Slot::new(1));
        let domain = spec.get_domain(
            previous_slot.epoch(T::slots_per_epoch()),
            Domain::SyncCommittee,
            &state.fork(),
            state.genesis_validators_root(),
        );
        let signing_block_root = *state.get_block_root(previous_slot)?;
        #[derive(tree_hash_derive::TreeHash)]
        struct SigningData {
            object_root: Hash256,
            domain: Hash256,
        }
        use tree_hash::TreeHash;
        #[derive(tree_hash_derive::TreeHash)]
        struct RootWrapper {
            root: Hash256,
        }
        let message = SigningData {
            object_root: RootWrapper {
                root: signing_block_root,
            }
            .tree_hash_root(),
            domain,
        }
        .tree_hash_root();

        if !sync_aggregate
            .sync_committee_signature
            .fast_aggregate_verify(message.as_bytes(), &pubkey_refs)
        {
            return Err(BlockProcessingError::SyncAggregateInvalid);
        }
    }

    let total_active_increments = state
        .get_cached_active_validator_indices(types::RelativeEpoch::Current)?
        .iter()
        .try_fold(0u64, |acc, &i| -> Result<u64, BlockProcessingError> {
            Ok(acc.safe_add(state.get_effective_balance(i)?)?)
        })?
        .max(spec.effective_balance_increment)
        .safe_div(spec.effective_balance_increment)?;
    let total_base_reward = types::consts::altair::SYNC_REWARD_WEIGHT
        .safe_mul(total_active_increments)?
        .safe_div(integer_sqrt(
            total_active_increments.safe_mul(spec.effective_balance_increment)?,
        ))?
        .max(1);
    let max_participant_reward = total_base_reward
        .safe_div(types::consts::altair::WEIGHT_DENOMINATOR)?
        .safe_div(T::slots_per_epoch())?;
    let participant_reward = max_participant_reward
        .safe_mul(types::consts::altair::WEIGHT_DENOMINATOR.safe_sub(types::consts::altair::PROPOSER_WEIGHT)?)?
        .safe_div(types::consts::altair::WEIGHT_DENOMINATOR)?;
    let proposer_reward = max_participant_reward
        .safe_mul(types::consts::altair::PROPOSER_WEIGHT)?
        .safe_div(types::consts::altair::WEIGHT_DENOMINATOR.safe_sub(types::consts::altair::PROPOSER_WEIGHT)?)?;

    let proposer_index = state.get_beacon_proposer_index(state.slot(), spec)? as usize;
    let committee_size = committee_pubkeys.len();
    for i in 0..committee_size {
        let pubkey = committee_pubkeys[i];
        let validator_index = state
            .validators()
            .iter()
            .position(|v| v.pubkey == pubkey)
            .ok_or(BeaconStateError::UnknownValidator(0))?;
        if sync_aggregate.sync_committee_bits.get(i).unwrap_or(false) {
            increase_balance(state, validator_index, participant_reward)?;
            increase_balance(state, proposer_index, proposer_reward)?;
        } else {
            decrease_balance(state, validator_index, participant_reward)?;
        }
    }

    Ok(())
}
