//! The top-level facade (§4 overview): owns the database handle, the block DAG (C4), the
//! quarantine (C6), fork choice (C5) and the operation pool (C7), and is the only thing in the
//! workspace that is allowed to drive a block or attestation through the full import pipeline.

use crate::beacon_fork_choice_store::BeaconForkChoiceStore;
use crate::block_dag::{self, BlockDag};
use crate::chain_config::ChainConfig;
use crate::eth1_chain::Eth1Chain;
use crate::metrics;
use crate::naive_aggregation_pool::NaiveAggregationPool;
use crate::quarantine::Quarantine;
use crate::BeaconChainError as Error;

use fork_choice::{ForkChoice, ForkChoiceStore};
use operation_pool::OperationPool;
use parking_lot::RwLock;
use slog::{info, Logger};
use slot_clock::SlotClock;
use state_processing::{per_block_processing, per_slot_processing, state_transition, VerifySignatures};
use std::sync::Arc;
use std::time::Duration;
use store::Store;
use types::{
    Attestation, AttesterSlashing, BeaconBlock, BeaconState, ChainSpec, EthSpec, Hash256,
    ProposerSlashing, SignedBeaconBlock, SignedVoluntaryExit, Slot,
};

/// The timeout clock-disparity checks (gossip attestation propagation windows, etc) are allowed,
/// mirroring the real network's tolerance for slightly-skewed peer clocks.
pub const MAXIMUM_GOSSIP_CLOCK_DISPARITY: Duration = Duration::from_millis(500);

/// Everything needed to assemble a concrete `BeaconChain<T>`: which `Store`, `SlotClock` and
/// `EthSpec` it is built from. Kept as a bare marker trait (no methods of its own) so every other
/// module can write `T: BeaconChainTypes` once and get all three associated types at once.
pub trait BeaconChainTypes: Send + Sync + 'static {
    type Store: Store<Self::EthSpec> + Send + Sync + 'static;
    type SlotClock: SlotClock + Send + Sync + 'static;
    type EthSpec: EthSpec + Send + Sync + 'static;
}

pub type BeaconForkChoice<T> =
    ForkChoice<BeaconForkChoiceStore<<T as BeaconChainTypes>::EthSpec, <T as BeaconChainTypes>::Store>, <T as BeaconChainTypes>::EthSpec>;

/// The block+state pair the chain currently considers canonical, as selected by the last call to
/// fork choice's `get_head`.
pub struct CheckPoint<E: EthSpec> {
    pub beacon_block: SignedBeaconBlock<E>,
    pub beacon_block_root: Hash256,
    pub beacon_state: BeaconState<E>,
    pub beacon_state_root: Hash256,
}

/// Outcome of importing a single block, so the caller (chain-segment processing, or the gossip
/// handler) can tell a fully-applied import apart from one that merely got queued.
#[derive(Debug)]
pub enum BlockImportStatus {
    /// The block was imported and is (or may become, pending `update_head`) part of the DAG.
    Imported(Hash256),
    /// The block's parent hasn't arrived yet; it has been placed in the quarantine (C6).
    Quarantined(Hash256),
}

pub struct BeaconChain<T: BeaconChainTypes> {
    pub spec: ChainSpec,
    pub store: Arc<T::Store>,
    pub slot_clock: T::SlotClock,
    pub log: Logger,
    pub chain_config: ChainConfig,
    pub genesis_validators_root: Hash256,
    pub op_pool: OperationPool<T::EthSpec>,
    pub naive_aggregation_pool: RwLock<NaiveAggregationPool<T::EthSpec>>,
    pub eth1_chain: Option<Box<dyn Eth1Chain<T> + Send + Sync>>,
    pub fork_choice: RwLock<BeaconForkChoice<T>>,
    pub dag: RwLock<BlockDag<T::EthSpec>>,
    pub quarantine: RwLock<Quarantine<T::EthSpec>>,
    canonical_head: RwLock<CheckPoint<T::EthSpec>>,
}

impl<T: BeaconChainTypes> BeaconChain<T> {
    /// Bootstraps a brand new chain from a genesis state, persisting the genesis block/state and
    /// initialising fork choice and the DAG with it as their single root.
    pub fn from_genesis(
        store: Arc<T::Store>,
        slot_clock: T::SlotClock,
        eth1_chain: Option<Box<dyn Eth1Chain<T> + Send + Sync>>,
        mut genesis_state: BeaconState<T::EthSpec>,
        genesis_block: BeaconBlock<T::EthSpec>,
        chain_config: ChainConfig,
        spec: ChainSpec,
        log: Logger,
    ) -> Result<Self, Error> {
        genesis_state.build_all_caches(&spec)?;
        let genesis_state_root = genesis_state.update_tree_hash_cache()?;

        let signed_genesis_block = SignedBeaconBlock {
            message: genesis_block,
            signature: types::Signature::empty(),
        };
        let genesis_block_root = signed_genesis_block.canonical_root();

        store.put_state(&genesis_state_root, &genesis_state)?;
        store.put_block(&genesis_block_root, signed_genesis_block.clone())?;

        let fc_store =
            BeaconForkChoiceStore::get_forkchoice_store(store.clone(), &genesis_state);
        let fork_choice = ForkChoice::from_genesis(
            fc_store,
            genesis_block_root,
            &signed_genesis_block.message,
            &genesis_state,
        )
        .map_err(|e| Error::ForkChoiceError(e))?;

        let dag = BlockDag::new(
            genesis_block_root,
            types::BlockSummary::new(genesis_state.slot(), Hash256::zero()),
        );

        let genesis_validators_root = genesis_state.genesis_validators_root();

        info!(log, "Beacon chain initialized from genesis"; "genesis_root" => ?genesis_block_root);

        Ok(Self {
            spec,
            store,
            slot_clock,
            log,
            chain_config,
            genesis_validators_root,
            op_pool: OperationPool::new(),
            naive_aggregation_pool: RwLock::new(NaiveAggregationPool::default()),
            eth1_chain,
            fork_choice: RwLock::new(fork_choice),
            dag: RwLock::new(dag),
            quarantine: RwLock::new(Quarantine::new()),
            canonical_head: RwLock::new(CheckPoint {
                beacon_block: signed_genesis_block,
                beacon_block_root: genesis_block_root,
                beacon_state: genesis_state,
                beacon_state_root: genesis_state_root,
            }),
        })
    }

    /// The slot the chain's clock currently reports, or an error if run before genesis.
    pub fn slot(&self) -> Result<Slot, Error> {
        self.slot_clock.now().ok_or(Error::SlotClockDidNotStart)
    }

    pub fn canonical_head_block_root(&self) -> Hash256 {
        self.canonical_head.read().beacon_block_root
    }

    pub fn head(&self) -> impl std::ops::Deref<Target = CheckPoint<T::EthSpec>> + '_ {
        self.canonical_head.read()
    }

    /// Clones the canonical head state, advanced (but not mutated in place) to `slot` if it isn't
    /// already there. Used by both attestation production and block production, neither of which
    /// may mutate the real head state in place.
    pub fn state_at_slot(&self, slot: Slot) -> Result<BeaconState<T::EthSpec>, Error> {
        let head = self.canonical_head.read();
        let mut state = head.beacon_state.clone();
        drop(head);
        if state.slot() < slot {
            per_slot_processing(&mut state, None, &self.spec).map_err(state_processing::Error::from)?;
            while state.slot() < slot {
                per_slot_processing(&mut state, None, &self.spec)
                    .map_err(state_processing::Error::from)?;
            }
        }
        Ok(state)
    }

    /// Imports a single block: applies the state transition, persists the result, threads it into
    /// the DAG and fork choice, and re-runs `get_head`. A block whose parent is unknown is
    /// quarantined instead (C6) and `process_chain_segment` is responsible for draining it back in
    /// once that parent does arrive.
    pub fn process_block(
        &self,
        block: SignedBeaconBlock<T::EthSpec>,
    ) -> Result<BlockImportStatus, Error> {
        let _timer = metrics::start_timer(&metrics::BLOCK_PROCESSING_TIMES);

        let block_root = block.canonical_root();
        let parent_root = block.message.parent_root();

        if self.dag.read().is_unviable(&block_root) {
            return Err(Error::BlockIsNotLaterThanParent {
                block_slot: block.message.slot(),
                parent_slot: block.message.slot(),
            });
        }
        if self.dag.read().contains(&block_root) {
            return Ok(BlockImportStatus::Imported(block_root));
        }
        if !self.dag.read().contains(&parent_root) {
            self.quarantine.write().insert(block_root, block);
            return Ok(BlockImportStatus::Quarantined(block_root));
        }

        self.import_block_with_known_parent(block_root, block)?;
        self.drain_quarantine(block_root)?;
        Ok(BlockImportStatus::Imported(block_root))
    }

    /// Imports every block in `blocks`, in order, tolerating (and quarantining) any whose parent
    /// hasn't been seen yet among blocks processed so far in the same call.
    pub fn process_chain_segment(
        &self,
        blocks: Vec<SignedBeaconBlock<T::EthSpec>>,
    ) -> Vec<Result<BlockImportStatus, Error>> {
        blocks
            .into_iter()
            .map(|block| self.process_block(block))
            .collect()
    }

    fn import_block_with_known_parent(
        &self,
        block_root: Hash256,
        block: SignedBeaconBlock<T::EthSpec>,
    ) -> Result<(), Error> {
        let parent_root = block.message.parent_root();
        let parent_state_root = self
            .store
            .get_block(&parent_root)?
            .ok_or(Error::MissingBeaconBlock(parent_root))?
            .message
            .state_root();

        let mut state = self
            .store
            .get_state(&parent_state_root, None)?
            .ok_or(Error::MissingBeaconState(parent_state_root))?;

        if block.message.slot() <= state.slot() {
            return Err(Error::BlockIsNotLaterThanParent {
                block_slot: block.message.slot(),
                parent_slot: state.slot(),
            });
        }

        state_transition(&mut state, &block, VerifySignatures::True, &self.spec)?;
        state.build_all_caches(&self.spec)?;
        let state_root = state.update_tree_hash_cache()?;

        self.store.put_block(&block_root, block.clone())?;
        self.store.put_state(&state_root, &state)?;

        match self.dag.write().add_block(block_root, block.message.slot(), parent_root) {
            Ok(()) => {}
            // Another call already spliced this exact block in between our containment check
            // and now; nothing left to do.
            Err(block_dag::Error::Duplicate(_)) => return Ok(()),
            Err(block_dag::Error::Unviable) => {
                return Err(Error::BlockIsNotLaterThanParent {
                    block_slot: block.message.slot(),
                    parent_slot: state.slot(),
                })
            }
            Err(block_dag::Error::MissingParent(root)) => return Err(Error::UnknownParent(root)),
            Err(block_dag::Error::DBError(e)) => return Err(Error::DBError(e)),
        }

        self.fork_choice
            .write()
            .on_block(self.slot()?, &block.message, block_root, &state)
            .map_err(Error::ForkChoiceError)?;

        self.update_head()?;
        self.op_pool.prune_all(&state);

        Ok(())
    }

    /// Drains and imports every quarantined block that was waiting on `newly_known_root`,
    /// recursively, so a whole chain of blocks that arrived out of order gets spliced in as soon
    /// as its root finally shows up.
    fn drain_quarantine(&self, newly_known_root: Hash256) -> Result<(), Error> {
        let mut frontier = vec![newly_known_root];
        while let Some(root) = frontier.pop() {
            let children = self.quarantine.write().drain_children(root);
            for (child_root, child_block) in children {
                match self.import_block_with_known_parent(child_root, child_block) {
                    Ok(()) => frontier.push(child_root),
                    Err(_) => {
                        self.dag.write().mark_unviable_with_descendants(child_root);
                        self.quarantine.write().discard_descendants(child_root);
                    }
                }
            }
        }
        metrics::set_gauge(&metrics::QUARANTINE_SIZE, self.quarantine.read().len() as i64);
        Ok(())
    }

    /// Re-runs `get_head` and, if it changed, updates the canonical head snapshot and prunes the
    /// DAG/pools to the new finalized checkpoint.
    fn update_head(&self) -> Result<(), Error> {
        let _timer = metrics::start_timer(&metrics::FORK_CHOICE_HEAD_TIMES);
        let current_slot = self.slot().unwrap_or_else(|_| self.canonical_head.read().beacon_block.message.slot());
        let head_root = self
            .fork_choice
            .write()
            .get_head(current_slot)
            .map_err(Error::ForkChoiceError)?;

        if head_root == self.canonical_head.read().beacon_block_root {
            return Ok(());
        }

        let head_block = self
            .store
            .get_block(&head_root)?
            .ok_or(Error::MissingBeaconBlock(head_root))?;
        let head_state_root = head_block.message.state_root();
        let head_state = self
            .store
            .get_state(&head_state_root, Some(head_block.message.slot()))?
            .ok_or(Error::MissingBeaconState(head_state_root))?;

        metrics::set_gauge(&metrics::HEAD_SLOT, head_block.message.slot().as_u64() as i64);
        metrics::set_gauge(
            &metrics::FINALIZED_EPOCH,
            head_state.finalized_checkpoint().epoch.as_u64() as i64,
        );
        metrics::set_gauge(
            &metrics::CURRENT_JUSTIFIED_EPOCH,
            head_state.current_justified_checkpoint().epoch.as_u64() as i64,
        );

        let finalized_root = self.fork_choice.read().fc_store().finalized_checkpoint().root;
        *self.canonical_head.write() = CheckPoint {
            beacon_block: head_block,
            beacon_block_root: head_root,
            beacon_state: head_state,
            beacon_state_root: head_state_root,
        };
        if finalized_root != Hash256::zero() {
            self.dag.write().prune_to(finalized_root);
        }

        Ok(())
    }

    /// Inserts a gossiped/API-submitted attestation into the operation pool and, if its target
    /// block is known, immediately feeds it to fork choice too.
    pub fn process_attestation(&self, attestation: Attestation<T::EthSpec>) -> Result<(), Error> {
        let _timer = metrics::start_timer(&metrics::ATTESTATION_PROCESSING_TIMES);
        let head = self.canonical_head.read();
        let indexed = indexed_attestation(&head.beacon_state, &attestation, &self.spec)?;
        drop(head);

        self.op_pool.insert_attestation(attestation)?;
        self.fork_choice
            .write()
            .on_attestation(self.slot()?, &indexed)
            .map_err(Error::ForkChoiceError)?;
        Ok(())
    }

    pub fn process_proposer_slashing(&self, slashing: ProposerSlashing) -> Result<(), Error> {
        Ok(self.op_pool.insert_proposer_slashing(slashing)?)
    }

    pub fn process_attester_slashing(
        &self,
        slashing: AttesterSlashing<T::EthSpec>,
    ) -> Result<(), Error> {
        Ok(self.op_pool.insert_attester_slashing(slashing)?)
    }

    pub fn process_voluntary_exit(&self, exit: SignedVoluntaryExit) {
        self.op_pool.insert_voluntary_exit(exit);
    }

    /// Assembles (but does not sign) a new block for `slot`, pulling operations from the pool and
    /// eth1 data from `self.eth1_chain`, atop the canonical head. The caller (the validator client)
    /// is responsible for the RANDAO reveal and the final proposer signature.
    pub fn produce_block(
        &self,
        randao_reveal: bls::Signature,
        slot: Slot,
        graffiti: types::Graffiti,
    ) -> Result<BeaconBlock<T::EthSpec>, Error> {
        let _timer = metrics::start_timer(&metrics::BLOCK_PRODUCTION_TIMES);

        let parent_root = self.canonical_head_block_root();
        let state = self.state_at_slot(slot)?;

        let eth1_data = match &self.eth1_chain {
            Some(chain) => chain
                .eth1_data_for_epoch(&state)
                .unwrap_or_else(|_| state.eth1_data().clone()),
            None => state.eth1_data().clone(),
        };

        let proposer_slashings = self.op_pool.get_proposer_slashings(&state);
        let attester_slashings = self.op_pool.get_attester_slashings(&state);
        let attestations = self.op_pool.get_attestations(&state, &self.spec);
        let voluntary_exits = self.op_pool.get_voluntary_exits(&state);
        if let Ok(histogram) = &*metrics::OPERATIONS_PER_BLOCK_ATTESTATION {
            histogram.observe(attestations.len() as f64);
        }

        let proposer_index = state.get_beacon_proposer_index(slot, &self.spec)? as u64;

        let mut block = BeaconBlock::Base(types::BeaconBlockBase {
            slot,
            proposer_index,
            parent_root,
            state_root: Hash256::zero(),
            body: types::BeaconBlockBodyBase {
                randao_reveal,
                eth1_data,
                graffiti,
                proposer_slashings: types::VariableList::new(proposer_slashings).unwrap_or_else(|_| types::VariableList::empty()),
                attester_slashings: types::VariableList::new(attester_slashings).unwrap_or_else(|_| types::VariableList::empty()),
                attestations: types::VariableList::new(attestations).unwrap_or_else(|_| types::VariableList::empty()),
                deposits: types::VariableList::empty(),
                voluntary_exits: types::VariableList::new(voluntary_exits).unwrap_or_else(|_| types::VariableList::empty()),
            },
        });

        let mut draft_state = state.clone();
        let draft_block = SignedBeaconBlock {
            message: block.clone(),
            signature: bls::Signature::empty(),
        };
        per_block_processing(
            &mut draft_state,
            &draft_block,
            VerifySignatures::False,
            &self.spec,
        )
        .map_err(Error::BlockProcessingError)?;
        draft_state.build_all_caches(&self.spec)?;
        *block.state_root_mut() = draft_state.update_tree_hash_cache()?;

        Ok(block)
    }
}

/// Expands a committee-indexed `Attestation` into the validator-indexed `IndexedAttestation` fork
/// choice and the slashing pool both key on, the same committee-lookup-then-filter shape
/// `per_block_processing`'s own (private) `get_indexed_attestation` uses during block processing.
fn indexed_attestation<T: EthSpec>(
    state: &BeaconState<T>,
    attestation: &Attestation<T>,
    _spec: &ChainSpec,
) -> Result<types::IndexedAttestation<T>, Error> {
    let committee = state.get_beacon_committee(attestation.data.slot, attestation.data.index)?;

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
            .map_err(types::BeaconStateError::from)?,
        data: attestation.data.clone(),
        signature: attestation.signature.clone(),
    })
}
