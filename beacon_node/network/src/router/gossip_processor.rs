//! Provides the `GossipProcessor`, a multi-threaded processor for gossip messages that need to be
//! verified against the `BeaconChain` before they can be republished.
//!
//! Uses `tokio` tasks (instead of raw threads) to provide the following:
//!
//! - A "manager" task, which either spawns worker tasks or enqueues work.
//! - One or more "worker" tasks (run via `spawn_blocking`) which perform the actual,
//!   potentially-expensive verification work (BLS signature checks, state reads).
//!
//! ## Purpose
//!
//! 1. Moves long-running, blocking verification work off the main `tokio` executor so it doesn't
//!    clog up the networking stack and cause timeouts (spec.md §5).
//! 2. Provides a fixed-length buffer for gossip messages so load can be explicitly shed and
//!    distributed across time when overloaded, rather than growing unboundedly.
//!
//! There is only one kind of gossip-verification work in this workspace: unaggregated
//! attestations (this workspace has no separate aggregate/`SignedAggregateAndProof` gossip topic).

use crate::{metrics, service::NetworkMessage, sync::SyncMessage};
use beacon_chain::{
    AttestationError as AttnError, BeaconChain, BeaconChainTypes, VerifiedUnaggregatedAttestation,
};
use eth2_libp2p::config::ValidationResult;
use eth2_libp2p::{PeerId, SubnetId};
use slog::{crit, debug, trace, warn, Logger};
use std::collections::VecDeque;
use std::sync::Arc;
use task_executor::TaskExecutor;
use tokio::sync::mpsc;
use types::{Attestation, EthSpec, Hash256};

/// The maximum number of items that can be enqueued for the manager to process.
const MAX_WORK_QUEUE_LEN: usize = 65_535;

/// The maximum number of queued attestations that will be stored before new ones are dropped.
const MAX_ATTESTATION_QUEUE_LEN: usize = 16_384;

const MANAGER_TASK_NAME: &str = "beacon_gossip_processor_manager";
const WORKER_TASK_NAME: &str = "beacon_gossip_processor_worker";

/// A queued item from gossip, awaiting processing.
struct QueueItem<T> {
    message_id: Vec<u8>,
    peer_id: PeerId,
    item: T,
}

/// A simple last-in-first-out queue with a maximum length: under sustained overload, this favors
/// the most recently received message over one that's already stale by the time it would be
/// serviced.
struct LifoQueue<T> {
    queue: VecDeque<QueueItem<T>>,
    max_length: usize,
}

impl<T> LifoQueue<T> {
    pub fn new(max_length: usize) -> Self {
        Self {
            queue: VecDeque::default(),
            max_length,
        }
    }

    pub fn push(&mut self, item: QueueItem<T>) {
        if self.queue.len() == self.max_length {
            self.queue.pop_back();
        }
        self.queue.push_front(item);
    }

    pub fn pop(&mut self) -> Option<QueueItem<T>> {
        self.queue.pop_front()
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.max_length
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// An event to be processed by the manager task.
pub enum Event<E: EthSpec> {
    /// A worker has finished its work and is idle.
    WorkerIdle,
    Work {
        message_id: Vec<u8>,
        peer_id: PeerId,
        work: Work<E>,
    },
}

impl<E: EthSpec> Event<E> {
    pub fn attestation(
        message_id: Vec<u8>,
        peer_id: PeerId,
        attestation: Attestation<E>,
        subnet_id: SubnetId,
        should_import: bool,
    ) -> Self {
        Event::Work {
            message_id,
            peer_id,
            work: Work::Attestation(Box::new((attestation, subnet_id, should_import))),
        }
    }
}

/// A consensus message from gossip which requires verification against the chain.
pub enum Work<E: EthSpec> {
    Attestation(Box<(Attestation<E>, SubnetId, bool)>),
}

/// A multi-threaded processor for gossip messages that need to be verified by the `BeaconChain`.
/// See module docs for more.
pub struct GossipProcessor<T: BeaconChainTypes> {
    pub beacon_chain: Arc<BeaconChain<T>>,
    pub network_tx: mpsc::UnboundedSender<NetworkMessage<T::EthSpec>>,
    pub sync_tx: mpsc::UnboundedSender<SyncMessage<T::EthSpec>>,
    pub executor: TaskExecutor,
    pub max_workers: usize,
    pub current_workers: usize,
    pub log: Logger,
}

impl<T: BeaconChainTypes> GossipProcessor<T> {
    /// Spawns the manager task and returns the `Sender` callers use to enqueue gossip work. It is
    /// a logic error for a caller to send `Event::WorkerIdle` itself.
    pub fn spawn_manager(mut self) -> mpsc::Sender<Event<T::EthSpec>> {
        let (event_tx, mut event_rx) = mpsc::channel::<Event<T::EthSpec>>(MAX_WORK_QUEUE_LEN);
        let mut attestation_queue = LifoQueue::new(MAX_ATTESTATION_QUEUE_LEN);
        let inner_event_tx = event_tx.clone();
        let executor = self.executor.clone();

        executor.spawn(
            async move {
                while let Some(event) = event_rx.recv().await {
                    let _event_timer =
                        metrics::start_timer(&metrics::GOSSIP_PROCESSOR_EVENT_HANDLING_SECONDS);
                    metrics::inc_counter(&metrics::GOSSIP_PROCESSOR_EVENTS_TOTAL);

                    if matches!(event, Event::WorkerIdle) {
                        self.current_workers = self.current_workers.saturating_sub(1);
                    }

                    let can_spawn = self.current_workers < self.max_workers;
                    let initial_queue_len = attestation_queue.len();

                    match event {
                        Event::WorkerIdle => {
                            if let Some(item) = attestation_queue.pop() {
                                self.spawn_worker(
                                    inner_event_tx.clone(),
                                    item.message_id,
                                    item.peer_id,
                                    Work::Attestation(item.item),
                                );
                            }
                        }
                        Event::Work {
                            message_id,
                            peer_id,
                            work,
                        } => match work {
                            Work::Attestation(_) if can_spawn => {
                                self.spawn_worker(inner_event_tx.clone(), message_id, peer_id, work)
                            }
                            Work::Attestation(attestation) => attestation_queue.push(QueueItem {
                                message_id,
                                peer_id,
                                item: attestation,
                            }),
                        },
                    }

                    metrics::set_gauge(
                        &metrics::GOSSIP_PROCESSOR_WORKERS_ACTIVE_TOTAL,
                        self.current_workers as i64,
                    );
                    metrics::set_gauge(
                        &metrics::GOSSIP_PROCESSOR_ATTESTATION_QUEUE_TOTAL,
                        attestation_queue.len() as i64,
                    );

                    if initial_queue_len != attestation_queue.len() && attestation_queue.is_full() {
                        warn!(
                            self.log,
                            "Attestation queue full";
                            "msg" => "the system has insufficient resources for load",
                            "queue_len" => attestation_queue.max_length,
                        )
                    }
                }
            },
            MANAGER_TASK_NAME,
        );

        event_tx
    }

    /// Spawns a blocking worker to verify a single piece of gossip work, sending
    /// `Event::WorkerIdle` on `event_tx` when done.
    fn spawn_worker(
        &mut self,
        event_tx: mpsc::Sender<Event<T::EthSpec>>,
        message_id: Vec<u8>,
        peer_id: PeerId,
        work: Work<T::EthSpec>,
    ) {
        let worker_timer = metrics::start_timer(&metrics::GOSSIP_PROCESSOR_WORKER_TIME);
        metrics::inc_counter(&metrics::GOSSIP_PROCESSOR_WORKERS_SPAWNED_TOTAL);

        self.current_workers = self.current_workers.saturating_add(1);
        let chain = self.beacon_chain.clone();
        let network_tx = self.network_tx.clone();
        let sync_tx = self.sync_tx.clone();
        let log = self.log.clone();

        self.executor.spawn_blocking(
            move || {
                let _worker_timer = worker_timer;

                let Work::Attestation(boxed_tuple) = work;
                let (attestation, _subnet_id, should_import) = *boxed_tuple;

                let _attestation_timer =
                    metrics::start_timer(&metrics::GOSSIP_PROCESSOR_ATTESTATION_WORKER_TIME);
                metrics::inc_counter(&metrics::GOSSIP_PROCESSOR_ATTESTATION_VERIFIED_TOTAL);

                let beacon_block_root = attestation.data.beacon_block_root;

                let verified = match VerifiedUnaggregatedAttestation::verify(attestation, &chain) {
                    Ok(verified) => verified,
                    Err(e) => {
                        handle_attestation_verification_failure(
                            &log,
                            sync_tx,
                            peer_id.clone(),
                            beacon_block_root,
                            e,
                        );
                        event_tx.try_send(Event::WorkerIdle).unwrap_or_else(|e| {
                            crit!(log, "Unable to free worker"; "error" => e.to_string())
                        });
                        return;
                    }
                };

                propagate_gossip_message(network_tx, message_id, peer_id.clone(), &log);

                if should_import {
                    metrics::inc_counter(&metrics::GOSSIP_PROCESSOR_ATTESTATION_IMPORTED_TOTAL);
                    if let Err(e) = chain.process_attestation(verified.into_attestation()) {
                        debug!(
                            log,
                            "Attestation invalid for op pool/fork choice";
                            "reason" => format!("{:?}", e),
                            "peer" => peer_id.to_string(),
                            "beacon_block_root" => format!("{:?}", beacon_block_root),
                        );
                    }
                }

                event_tx.try_send(Event::WorkerIdle).unwrap_or_else(|e| {
                    crit!(log, "Unable to free worker"; "error" => e.to_string())
                });
            },
            WORKER_TASK_NAME,
        );
    }
}

/// Tells the network service that `message_id`, as received from `peer_id`, passed verification
/// and can be propagated (spec.md §4.9: gossipsub `Accept`).
fn propagate_gossip_message<E: EthSpec>(
    network_tx: mpsc::UnboundedSender<NetworkMessage<E>>,
    message_id: Vec<u8>,
    peer_id: PeerId,
    log: &Logger,
) {
    network_tx
        .send(NetworkMessage::Validate {
            propagation_source: peer_id,
            message_id,
            result: ValidationResult::Accept,
        })
        .unwrap_or_else(|_| {
            warn!(
                log,
                "Could not send propagation request to the network service"
            )
        });
}

/// Handles an error verifying an `Attestation` from gossip: logs it, forwards an unknown-block
/// hint to the sync manager, and leaves scoring to the caller (the router applies `Reject`/score
/// penalties for errors that indicate a faulty peer; the errors below that don't are commented
/// as such, mirroring the teacher's match-and-annotate style).
pub fn handle_attestation_verification_failure<E: EthSpec>(
    log: &Logger,
    sync_tx: mpsc::UnboundedSender<SyncMessage<E>>,
    peer_id: PeerId,
    beacon_block_root: Hash256,
    error: AttnError,
) {
    match &error {
        AttnError::FutureEpoch { .. }
        | AttnError::PastEpoch { .. }
        | AttnError::FutureSlot { .. }
        | AttnError::PastSlot { .. } => {
            // Can be triggered by a clock mismatch between us and the peer; not necessarily a
            // protocol violation.
        }
        AttnError::InvalidSignature | AttnError::NotExactlyOneAggregationBitSet(_) => {
            // The peer has published an invalid consensus message.
        }
        AttnError::NoCommitteeForSlotAndIndex { .. } => {
            // The peer has published an invalid consensus message.
        }
        AttnError::UnknownHeadBlock { beacon_block_root } => {
            trace!(
                log,
                "Attestation for unknown block";
                "peer_id" => peer_id.to_string(),
                "block" => format!("{}", beacon_block_root),
            );
            sync_tx
                .send(SyncMessage::UnknownBlockHash(peer_id, *beacon_block_root))
                .unwrap_or_else(|_| {
                    warn!(log, "Failed to send to sync service"; "msg" => "UnknownBlockHash")
                });
            return;
        }
        AttnError::BeaconChainError(e) => {
            // Lighthouse hit an unexpected error while processing the attestation; not clear
            // whether the peer's message was actually invalid.
            warn!(log, "Unable to validate attestation"; "peer_id" => peer_id.to_string(), "error" => format!("{:?}", e));
        }
    }

    debug!(
        log,
        "Invalid attestation from network";
        "reason" => format!("{:?}", error),
        "block" => format!("{}", beacon_block_root),
        "peer_id" => peer_id.to_string(),
    );
}
