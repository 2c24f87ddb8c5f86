use crate::{Domain, Epoch, Fork, ForkName, GenesisValidatorsRoot, Hash256};
use tree_hash::TreeHash;

/// Every runtime constant that varies between network profiles (mainnet, minimal, a custom
/// devnet) lives here, built once at startup and passed by value through every layer (§9:
/// "immutable after startup... no process-wide mutable singletons").
#[derive(PartialEq, Debug, Clone)]
pub struct ChainSpec {
    /*
     * Misc
     */
    pub max_committees_per_slot: usize,
    pub target_committee_size: usize,
    pub min_per_epoch_churn_limit: u64,
    pub churn_limit_quotient: u64,
    pub shuffle_round_count: u8,

    /*
     * Gwei values
     */
    pub min_deposit_amount: u64,
    pub max_effective_balance: u64,
    pub ejection_balance: u64,
    pub effective_balance_increment: u64,

    /*
     * Time parameters
     */
    pub genesis_slot: crate::Slot,
    pub seconds_per_slot: u64,
    pub min_attestation_inclusion_delay: u64,
    pub slots_per_epoch: u64,
    pub min_seed_lookahead: Epoch,
    pub max_seed_lookahead: Epoch,
    pub min_epochs_to_inactivity_penalty: u64,
    pub min_validator_withdrawability_delay: Epoch,
    pub persistent_committee_period: u64,
    pub epochs_per_sync_committee_period: u64,

    /*
     * Reward and penalty quotients
     */
    pub base_reward_factor: u64,
    pub whistleblower_reward_quotient: u64,
    pub proposer_reward_quotient: u64,
    pub inactivity_penalty_quotient: u64,
    pub min_slashing_penalty_quotient: u64,
    pub inactivity_score_bias: u64,
    pub inactivity_score_recovery_rate: u64,

    /*
     * Signature domains
     */
    pub domain_beacon_proposer: u32,
    pub domain_beacon_attester: u32,
    pub domain_randao: u32,
    pub domain_deposit: u32,
    pub domain_voluntary_exit: u32,
    pub domain_selection_proof: u32,
    pub domain_aggregate_and_proof: u32,
    pub domain_sync_committee: u32,
    pub domain_sync_committee_selection_proof: u32,
    pub domain_contribution_and_proof: u32,

    /*
     * Fork schedule
     */
    pub genesis_fork_version: [u8; 4],
    pub altair_fork_version: [u8; 4],
    pub altair_fork_epoch: Option<Epoch>,
    pub bellatrix_fork_version: [u8; 4],
    pub bellatrix_fork_epoch: Option<Epoch>,

    /*
     * Networking
     */
    pub boot_nodes: Vec<String>,
    pub network_id: u8,
    pub attestation_propagation_slot_range: u64,
    pub maximum_gossip_clock_disparity_millis: u64,
    pub target_aggregators_per_committee: u64,

    /*
     * Deposit contract
     */
    pub bls_withdrawal_prefix_byte: u8,
    pub deposit_contract_tree_depth: u8,
}

impl ChainSpec {
    /// Returns the fork active at `epoch`, by walking the schedule from latest to earliest.
    pub fn fork_name_at_epoch(&self, epoch: Epoch) -> ForkName {
        match self.bellatrix_fork_epoch {
            Some(fork_epoch) if epoch >= fork_epoch => return ForkName::Bellatrix,
            _ => {}
        }
        match self.altair_fork_epoch {
            Some(fork_epoch) if epoch >= fork_epoch => return ForkName::Altair,
            _ => {}
        }
        ForkName::Base
    }

    pub fn fork_version_for_name(&self, fork_name: ForkName) -> [u8; 4] {
        match fork_name {
            ForkName::Base => self.genesis_fork_version,
            ForkName::Altair => self.altair_fork_version,
            ForkName::Bellatrix => self.bellatrix_fork_version,
        }
    }

    fn get_domain_constant(&self, domain: Domain) -> u32 {
        match domain {
            Domain::BeaconProposer => self.domain_beacon_proposer,
            Domain::BeaconAttester => self.domain_beacon_attester,
            Domain::Randao => self.domain_randao,
            Domain::Deposit => self.domain_deposit,
            Domain::VoluntaryExit => self.domain_voluntary_exit,
            Domain::SelectionProof => self.domain_selection_proof,
            Domain::AggregateAndProof => self.domain_aggregate_and_proof,
            Domain::SyncCommittee => self.domain_sync_committee,
            Domain::SyncCommitteeSelectionProof => self.domain_sync_committee_selection_proof,
            Domain::ContributionAndProof => self.domain_contribution_and_proof,
        }
    }

    /// `compute_domain`: deposits and the genesis fork are exempt from the genesis-validators-
    /// root mixing applied to every other domain.
    pub fn compute_domain(
        &self,
        domain: Domain,
        fork_version: [u8; 4],
        genesis_validators_root: GenesisValidatorsRoot,
    ) -> Hash256 {
        let domain_constant = self.get_domain_constant(domain);

        let mut bytes = [0; 32];
        bytes[0..4].copy_from_slice(&int_to_bytes4(domain_constant));
        bytes[4..].copy_from_slice(
            &Self::compute_fork_data_root(fork_version, genesis_validators_root)[..28],
        );

        Hash256::from(bytes)
    }

    /// `get_domain`: resolves the fork version active at `epoch` against `fork` before mixing.
    pub fn get_domain(
        &self,
        epoch: Epoch,
        domain: Domain,
        fork: &Fork,
        genesis_validators_root: GenesisValidatorsRoot,
    ) -> Hash256 {
        let fork_version = if epoch < fork.epoch {
            fork.previous_version
        } else {
            fork.current_version
        };
        self.compute_domain(domain, fork_version, genesis_validators_root)
    }

    fn compute_fork_data_root(
        current_version: [u8; 4],
        genesis_validators_root: GenesisValidatorsRoot,
    ) -> Hash256 {
        #[derive(tree_hash_derive::TreeHash)]
        struct ForkData {
            current_version: [u8; 4],
            genesis_validators_root: Hash256,
        }

        ForkData {
            current_version,
            genesis_validators_root,
        }
        .tree_hash_root()
    }

    pub fn mainnet() -> Self {
        Self {
            max_committees_per_slot: 64,
            target_committee_size: 128,
            min_per_epoch_churn_limit: 4,
            churn_limit_quotient: 65_536,
            shuffle_round_count: 90,

            min_deposit_amount: u64::pow(2, 0) * u64::pow(10, 9),
            max_effective_balance: 32_000_000_000,
            ejection_balance: 16_000_000_000,
            effective_balance_increment: 1_000_000_000,

            genesis_slot: crate::Slot::new(0),
            seconds_per_slot: 12,
            min_attestation_inclusion_delay: 1,
            slots_per_epoch: 32,
            min_seed_lookahead: Epoch::new(1),
            max_seed_lookahead: Epoch::new(4),
            min_epochs_to_inactivity_penalty: 4,
            min_validator_withdrawability_delay: Epoch::new(256),
            persistent_committee_period: 2_048,
            epochs_per_sync_committee_period: 256,

            base_reward_factor: 64,
            whistleblower_reward_quotient: 512,
            proposer_reward_quotient: 8,
            inactivity_penalty_quotient: 67_108_864,
            min_slashing_penalty_quotient: 128,
            inactivity_score_bias: 4,
            inactivity_score_recovery_rate: 16,

            domain_beacon_proposer: 0x0000_0000,
            domain_beacon_attester: 0x0100_0000,
            domain_randao: 0x0200_0000,
            domain_deposit: 0x0300_0000,
            domain_voluntary_exit: 0x0400_0000,
            domain_selection_proof: 0x0500_0000,
            domain_aggregate_and_proof: 0x0600_0000,
            domain_sync_committee: 0x0700_0000,
            domain_sync_committee_selection_proof: 0x0800_0000,
            domain_contribution_and_proof: 0x0900_0000,

            genesis_fork_version: [0x00, 0x00, 0x00, 0x00],
            altair_fork_version: [0x01, 0x00, 0x00, 0x00],
            altair_fork_epoch: Some(Epoch::new(74_240)),
            bellatrix_fork_version: [0x02, 0x00, 0x00, 0x00],
            bellatrix_fork_epoch: Some(Epoch::new(144_896)),

            boot_nodes: vec![],
            network_id: 1,
            attestation_propagation_slot_range: 32,
            maximum_gossip_clock_disparity_millis: 500,
            target_aggregators_per_committee: 16,

            bls_withdrawal_prefix_byte: 0x00,
            deposit_contract_tree_depth: 32,
        }
    }

    pub fn minimal() -> Self {
        let mut spec = ChainSpec::mainnet();
        spec.max_committees_per_slot = 4;
        spec.target_committee_size = 4;
        spec.shuffle_round_count = 10;
        spec.slots_per_epoch = 8;
        spec.epochs_per_sync_committee_period = 8;
        spec.min_seed_lookahead = Epoch::new(1);
        spec.max_seed_lookahead = Epoch::new(4);
        spec.altair_fork_epoch = None;
        spec.bellatrix_fork_epoch = None;
        spec.network_id = 2;
        spec
    }
}

fn int_to_bytes4(int: u32) -> [u8; 4] {
    int.to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_schedule_is_ordered() {
        let spec = ChainSpec::mainnet();
        assert!(spec.altair_fork_epoch.unwrap() < spec.bellatrix_fork_epoch.unwrap());
        assert_eq!(spec.fork_name_at_epoch(Epoch::new(0)), ForkName::Base);
        assert_eq!(
            spec.fork_name_at_epoch(spec.altair_fork_epoch.unwrap()),
            ForkName::Altair
        );
        assert_eq!(
            spec.fork_name_at_epoch(spec.bellatrix_fork_epoch.unwrap()),
            ForkName::Bellatrix
        );
    }

    #[test]
    fn minimal_has_no_altair_scheduled() {
        let spec = ChainSpec::minimal();
        assert_eq!(spec.fork_name_at_epoch(Epoch::new(1_000_000)), ForkName::Base);
    }
}
