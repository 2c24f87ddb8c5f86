/// One of the `DOMAIN_*` constants used to salt a signing root so that a signature produced for
/// one purpose (e.g. a block) cannot be replayed as a signature for another (e.g. an attestation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    BeaconProposer,
    BeaconAttester,
    Randao,
    Deposit,
    VoluntaryExit,
    SelectionProof,
    AggregateAndProof,
    SyncCommittee,
    SyncCommitteeSelectionProof,
    ContributionAndProof,
}
