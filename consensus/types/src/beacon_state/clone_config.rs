/// Controls which caches survive a `BeaconState::clone_with`. Fork choice and the attestation
/// pool frequently need a cheap clone of just the bare state (no caches); epoch processing wants
/// every cache carried over.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct CloneConfig {
    pub committee_caches: bool,
    pub current_sync_committee_cache: bool,
    pub pubkey_cache: bool,
    pub exit_cache: bool,
    pub tree_hash_cache: bool,
}

impl CloneConfig {
    pub fn all() -> Self {
        Self {
            committee_caches: true,
            current_sync_committee_cache: true,
            pubkey_cache: true,
            exit_cache: true,
            tree_hash_cache: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}
