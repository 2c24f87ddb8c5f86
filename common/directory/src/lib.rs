//! Where a node's on-disk state lives: `$HOME/.lighthouse/<network>/{beacon,validators}`, unless
//! overridden on the CLI. Kept as one small crate since `client`, `validator_client`, and the
//! `lighthouse` binary all need to agree on the same layout without depending on each other.

use std::fs;
use std::path::PathBuf;

pub const DEFAULT_ROOT_DIR: &str = ".lighthouse";
pub const DEFAULT_BEACON_NODE_DIR: &str = "beacon";
pub const DEFAULT_VALIDATOR_DIR: &str = "validators";
pub const DEFAULT_SECRET_DIR: &str = "secrets";

/// `$HOME/.lighthouse`, or `.` if the home directory can't be resolved (e.g. inside certain
/// sandboxes) — better to fall back to the current directory than to refuse to start.
pub fn default_root_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_ROOT_DIR)
}

/// The directory a beacon node or validator client should use for a given network, honoring an
/// explicit override if the user gave one.
pub fn get_network_dir(base_dir: Option<PathBuf>, network_name: &str, leaf: &str) -> PathBuf {
    base_dir
        .unwrap_or_else(default_root_dir)
        .join(network_name)
        .join(leaf)
}

/// Creates `dir` (and any missing parents) if it doesn't already exist; a no-op otherwise.
pub fn ensure_dir_exists(dir: PathBuf) -> Result<PathBuf, String> {
    fs::create_dir_all(&dir)
        .map_err(|e| format!("Unable to create directory at {:?}: {:?}", dir, e))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_dir_joins_base_network_and_leaf() {
        let dir = get_network_dir(Some(PathBuf::from("/tmp/lh")), "mainnet", DEFAULT_BEACON_NODE_DIR);
        assert_eq!(dir, PathBuf::from("/tmp/lh/mainnet/beacon"));
    }

    #[test]
    fn ensure_dir_exists_creates_nested_path() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let created = ensure_dir_exists(nested.clone()).unwrap();
        assert!(created.is_dir());
    }
}
