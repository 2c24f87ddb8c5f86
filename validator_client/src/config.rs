use directory::DEFAULT_VALIDATOR_DIR;
use serde_derive::{Deserialize, Serialize};
use std::path::PathBuf;
use types::Graffiti;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Path to the slashing-protection SQLite database, under `data_dir` by default.
    pub slashing_protection_db: PathBuf,
    pub graffiti: Graffiti,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from(".lighthouse").join(DEFAULT_VALIDATOR_DIR);
        Self {
            slashing_protection_db: data_dir.join("slashing_protection.sqlite"),
            data_dir,
            graffiti: Graffiti::default(),
        }
    }
}
