use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discriminant for the per-fork block/state body variants (§9: "tagged variants discriminated
/// by a fork field... fork transitions are explicit constructor functions, not implicit
/// upcasts").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForkName {
    Base,
    Altair,
    Bellatrix,
}

impl ForkName {
    pub fn list_all() -> Vec<ForkName> {
        vec![ForkName::Base, ForkName::Altair, ForkName::Bellatrix]
    }
}

impl fmt::Display for ForkName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ForkName::Base => write!(f, "phase0"),
            ForkName::Altair => write!(f, "altair"),
            ForkName::Bellatrix => write!(f, "bellatrix"),
        }
    }
}

impl FromStr for ForkName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "phase0" | "base" => Ok(ForkName::Base),
            "altair" => Ok(ForkName::Altair),
            "bellatrix" | "merge" => Ok(ForkName::Bellatrix),
            other => Err(format!("unknown fork name: {}", other)),
        }
    }
}

/// `InconsistentFork` is returned when a caller asks a forked container to be constructed from a
/// fork-tagged `BeaconState`/`BeaconBlock` whose variant doesn't match the requested fork.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct InconsistentFork {
    pub fork_at_slot: ForkName,
    pub object_fork: ForkName,
}
