use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::as_graph::ASN;

/// Relation of a neighbor as seen from the local AS.
///
/// The discriminant doubles as the local-preference rank used by route
/// selection: lower is better, so routes from customers win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Relationships {
    Customers = 1,
    Peers = 2,
    Providers = 3,
}

impl Relationships {
    pub const ALL: [Relationships; 3] = [
        Relationships::Customers,
        Relationships::Peers,
        Relationships::Providers,
    ];

    pub fn invert(&self) -> Self {
        match self {
            Relationships::Providers => Relationships::Customers,
            Relationships::Customers => Relationships::Providers,
            Relationships::Peers => Relationships::Peers,
        }
    }

    pub fn rank(&self) -> i64 {
        *self as u8 as i64
    }
}

impl fmt::Display for Relationships {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Relationships::Providers => "PROVIDER",
            Relationships::Peers => "PEER",
            Relationships::Customers => "CUSTOMER",
        };
        write!(f, "{}", s)
    }
}

/// Result of ASPA / AS-Cones path verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationState {
    Valid,
    Invalid,
    Unknown,
}

impl fmt::Display for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationState::Valid => "Valid",
            ValidationState::Invalid => "Invalid",
            ValidationState::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// Tier of an AS in the provider hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    One,
    Two,
    Three,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::One => "TIER_1",
            Tier::Two => "TIER_2",
            Tier::Three => "TIER_3",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug)]
pub struct CycleError;

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Customer-provider cycle detected in AS graph")
    }
}

impl std::error::Error for CycleError {}

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("could not read {filename}: {source}")]
    Io {
        filename: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid AS relationship file {filename}, line {line_number}: {message} ({line:?})")]
    InvalidASRelFile {
        filename: PathBuf,
        line_number: usize,
        line: String,
        message: String,
    },
    #[error("invalid JSON edge list {filename}: {source}")]
    Json {
        filename: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("download of {url} failed: {message}")]
    Download { url: String, message: String },
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("no AS with ID {0}")]
    UnknownAs(ASN),
    #[error("cannot sample {requested} intermediate ASes, only {available} available")]
    NotEnoughAses { requested: usize, available: usize },
    #[error("AS {0} cannot attack itself")]
    SameVictimAndAttacker(ASN),
    #[error("scenario {label:?} deploys {policy}, which only an attacker may run")]
    AttackerOnlyPolicy { label: String, policy: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioFileError {
    #[error("could not read {filename}: {source}")]
    Io {
        filename: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{filename}, line {line_number}: not an AS number ({line:?})")]
    InvalidAsn {
        filename: PathBuf,
        line_number: usize,
        line: String,
    },
    #[error("{filename} does not name an attacker")]
    MissingAttacker { filename: PathBuf },
    #[error("invalid scenario configs in {filename}: {source}")]
    Json {
        filename: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{filename}: {source}")]
    InvalidConfig {
        filename: PathBuf,
        #[source]
        source: SimulationError,
    },
}
