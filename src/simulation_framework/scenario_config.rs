use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::as_graph::{ASGraph, ASN};
use crate::path_validation::AttestationKind;
use crate::policies::RoutingPolicy;
use crate::shared::{ScenarioFileError, SimulationError, Tier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttackKind {
    /// Forged-path hijack with `n_hops` between victim and attacker
    Hijack { n_hops: usize },
    /// The attacker leaks the victim's routes to everyone
    RouteLeak,
}

/// Which ASes take part in a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Adoption {
    None,
    All,
    /// The `n` ASes with the most customers
    TopIsps(usize),
    /// A random share of the whole graph, rounded to the nearest AS
    RandomPercent(f64),
    /// A random share of each tier, rounded down per tier
    RandomPerTier { tier_1: f64, tier_2: f64, tier_3: f64 },
    /// The top ISPs of each tier
    TopIspsPerTier { tier_1: usize, tier_2: usize, tier_3: usize },
    Explicit(Vec<ASN>),
}

impl Adoption {
    /// Pick the adopting ASes. Random picks are drawn from ASNs in ascending
    /// order so a seeded `rng` always picks the same ASes.
    pub fn select<R: Rng + ?Sized>(&self, as_graph: &ASGraph, rng: &mut R) -> Vec<ASN> {
        let selected = match self {
            Adoption::None => Vec::new(),
            Adoption::All => as_graph.asns(),
            Adoption::TopIsps(n) => as_graph.identify_top_isps(*n),
            Adoption::RandomPercent(percent) => {
                let asns = as_graph.asns();
                let count = (asns.len() as f64 / 100.0 * percent).round() as usize;
                sample(&asns, count, rng)
            }
            Adoption::RandomPerTier { tier_1, tier_2, tier_3 } => {
                let mut selected = Vec::new();
                for (tier, percent) in [(Tier::One, tier_1), (Tier::Two, tier_2), (Tier::Three, tier_3)] {
                    let asns = as_graph.tier(tier);
                    let count = (asns.len() as f64 / 100.0 * percent).floor() as usize;
                    selected.extend(sample(asns, count, rng));
                }
                selected
            }
            Adoption::TopIspsPerTier { tier_1, tier_2, tier_3 } => {
                let mut selected = as_graph.identify_top_isps_in(Tier::One, *tier_1);
                selected.extend(as_graph.identify_top_isps_in(Tier::Two, *tier_2));
                selected.extend(as_graph.identify_top_isps_in(Tier::Three, *tier_3));
                selected
            }
            Adoption::Explicit(asns) => asns
                .iter()
                .copied()
                .filter(|&asn| {
                    let known = as_graph.contains(asn);
                    if !known {
                        log::warn!("Adopting AS {} is not in the graph", asn);
                    }
                    known
                })
                .collect(),
        };

        if selected.is_empty() && !matches!(self, Adoption::None) {
            log::warn!("{:?} selects no AS in a graph of {}", self, as_graph.len());
        }
        selected
    }
}

fn sample<R: Rng + ?Sized>(asns: &[ASN], count: usize, rng: &mut R) -> Vec<ASN> {
    asns.choose_multiple(rng, count.min(asns.len())).copied().collect()
}

/// Security mechanism rolled out on top of the base policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub policy: Option<RoutingPolicy>,
    pub policy_adoption: Adoption,
    pub attestation: Option<AttestationKind>,
    pub attestation_adoption: Adoption,
}

impl Deployment {
    pub fn policy(policy: RoutingPolicy, adoption: Adoption) -> Self {
        Deployment {
            policy: Some(policy),
            policy_adoption: adoption,
            attestation: None,
            attestation_adoption: Adoption::None,
        }
    }

    pub fn with_attestation(mut self, kind: AttestationKind, adoption: Adoption) -> Self {
        self.attestation = Some(kind);
        self.attestation_adoption = adoption;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub label: String,
    pub attack: AttackKind,
    /// Policy every AS starts with
    pub base_policy: RoutingPolicy,
    #[serde(default)]
    pub deployment: Option<Deployment>,
    #[serde(default)]
    pub bgpsec_everywhere: bool,
}

impl ScenarioConfig {
    pub fn new(label: impl Into<String>, attack: AttackKind) -> Self {
        ScenarioConfig {
            label: label.into(),
            attack,
            base_policy: RoutingPolicy::Default,
            deployment: None,
            bgpsec_everywhere: false,
        }
    }

    pub fn with_base_policy(mut self, policy: RoutingPolicy) -> Self {
        self.base_policy = policy;
        self
    }

    pub fn with_deployment(mut self, deployment: Deployment) -> Self {
        self.deployment = Some(deployment);
        self
    }

    pub fn with_bgpsec_everywhere(mut self, enabled: bool) -> Self {
        self.bgpsec_everywhere = enabled;
        self
    }

    /// Reject configs that hand an attacker-only policy to regular ASes.
    /// `RouteLeak` is set on the attacker by the attack itself; anywhere
    /// else it breaks the leak metric.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let deployed = self.deployment.as_ref().and_then(|deployment| deployment.policy);
        for policy in std::iter::once(self.base_policy).chain(deployed) {
            if policy == RoutingPolicy::RouteLeak {
                return Err(SimulationError::AttackerOnlyPolicy {
                    label: self.label.clone(),
                    policy: policy.name(),
                });
            }
        }
        Ok(())
    }

    /// Read and validate a JSON array of scenario configs
    pub fn from_json_file(path: &Path) -> Result<Vec<ScenarioConfig>, ScenarioFileError> {
        let file = File::open(path).map_err(|source| ScenarioFileError::Io {
            filename: path.to_path_buf(),
            source,
        })?;
        let configs: Vec<ScenarioConfig> =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| ScenarioFileError::Json {
                filename: path.to_path_buf(),
                source,
            })?;
        for config in &configs {
            config.validate().map_err(|source| ScenarioFileError::InvalidConfig {
                filename: path.to_path_buf(),
                source,
            })?;
        }
        Ok(configs)
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig::new("One-hop hijack; no deployment", AttackKind::Hijack { n_hops: 1 })
    }
}
