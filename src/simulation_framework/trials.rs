use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::as_graph::{ASGraph, ASN};
use crate::shared::{Relationships, ScenarioFileError};

use super::scenario::Trial;

/// `n` random (victim, attacker) pairs of two distinct ASes
pub fn random_trials<R: Rng + ?Sized>(as_graph: &ASGraph, n: usize, rng: &mut R) -> Vec<Trial> {
    let asns = as_graph.asns();
    if asns.len() < 2 {
        return Vec::new();
    }

    (0..n)
        .map(|_| {
            let pair: Vec<ASN> = asns.choose_multiple(rng, 2).copied().collect();
            (pair[0], pair[1])
        })
        .collect()
}

/// `n` route-leak trials: the victim has at least one provider and the
/// attacker is one of them
pub fn route_leak_trials<R: Rng + ?Sized>(as_graph: &ASGraph, n: usize, rng: &mut R) -> Vec<Trial> {
    let candidates: Vec<ASN> = as_graph
        .tier_2
        .iter()
        .chain(as_graph.tier_3.iter())
        .copied()
        .filter(|&asn| {
            as_graph
                .get(&asn)
                .map_or(false, |as_obj| as_obj.count_of(Relationships::Providers) > 0)
        })
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    (0..n)
        .filter_map(|_| {
            let victim = *candidates.choose(rng)?;
            let attacker = *as_graph.get_providers(&[victim]).choose(rng)?;
            Some((victim, attacker))
        })
        .collect()
}

/// Attacker and victims replayed from a recorded incident
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackScenario {
    pub attacker: ASN,
    pub victims: Vec<ASN>,
}

impl AttackScenario {
    pub fn trials(&self) -> Vec<Trial> {
        self.victims.iter().map(|&victim| (victim, self.attacker)).collect()
    }
}

/// Parse an attack scenario: the first non-comment line is the attacker,
/// every further one a victim. Lines starting with `#` are comments.
pub fn read_scenario<R: BufRead>(reader: R, filename: &Path) -> Result<AttackScenario, ScenarioFileError> {
    let mut asns = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| ScenarioFileError::Io {
            filename: filename.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let asn: ASN = trimmed.parse().map_err(|_| ScenarioFileError::InvalidAsn {
            filename: filename.to_path_buf(),
            line_number: index + 1,
            line: line.clone(),
        })?;
        asns.push(asn);
    }

    let mut asns = asns.into_iter();
    let attacker = asns.next().ok_or_else(|| ScenarioFileError::MissingAttacker {
        filename: filename.to_path_buf(),
    })?;
    Ok(AttackScenario {
        attacker,
        victims: asns.collect(),
    })
}

pub fn read_scenario_file(path: &Path) -> Result<AttackScenario, ScenarioFileError> {
    let file = File::open(path).map_err(|source| ScenarioFileError::Io {
        filename: path.to_path_buf(),
        source,
    })?;
    read_scenario(BufReader::new(file), path)
}
