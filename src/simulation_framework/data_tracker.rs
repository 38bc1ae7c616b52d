use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::as_graph::ASN;

use super::scenario::Trial;
use super::scenario_config::ScenarioConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub victim: ASN,
    pub attacker: ASN,
    pub success_rate: f64,
}

/// Per-trial results of one scenario
#[derive(Debug, Clone, Serialize)]
pub struct DataTracker {
    pub config: ScenarioConfig,
    pub trials: Vec<TrialRecord>,
    /// Policy name to number of ASes running it, from one deployment drawn
    /// with the simulation's base seed. Random adoptions are redrawn in every
    /// trial, so a single trial may deploy differently.
    pub policy_counts: BTreeMap<String, usize>,
}

impl DataTracker {
    pub fn new(config: ScenarioConfig) -> Self {
        DataTracker {
            config,
            trials: Vec::new(),
            policy_counts: BTreeMap::new(),
        }
    }

    pub fn add_result(&mut self, (victim, attacker): Trial, success_rate: f64) {
        self.trials.push(TrialRecord {
            victim,
            attacker,
            success_rate,
        });
    }

    pub fn set_policy_counts(&mut self, counts: BTreeMap<&'static str, usize>) {
        self.policy_counts = counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
    }

    pub fn mean_success_rate(&self) -> f64 {
        if self.trials.is_empty() {
            return 0.0;
        }
        self.trials.iter().map(|trial| trial.success_rate).sum::<f64>() / self.trials.len() as f64
    }

    /// Write the results as pretty JSON, named after the label and the
    /// current time. Returns the written path.
    pub fn save_to_file(&self, output_dir: &Path) -> std::io::Result<PathBuf> {
        let timestamp = Utc::now();
        let file_name = format!(
            "{}_{}.json",
            file_safe(&self.config.label),
            timestamp.format("%Y%m%dT%H%M%S")
        );
        let file_path = output_dir.join(file_name);

        let data = serde_json::json!({
            "label": self.config.label,
            "config": self.config,
            "created_at": timestamp.to_rfc3339(),
            "num_trials": self.trials.len(),
            "mean_success_rate": self.mean_success_rate(),
            "policy_counts": self.policy_counts,
            "trials": self.trials,
        });

        let json = serde_json::to_string_pretty(&data)?;
        fs::write(&file_path, json)?;
        Ok(file_path)
    }
}

/// Mean success rate of every scenario in one simulation run
#[derive(Debug, Default, Serialize)]
pub struct SimulationSummary {
    pub labels: Vec<String>,
    pub mean_success_rates: Vec<f64>,
}

impl SimulationSummary {
    pub fn add_data_point(&mut self, label: &str, mean_success_rate: f64) {
        self.labels.push(label.to_string());
        self.mean_success_rates.push(mean_success_rate);
    }

    pub fn save_to_file(&self, output_dir: &Path) -> std::io::Result<PathBuf> {
        let file_path = output_dir.join(format!("summary_{}.json", Utc::now().format("%Y%m%dT%H%M%S")));
        fs::write(&file_path, serde_json::to_string_pretty(self)?)?;
        Ok(file_path)
    }
}

fn file_safe(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
