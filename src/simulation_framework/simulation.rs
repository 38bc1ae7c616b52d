use std::path::PathBuf;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::as_graph::ASGraph;

use super::data_tracker::{DataTracker, SimulationSummary};
use super::scenario::{Scenario, Trial};
use super::scenario_config::{AttackKind, ScenarioConfig};
use super::trials::{random_trials, route_leak_trials};
use super::worker_pool::WorkerPool;

pub struct Simulation {
    /// Output directory for results
    pub output_dir: PathBuf,

    /// Scenario configurations to run
    pub scenario_configs: Vec<ScenarioConfig>,

    /// Trials drawn per scenario when none are given explicitly
    pub num_trials: usize,

    /// Worker threads
    pub parallelism: usize,

    /// Base seed for trial sampling and per-trial randomness
    pub seed: u64,

    /// Explicit (victim, attacker) pairs used instead of random ones
    pub trials: Option<Vec<Trial>>,

    /// Save one JSON file per scenario
    pub save_results: bool,

    pub as_graph: ASGraph,
}

impl Simulation {
    pub fn new(as_graph: ASGraph) -> Self {
        let output_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bgpsecsim")
            .join("results");

        Simulation {
            output_dir,
            scenario_configs: vec![ScenarioConfig::default()],
            num_trials: 10,
            parallelism: num_cpus::get().max(1),
            seed: 0,
            trials: None,
            save_results: true,
            as_graph,
        }
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn with_scenario_configs(mut self, configs: Vec<ScenarioConfig>) -> Self {
        self.scenario_configs = configs;
        self
    }

    pub fn with_num_trials(mut self, trials: usize) -> Self {
        self.num_trials = trials;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_trials(mut self, trials: Vec<Trial>) -> Self {
        self.trials = Some(trials);
        self
    }

    pub fn with_save_results(mut self, save: bool) -> Self {
        self.save_results = save;
        self
    }

    /// Run every scenario and return its tracker, in config order
    pub fn run(&self) -> Result<Vec<DataTracker>, Box<dyn std::error::Error>> {
        for scenario_config in &self.scenario_configs {
            scenario_config.validate()?;
        }
        if self.save_results {
            std::fs::create_dir_all(&self.output_dir)?;
        }
        log::info!(
            "Running {} scenarios on {} ASes with {} workers",
            self.scenario_configs.len(),
            self.as_graph.len(),
            self.parallelism
        );

        let start_time = Instant::now();
        let mut summary = SimulationSummary::default();
        let mut trackers = Vec::with_capacity(self.scenario_configs.len());

        for scenario_config in &self.scenario_configs {
            log::info!("Running scenario: {}", scenario_config.label);
            let tracker = self.run_scenario(scenario_config)?;
            log::info!(
                "{}: mean success rate {:.2}% over {} trials",
                scenario_config.label,
                tracker.mean_success_rate(),
                tracker.trials.len()
            );
            summary.add_data_point(&scenario_config.label, tracker.mean_success_rate());
            trackers.push(tracker);
        }

        if self.save_results {
            let path = summary.save_to_file(&self.output_dir)?;
            log::info!("Summary written to {}", path.display());
        }
        log::info!("Simulation complete in {:.2}s", start_time.elapsed().as_secs_f64());
        Ok(trackers)
    }

    fn run_scenario(&self, scenario_config: &ScenarioConfig) -> Result<DataTracker, Box<dyn std::error::Error>> {
        let trials = self.trials_for(scenario_config);
        let scenario = Scenario::new(scenario_config.clone());

        let pb = ProgressBar::new(trials.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} trials")?
                .progress_chars("##-"),
        );

        let pool = WorkerPool::new(self.parallelism, self.seed).with_progress(pb.clone());
        let results = pool.run(&self.as_graph, &scenario, &trials);
        pb.finish();

        let mut tracker = DataTracker::new(scenario_config.clone());
        for (trial, success_rate) in trials.iter().zip(results) {
            tracker.add_result(*trial, success_rate);
        }

        // Deployment drawn with the base seed; trials redraw random adoptions
        let mut preview = self.as_graph.clone();
        preview.reset_policies();
        preview.clear_rpki_objects();
        scenario.apply_deployment(&mut preview, &mut StdRng::seed_from_u64(self.seed))?;
        tracker.set_policy_counts(preview.policy_counts());

        if self.save_results {
            let path = tracker.save_to_file(&self.output_dir)?;
            log::debug!("Results written to {}", path.display());
        }
        Ok(tracker)
    }

    fn trials_for(&self, scenario_config: &ScenarioConfig) -> Vec<Trial> {
        if let Some(trials) = &self.trials {
            return trials.clone();
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        match scenario_config.attack {
            AttackKind::Hijack { .. } => random_trials(&self.as_graph, self.num_trials, &mut rng),
            AttackKind::RouteLeak => route_leak_trials(&self.as_graph, self.num_trials, &mut rng),
        }
    }
}
