pub mod data_tracker;
pub mod scenario;
pub mod scenario_config;
pub mod simulation;
pub mod trials;
pub mod worker_pool;

pub use data_tracker::{DataTracker, SimulationSummary, TrialRecord};
pub use scenario::{Scenario, Trial};
pub use scenario_config::{Adoption, AttackKind, Deployment, ScenarioConfig};
pub use simulation::Simulation;
pub use trials::{random_trials, read_scenario, read_scenario_file, route_leak_trials, AttackScenario};
pub use worker_pool::WorkerPool;
