// Re-export all public modules
pub mod shared;
pub mod as_graph;
pub mod route;
pub mod policies;
pub mod path_validation;
pub mod engine;
pub mod attacks;
pub mod as_graph_generators;
pub mod simulation_framework;

// Re-export commonly used types at the crate root
pub use as_graph::{ASGraph, Attestation, Edge, EdgeKind, AS, ASN};
pub use engine::SimulationEngine;
pub use path_validation::{verify_path, AttestationKind};
pub use policies::{PreferenceRule, RoutingPolicy};
pub use route::Route;
pub use shared::{
    CycleError, Relationships, ScenarioFileError, SimulationError, Tier, TopologyError, ValidationState,
};
