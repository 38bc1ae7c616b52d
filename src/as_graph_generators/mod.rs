pub mod caida;
pub mod edge_list;

use std::path::{Path, PathBuf};

use crate::as_graph::{ASGraph, Edge};
use crate::shared::TopologyError;

pub use caida::{read_caida, CAIDAASGraphCollector};
pub use edge_list::read_edge_list;

pub trait ASGraphGenerator {
    fn generate(&self) -> Result<ASGraph, TopologyError>;
}

/// Read a relationship file into an edge list.
///
/// `.json` files are provider-to-customer edge lists, everything else is
/// CAIDA `as-rel` text, bzip2-compressed if the name ends in `.bz2`.
pub fn parse_as_rel_file(path: &Path) -> Result<Vec<Edge>, TopologyError> {
    let edges = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => edge_list::parse_edge_list_file(path)?,
        _ => caida::parse_caida_file(path)?,
    };
    log::info!("Read {} edges from {}", edges.len(), path.display());
    Ok(edges)
}

/// Build an AS graph from a topology file on disk. The graph is rejected if
/// its customer-provider edges contain a cycle.
pub struct FileASGraphGenerator {
    pub path: PathBuf,
}

impl FileASGraphGenerator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileASGraphGenerator { path: path.into() }
    }
}

impl ASGraphGenerator for FileASGraphGenerator {
    fn generate(&self) -> Result<ASGraph, TopologyError> {
        let edges = parse_as_rel_file(&self.path)?;
        let as_graph = ASGraph::from_edges(&edges);
        as_graph.check_for_cycles()?;
        log::info!(
            "Loaded {} ASes ({} tier-1, {} tier-2, {} tier-3)",
            as_graph.len(),
            as_graph.tier_1.len(),
            as_graph.tier_2.len(),
            as_graph.tier_3.len()
        );
        Ok(as_graph)
    }
}

/// Fetch (or reuse) a dated CAIDA serial-2 snapshot and build the graph
pub struct CAIDAASGraphGenerator {
    pub days_ago: u32,
    pub cache_dir: PathBuf,
}

impl CAIDAASGraphGenerator {
    pub fn new() -> Self {
        CAIDAASGraphGenerator {
            days_ago: 10,
            cache_dir: default_cache_dir(),
        }
    }

    pub fn with_days_ago(mut self, days: u32) -> Self {
        self.days_ago = days;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }
}

impl Default for CAIDAASGraphGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ASGraphGenerator for CAIDAASGraphGenerator {
    fn generate(&self) -> Result<ASGraph, TopologyError> {
        let collector = CAIDAASGraphCollector::new(self.days_ago, &self.cache_dir);
        let cached_path = collector.run()?;
        FileASGraphGenerator::new(cached_path).generate()
    }
}

pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("bgpsecsim"))
        .unwrap_or_else(|| PathBuf::from(".bgpsecsim_cache"))
}
