use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use bgpsecsim::as_graph_generators::{
    default_cache_dir, parse_as_rel_file, ASGraphGenerator, CAIDAASGraphCollector, FileASGraphGenerator,
};
use bgpsecsim::simulation_framework::{read_scenario_file, ScenarioConfig, Simulation};
use bgpsecsim::{ASGraph, SimulationEngine, SimulationError, ASN};

#[derive(Parser, Debug)]
#[command(author, version, about)] // get author/version information from Cargo.toml
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a topology for customer-provider cycles and print tier sizes
    CheckGraph { file: PathBuf },
    /// Print the route the final AS selects towards the origin
    FindRoute {
        file: PathBuf,
        origin: ASN,
        #[arg(value_name = "FINAL")]
        final_as: ASN,
    },
    /// Histogram of path lengths towards a target AS
    PathLengths { file: PathBuf, target: ASN },
    /// Run attack trials and print the mean success rate per scenario
    Run {
        file: PathBuf,
        /// JSON file with a list of scenario configs
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        trials: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long)]
        parallelism: Option<usize>,
        /// Attack scenario file: attacker on the first line, then victims
        #[arg(long)]
        scenario_file: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Download a CAIDA serial-2 snapshot into the cache
    FetchCaida {
        #[arg(long, default_value_t = 10)]
        days_ago: u32,
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    match Args::parse().command {
        Command::CheckGraph { file } => check_graph(file),
        Command::FindRoute { file, origin, final_as } => find_route(file, origin, final_as),
        Command::PathLengths { file, target } => path_lengths(file, target),
        Command::Run {
            file,
            config,
            trials,
            seed,
            parallelism,
            scenario_file,
            output,
        } => {
            let as_graph = FileASGraphGenerator::new(file).generate()?;
            let configs = match config {
                Some(path) => ScenarioConfig::from_json_file(&path)?,
                None => vec![ScenarioConfig::default()],
            };

            let mut simulation = Simulation::new(as_graph)
                .with_scenario_configs(configs)
                .with_num_trials(trials)
                .with_seed(seed);
            if let Some(parallelism) = parallelism {
                simulation = simulation.with_parallelism(parallelism);
            }
            if let Some(path) = scenario_file {
                let attack = read_scenario_file(&path)?;
                println!("Replaying AS {} against {} victims", attack.attacker, attack.victims.len());
                simulation = simulation.with_trials(attack.trials());
            }
            if let Some(dir) = output {
                simulation = simulation.with_output_dir(dir);
            }

            for tracker in simulation.run()? {
                println!(
                    "{}: {:.2}% over {} trials",
                    tracker.config.label,
                    tracker.mean_success_rate(),
                    tracker.trials.len()
                );
            }
            Ok(())
        }
        Command::FetchCaida { days_ago, cache_dir } => {
            let cache_dir = cache_dir.unwrap_or_else(default_cache_dir);
            let path = CAIDAASGraphCollector::new(days_ago, &cache_dir).run()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn load_graph(file: PathBuf) -> Result<ASGraph, Box<dyn std::error::Error>> {
    let edges = parse_as_rel_file(&file)?;
    Ok(ASGraph::from_edges(&edges))
}

fn check_graph(file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let as_graph = load_graph(file)?;
    println!(
        "{} ASes: {} tier-1, {} tier-2, {} tier-3",
        as_graph.len(),
        as_graph.tier_1.len(),
        as_graph.tier_2.len(),
        as_graph.tier_3.len()
    );
    match as_graph.check_for_cycles() {
        Ok(()) => println!("No customer-provider cycles"),
        Err(err) => println!("{}", err),
    }
    Ok(())
}

fn find_route(file: PathBuf, origin: ASN, final_as: ASN) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = SimulationEngine::new(load_graph(file)?);
    engine.find_routes_to(origin)?;

    let as_obj = engine
        .as_graph
        .get(&final_as)
        .ok_or(SimulationError::UnknownAs(final_as))?;
    match as_obj.get_route(origin) {
        Some(route) => println!("{}", route),
        None => println!("AS {} has no route to AS {}", final_as, origin),
    }
    Ok(())
}

fn path_lengths(file: PathBuf, target: ASN) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = SimulationEngine::new(load_graph(file)?);
    engine.find_routes_to(target)?;

    let mut histogram: BTreeMap<usize, usize> = BTreeMap::new();
    for path in engine.get_local_rib_snapshot(target).values() {
        *histogram.entry(path.len()).or_insert(0) += 1;
    }
    for (length, count) in &histogram {
        println!("{}\t{}", length, count);
    }

    let routed: usize = histogram.values().sum();
    let reachable = engine.as_graph.reachable_from_count(target);
    if routed != reachable {
        log::warn!("{} ASes hold a route but {} can reach AS {}", routed, reachable, target);
    }
    Ok(())
}
