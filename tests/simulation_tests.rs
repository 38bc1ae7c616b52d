mod common;

use std::collections::BTreeMap;
use std::fs;

use rand::rngs::StdRng;
use rand::SeedableRng;

use bgpsecsim::simulation_framework::{
    random_trials, route_leak_trials, Adoption, AttackKind, Deployment, Scenario, ScenarioConfig, Simulation,
    WorkerPool,
};
use bgpsecsim::{AttestationKind, RoutingPolicy, ScenarioFileError, SimulationEngine, Tier};

use common::fixture_graph;

fn two_hop_hijack() -> Scenario {
    Scenario::new(ScenarioConfig::new("two-hop hijack", AttackKind::Hijack { n_hops: 2 }))
}

#[test]
fn test_pool_matches_sequential_run() {
    let graph = fixture_graph();
    let scenario = two_hop_hijack();
    let trials = random_trials(&graph, 12, &mut StdRng::seed_from_u64(5));
    let seed = 42;

    let parallel = WorkerPool::new(4, seed).run(&graph, &scenario, &trials);

    let mut engine = SimulationEngine::new(graph.clone());
    let sequential: Vec<f64> = trials
        .iter()
        .enumerate()
        .map(|(index, &trial)| {
            let mut rng = StdRng::seed_from_u64(seed + index as u64);
            scenario.run_trial(&mut engine, trial, &mut rng).unwrap()
        })
        .collect();

    assert_eq!(parallel, sequential);
}

#[test]
fn test_pool_is_independent_of_worker_count() {
    let graph = fixture_graph();
    let scenario = two_hop_hijack();
    let trials = random_trials(&graph, 8, &mut StdRng::seed_from_u64(9));

    let one = WorkerPool::new(1, 3).run(&graph, &scenario, &trials);
    let many = WorkerPool::new(8, 3).run(&graph, &scenario, &trials);
    assert_eq!(one, many);
}

#[test]
fn test_pool_scores_failed_trials_as_zero() {
    let graph = fixture_graph();
    let scenario = Scenario::new(ScenarioConfig::default());
    let trials = vec![(17, 18), (17, 99), (8, 8)];

    let results = WorkerPool::new(2, 0).run(&graph, &scenario, &trials);
    assert_eq!(results.len(), 3);
    assert!(results[0] > 0.0);
    assert_eq!(results[1], 0.0);
    assert_eq!(results[2], 0.0);
}

#[test]
fn test_random_trials() {
    let graph = fixture_graph();
    let trials = random_trials(&graph, 50, &mut StdRng::seed_from_u64(1));
    assert_eq!(trials.len(), 50);
    for (victim, attacker) in &trials {
        assert_ne!(victim, attacker);
        assert!(graph.contains(*victim) && graph.contains(*attacker));
    }
    assert_eq!(trials, random_trials(&graph, 50, &mut StdRng::seed_from_u64(1)));
}

#[test]
fn test_route_leak_trials_pick_a_provider() {
    let graph = fixture_graph();
    let trials = route_leak_trials(&graph, 30, &mut StdRng::seed_from_u64(2));
    assert_eq!(trials.len(), 30);
    for (victim, attacker) in trials {
        assert_ne!(graph.tier_of(victim), Some(Tier::One));
        assert!(graph.get(&victim).unwrap().providers().contains(&attacker));
    }
}

#[test]
fn test_deployment_sets_flags() {
    let mut graph = fixture_graph();
    let config = ScenarioConfig::new("partial", AttackKind::Hijack { n_hops: 1 })
        .with_base_policy(RoutingPolicy::Rpki)
        .with_deployment(
            Deployment::policy(RoutingPolicy::BgpsecMed, Adoption::TopIsps(2))
                .with_attestation(AttestationKind::AsCones, Adoption::Explicit(vec![2, 3])),
        );
    Scenario::new(config)
        .apply_deployment(&mut graph, &mut StdRng::seed_from_u64(0))
        .unwrap();

    let counts = graph.policy_counts();
    assert_eq!(counts.get("RPKIPolicy"), Some(&16));
    assert_eq!(counts.get("BGPsecMedSecPolicy"), Some(&2));
    for asn in [1, 8] {
        assert!(graph.get(&asn).unwrap().bgpsec_enabled);
    }
    assert!(!graph.get(&4).unwrap().bgpsec_enabled);
    assert!(graph.get(&2).unwrap().ascones.is_some());
    assert!(graph.get(&1).unwrap().ascones.is_none());
}

#[test]
fn test_run_trial_rejects_unknown_ases() {
    let scenario = Scenario::new(ScenarioConfig::default());
    let mut engine = SimulationEngine::new(fixture_graph());
    assert!(scenario
        .run_trial(&mut engine, (99, 1), &mut StdRng::seed_from_u64(0))
        .is_err());
}

#[test]
fn test_simulation_run_without_saving() {
    let configs = vec![
        ScenarioConfig::default(),
        ScenarioConfig::new("one-hop hijack vs path-end", AttackKind::Hijack { n_hops: 1 })
            .with_base_policy(RoutingPolicy::PathEndValidation),
        ScenarioConfig::new("route leak", AttackKind::RouteLeak),
    ];
    let trackers = Simulation::new(fixture_graph())
        .with_scenario_configs(configs)
        .with_num_trials(6)
        .with_parallelism(2)
        .with_seed(11)
        .with_save_results(false)
        .run()
        .unwrap();

    assert_eq!(trackers.len(), 3);
    assert!(trackers.iter().all(|tracker| tracker.trials.len() == 6));
    assert_eq!(trackers[1].policy_counts.get("PathEndValidationPolicy"), Some(&18));

    // A neighbor of the victim follows it on legitimate paths too, so only
    // trials against non-adjacent attackers are guaranteed to score zero
    let graph = fixture_graph();
    for trial in &trackers[1].trials {
        if graph.relation(trial.victim, trial.attacker).is_none() {
            assert_eq!(trial.success_rate, 0.0, "{:?}", trial);
        }
    }
}

#[test]
fn test_path_end_validation_against_the_victims_provider() {
    let config = ScenarioConfig::new("one-hop hijack vs path-end", AttackKind::Hijack { n_hops: 1 })
        .with_base_policy(RoutingPolicy::PathEndValidation);
    let trackers = Simulation::new(fixture_graph())
        .with_scenario_configs(vec![config])
        .with_trials(vec![(17, 18), (18, 16)])
        .with_parallelism(2)
        .with_save_results(false)
        .run()
        .unwrap();

    let trials = &trackers[0].trials;
    assert_eq!(trials[0].success_rate, 0.0);
    // AS16 is AS18's only provider: every other AS reaches AS18 through it,
    // and those honest routes still count against the victim
    assert!((trials[1].success_rate - 17.0 / 18.0 * 100.0).abs() < 1e-9);
}

#[test]
fn test_policy_counts_follow_the_base_seed() {
    let config = ScenarioConfig::new("half ASPA", AttackKind::Hijack { n_hops: 1 })
        .with_deployment(Deployment::policy(RoutingPolicy::Aspa, Adoption::RandomPercent(50.0)));
    let trackers = Simulation::new(fixture_graph())
        .with_scenario_configs(vec![config.clone()])
        .with_num_trials(3)
        .with_parallelism(1)
        .with_seed(4)
        .with_save_results(false)
        .run()
        .unwrap();

    let mut graph = fixture_graph();
    Scenario::new(config)
        .apply_deployment(&mut graph, &mut StdRng::seed_from_u64(4))
        .unwrap();
    let expected: BTreeMap<String, usize> = graph
        .policy_counts()
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();

    assert_eq!(trackers[0].policy_counts, expected);
    assert_eq!(expected.get("ASPAPolicy"), Some(&9));
}

#[test]
fn test_deployment_to_top_isps_per_tier() {
    let mut graph = fixture_graph();
    let config = ScenarioConfig::new("tiered BGPsec", AttackKind::Hijack { n_hops: 1 }).with_deployment(
        Deployment::policy(
            RoutingPolicy::BgpsecHigh,
            Adoption::TopIspsPerTier { tier_1: 1, tier_2: 3, tier_3: 2 },
        )
        .with_attestation(AttestationKind::Aspa, Adoption::TopIspsPerTier { tier_1: 0, tier_2: 1, tier_3: 0 }),
    );
    Scenario::new(config)
        .apply_deployment(&mut graph, &mut StdRng::seed_from_u64(0))
        .unwrap();

    let counts = graph.policy_counts();
    assert_eq!(counts.get("BGPsecHighSecPolicy"), Some(&6));
    assert_eq!(counts.get("DefaultPolicy"), Some(&12));

    // AS1 alone in Tier-1, AS8 2 3 lead Tier-2, leaves tie and go by ASN
    for asn in [1, 8, 2, 3, 10, 11] {
        let as_obj = graph.get(&asn).unwrap();
        assert_eq!(as_obj.policy, RoutingPolicy::BgpsecHigh, "AS {}", asn);
        assert!(as_obj.bgpsec_enabled);
    }
    assert!(!graph.get(&4).unwrap().bgpsec_enabled);
    assert!(graph.get(&8).unwrap().aspa.is_some());
    assert!(graph.get(&2).unwrap().aspa.is_none());
}

#[test]
fn test_route_leak_policy_is_rejected() {
    let leaky = ScenarioConfig::new("leaky adopters", AttackKind::RouteLeak)
        .with_deployment(Deployment::policy(RoutingPolicy::RouteLeak, Adoption::All));

    let path = std::env::temp_dir().join(format!("bgpsecsim-leaky-{}.json", std::process::id()));
    fs::write(&path, serde_json::to_string(&vec![leaky.clone()]).unwrap()).unwrap();
    let loaded = ScenarioConfig::from_json_file(&path);
    let _ = fs::remove_file(&path);
    assert!(matches!(loaded, Err(ScenarioFileError::InvalidConfig { .. })));

    let run = Simulation::new(fixture_graph())
        .with_scenario_configs(vec![leaky])
        .with_num_trials(2)
        .with_save_results(false)
        .run();
    assert!(run.is_err());
}

#[test]
fn test_simulation_replays_explicit_trials() {
    let trackers = Simulation::new(fixture_graph())
        .with_trials(vec![(17, 18), (17, 18)])
        .with_parallelism(2)
        .with_save_results(false)
        .run()
        .unwrap();

    let tracker = &trackers[0];
    assert_eq!(tracker.trials.len(), 2);
    assert_eq!(tracker.trials[0].success_rate, tracker.trials[1].success_rate);
    assert!((tracker.mean_success_rate() - 7.0 / 18.0 * 100.0).abs() < 1e-9);
}

#[test]
fn test_simulation_writes_results() {
    let output_dir = std::env::temp_dir().join(format!("bgpsecsim-test-{}", std::process::id()));
    let _ = fs::remove_dir_all(&output_dir);

    Simulation::new(fixture_graph())
        .with_num_trials(2)
        .with_parallelism(1)
        .with_output_dir(output_dir.clone())
        .run()
        .unwrap();

    let names: Vec<String> = fs::read_dir(&output_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.iter().any(|name| name.starts_with("summary_")));
    assert!(names.iter().any(|name| name.starts_with("One-hop_hijack__no_deployment_")));

    let _ = fs::remove_dir_all(&output_dir);
}

#[test]
fn test_scenario_configs_from_json() {
    let path = std::env::temp_dir().join(format!("bgpsecsim-configs-{}.json", std::process::id()));
    let configs = vec![
        ScenarioConfig::default(),
        ScenarioConfig::new("leak vs ASPA", AttackKind::RouteLeak).with_deployment(
            Deployment::policy(RoutingPolicy::Aspa, Adoption::RandomPercent(50.0))
                .with_attestation(AttestationKind::Aspa, Adoption::All),
        ),
    ];
    fs::write(&path, serde_json::to_string(&configs).unwrap()).unwrap();

    assert_eq!(ScenarioConfig::from_json_file(&path).unwrap(), configs);
    let _ = fs::remove_file(&path);
}
