mod common;

use std::collections::HashSet;

use bgpsecsim::{Route, SimulationEngine, SimulationError, ASN};

use common::fixture_graph;

fn path_at(engine: &SimulationEngine, asn: ASN, dest: ASN) -> Vec<ASN> {
    engine
        .as_graph
        .get(&asn)
        .and_then(|as_obj| as_obj.get_route(dest))
        .map(|route| route.path.clone())
        .unwrap_or_default()
}

#[test]
fn test_find_routes_to_fixture() {
    let mut engine = SimulationEngine::new(fixture_graph());
    engine.find_routes_to(8).unwrap();

    let expected: &[(ASN, &[ASN])] = &[
        (8, &[8]),
        (4, &[8, 4]),
        (1, &[8, 4, 1]),
        (7, &[8, 7]),
        (14, &[8, 14]),
        (18, &[8, 16, 18]),
        (2, &[8, 4, 1, 2]),
        (3, &[8, 4, 1, 3]),
        (5, &[8, 4, 1, 2, 5]),
        (6, &[8, 4, 1, 2, 6]),
        (17, &[8, 4, 1, 2, 5, 9, 17]),
    ];
    for (asn, path) in expected {
        assert_eq!(path_at(&engine, *asn, 8), path.to_vec(), "route at AS {}", asn);
    }
    assert_eq!(engine.route_count(8), 18);
}

#[test]
fn test_peer_routes_are_not_sent_upwards() {
    let mut engine = SimulationEngine::new(fixture_graph());
    engine.find_routes_to(8).unwrap();

    // AS7 holds a peer route, so its provider AS3 must have learned via AS1
    assert_eq!(path_at(&engine, 3, 8), vec![8, 4, 1, 3]);
    // and its peer AS6 must not learn from AS7 either
    assert_ne!(path_at(&engine, 6, 8)[3], 7);
}

#[test]
fn test_unknown_destination() {
    let mut engine = SimulationEngine::new(fixture_graph());
    assert!(matches!(engine.find_routes_to(99), Err(SimulationError::UnknownAs(99))));
    assert_eq!(engine.route_count(99), 0);
}

#[test]
fn test_rib_snapshot_matches_tables() {
    let mut engine = SimulationEngine::new(fixture_graph());
    engine.find_routes_to(17).unwrap();

    let snapshot = engine.get_local_rib_snapshot(17);
    assert_eq!(snapshot.len(), engine.as_graph.reachable_from_count(17));
    for (asn, path) in &snapshot {
        assert_eq!(path[0], 17);
        assert_eq!(path.last(), Some(asn));
        let unique: HashSet<_> = path.iter().collect();
        assert_eq!(unique.len(), path.len(), "loop in {:?}", path);
    }
}

#[test]
fn test_destinations_are_independent() {
    let mut engine = SimulationEngine::new(fixture_graph());
    engine.find_routes_to(8).unwrap();
    engine.find_routes_to(17).unwrap();

    assert_eq!(path_at(&engine, 1, 8), vec![8, 4, 1]);
    assert_eq!(path_at(&engine, 1, 17), vec![17, 9, 5, 2, 1]);
}

#[test]
fn test_learn_route_forwards_customer_route_everywhere() {
    let mut engine = SimulationEngine::new(fixture_graph());
    let forwarded = engine.learn_route(Route::new(8, vec![8, 4], false, false, false)).unwrap();

    let next_hops: HashSet<ASN> = forwarded.iter().map(|route| route.final_as()).collect();
    assert_eq!(next_hops, HashSet::from([1, 7, 8]));
    assert!(forwarded.iter().all(|route| route.path[..2] == [8, 4]));
    assert_eq!(path_at(&engine, 4, 8), vec![8, 4]);
}

#[test]
fn test_learn_route_keeps_better_route() {
    let mut engine = SimulationEngine::new(fixture_graph());
    assert!(engine.learn_route(Route::new(8, vec![8, 4, 1, 3], false, false, false)).is_some());
    // Longer route from the same provider loses
    assert!(engine.learn_route(Route::new(8, vec![8, 7, 4, 1, 3], false, false, false)).is_none());
    // Customer route beats the provider route
    assert!(engine.learn_route(Route::new(8, vec![8, 4, 7, 3], false, false, false)).is_some());
    assert_eq!(path_at(&engine, 3, 8), vec![8, 4, 7, 3]);
}

#[test]
fn test_learn_route_drops_routes_back_to_origin() {
    let mut engine = SimulationEngine::new(fixture_graph());
    assert!(engine.learn_route(Route::new(8, vec![8, 4, 8], false, false, false)).is_none());
    assert_eq!(path_at(&engine, 8, 8), vec![8]);
}

#[test]
fn test_bgpsec_authentication_survives_full_deployment() {
    let mut graph = fixture_graph();
    for as_obj in graph.iter_mut() {
        as_obj.bgpsec_enabled = true;
    }
    graph.get_mut(&1).unwrap().bgpsec_enabled = false;

    let mut engine = SimulationEngine::new(graph);
    engine.find_routes_to(8).unwrap();

    let authenticated = |asn: ASN| engine.as_graph.get(&asn).unwrap().get_route(8).unwrap().authenticated;
    assert!(authenticated(4));
    assert!(authenticated(7));
    assert!(authenticated(14));
    // The chain breaks at the first hop that does not validate
    assert!(!authenticated(1));
    assert!(!authenticated(2));
    assert!(!authenticated(17));
}

#[test]
fn test_reset_restores_defaults() {
    let mut engine = SimulationEngine::new(fixture_graph());
    engine.as_graph.set_policy(3, bgpsecsim::RoutingPolicy::Aspa).unwrap();
    engine.as_graph.create_new_aspa(3).unwrap();
    engine.find_routes_to(8).unwrap();

    engine.reset();
    assert_eq!(engine.as_graph.policy_counts().get("DefaultPolicy"), Some(&18));
    assert!(engine.as_graph.get(&3).unwrap().aspa.is_none());
    assert_eq!(engine.route_count(8), 1);
}
