//! Adversarial route injection and the success metrics computed over the
//! routing state it leaves behind.

use std::collections::VecDeque;

use rand::seq::index;
use rand::Rng;

use crate::as_graph::{ASGraph, ASN};
use crate::engine::SimulationEngine;
use crate::policies::RoutingPolicy;
use crate::route::Route;
use crate::shared::{Relationships, SimulationError};

/// Build the forged route an attacker claims for `victim`.
///
/// * `n_hops == 0`: the attacker originates the victim's destination.
/// * `n_hops == 1`: the attacker claims a direct link to the victim.
/// * otherwise `n_hops - 1` random ASes are placed between them.
pub fn forged_route<R: Rng + ?Sized>(
    as_graph: &ASGraph,
    victim: ASN,
    attacker: ASN,
    n_hops: usize,
    rng: &mut R,
) -> Result<Route, SimulationError> {
    if victim == attacker {
        return Err(SimulationError::SameVictimAndAttacker(victim));
    }
    for asn in [victim, attacker] {
        if !as_graph.contains(asn) {
            return Err(SimulationError::UnknownAs(asn));
        }
    }

    let path = match n_hops {
        0 => vec![attacker],
        1 => vec![victim, attacker],
        _ => {
            let candidates: Vec<ASN> = as_graph
                .asns()
                .into_iter()
                .filter(|&asn| asn != victim && asn != attacker)
                .collect();
            let requested = n_hops - 1;
            if requested > candidates.len() {
                return Err(SimulationError::NotEnoughAses {
                    requested,
                    available: candidates.len(),
                });
            }

            let mut path = Vec::with_capacity(n_hops + 1);
            path.push(victim);
            path.extend(index::sample(rng, candidates.len(), requested).into_iter().map(|i| candidates[i]));
            path.push(attacker);
            path
        }
    };

    Ok(Route::new(victim, path, n_hops == 0, n_hops <= 1, false))
}

/// Inject a forged route at `attacker` and propagate it.
///
/// The attacker sends the route to every neighbor regardless of its own
/// policy and without installing it. Routing tables should already hold
/// the legitimate routes to `victim`.
pub fn hijack_n_hops<R: Rng + ?Sized>(
    engine: &mut SimulationEngine,
    victim: ASN,
    attacker: ASN,
    n_hops: usize,
    rng: &mut R,
) -> Result<(), SimulationError> {
    let bad_route = forged_route(&engine.as_graph, victim, attacker, n_hops, rng)?;
    log::debug!("AS {} hijacks AS {} with {}", attacker, victim, bad_route);

    let attacker_obj = engine
        .as_graph
        .get(&attacker)
        .ok_or(SimulationError::UnknownAs(attacker))?;

    let queue: VecDeque<Route> = attacker_obj
        .neighbors
        .keys()
        .map(|&neighbor| {
            let bgpsec = engine
                .as_graph
                .get(&neighbor)
                .map_or(false, |neighbor| neighbor.bgpsec_enabled);
            bad_route.forward(neighbor, bgpsec)
        })
        .collect();

    engine.propagate(queue);
    Ok(())
}

/// Make `attacker` leak, then propagate routes to `victim` from scratch.
pub fn route_leak(engine: &mut SimulationEngine, victim: ASN, attacker: ASN) -> Result<(), SimulationError> {
    if victim == attacker {
        return Err(SimulationError::SameVictimAndAttacker(victim));
    }
    engine.as_graph.set_policy(attacker, RoutingPolicy::RouteLeak)?;
    engine.clear_routing_tables();
    engine.find_routes_to(victim)
}

/// Share of ASes whose route to `victim` was forged by `attacker`, in
/// percent.
///
/// Every AS holding a route to the victim counts towards the total, the
/// victim's own self-route included. A route is forged when the attacker
/// directly follows the victim in its path, or when the attacker is its
/// origin.
pub fn attacker_success_rate(as_graph: &ASGraph, attacker: ASN, victim: ASN) -> f64 {
    let mut total = 0usize;
    let mut bad = 0usize;

    for as_obj in as_graph.iter() {
        let Some(route) = as_obj.get_route(victim) else { continue };
        total += 1;

        let forged_origin = route.origin() == attacker;
        let forged_link = route
            .path
            .windows(2)
            .any(|pair| pair[0] == victim && pair[1] == attacker);
        if forged_origin || forged_link {
            bad += 1;
        }
    }

    percentage(bad, total)
}

/// First interior AS on `route` that passed on a route it learned from a
/// peer or provider to another peer or provider.
pub fn leaked_route(route: &Route, as_graph: &ASGraph) -> Option<ASN> {
    let upward = |rel: Option<Relationships>| {
        matches!(rel, Some(Relationships::Peers) | Some(Relationships::Providers))
    };

    let path = &route.path;
    (1..path.len().saturating_sub(1)).find_map(|i| {
        let asn = path[i];
        let learned_from = as_graph.relation(asn, path[i - 1]);
        let sent_to = as_graph.relation(asn, path[i + 1]);
        (upward(learned_from) && upward(sent_to)).then_some(asn)
    })
}

/// Share of ASes whose route to `victim` was leaked, in percent.
///
/// Panics if some route was leaked by an AS other than `attacker`: only the
/// attacker runs a leaking policy, so anything else means propagation broke.
pub fn route_leak_success_rate(as_graph: &ASGraph, attacker: ASN, victim: ASN) -> f64 {
    let mut total = 0usize;
    let mut bad = 0usize;

    for as_obj in as_graph.iter() {
        let Some(route) = as_obj.get_route(victim) else { continue };
        total += 1;

        if let Some(offender) = leaked_route(route, as_graph) {
            if offender != attacker {
                panic!(
                    "Attacker mismatches offending AS: expected {}, found {} on {}",
                    attacker, offender, route
                );
            }
            bad += 1;
        }
    }

    percentage(bad, total)
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}
