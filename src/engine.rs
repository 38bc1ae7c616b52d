use std::collections::{HashMap, VecDeque};

use crate::as_graph::{ASGraph, ASN};
use crate::route::Route;
use crate::shared::{Relationships, SimulationError};

/// Breadth-first path-vector propagation over an owned AS graph.
///
/// The engine is not reentrant: one destination is propagated at a time and
/// routing tables must be cleared between independent runs.
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    pub as_graph: ASGraph,
}

impl SimulationEngine {
    pub fn new(as_graph: ASGraph) -> Self {
        SimulationEngine { as_graph }
    }

    /// Reset every AS to its default policy, drop attestation objects and
    /// routing state. Call before each independent trial.
    pub fn reset(&mut self) {
        self.as_graph.reset_policies();
        self.as_graph.clear_rpki_objects();
        self.as_graph.clear_routing_tables();
    }

    pub fn clear_routing_tables(&mut self) {
        self.as_graph.clear_routing_tables();
    }

    /// Let `dest` originate its self-route and propagate until every AS has
    /// settled on a best route to it.
    pub fn find_routes_to(&mut self, dest: ASN) -> Result<(), SimulationError> {
        let origin = self
            .as_graph
            .get(&dest)
            .ok_or(SimulationError::UnknownAs(dest))?;

        let queue: VecDeque<Route> = origin
            .neighbors
            .keys()
            .map(|&neighbor| Route::new(dest, vec![dest, neighbor], false, false, origin.bgpsec_enabled))
            .collect();

        let installed = self.propagate(queue);
        log::debug!("Propagated routes to AS {}: {} installations", dest, installed);
        Ok(())
    }

    /// Drain a queue of routes offered to their final AS. Returns how many
    /// routes were installed.
    pub fn propagate(&mut self, mut queue: VecDeque<Route>) -> usize {
        let mut installed = 0;
        while let Some(route) = queue.pop_front() {
            if let Some(forwarded) = self.learn_route(route) {
                installed += 1;
                queue.extend(forwarded);
            }
        }
        installed
    }

    /// Offer `route` to `route.final_as()`.
    ///
    /// Returns `None` if the route was rejected or not strictly preferred.
    /// Otherwise the route is installed and the copies to send to neighbors
    /// are returned.
    pub fn learn_route(&mut self, mut route: Route) -> Option<Vec<Route>> {
        let asn = route.final_as();
        if route.dest == asn {
            return None;
        }

        let as_obj = self.as_graph.get(&asn)?;
        let policy = as_obj.policy;

        if !policy.accept_route(&mut route, &self.as_graph) {
            return None;
        }

        if let Some(current) = as_obj.get_route(route.dest) {
            if !policy.prefer_route(current, &route, &self.as_graph) {
                return None;
            }
        }

        let mut forwarded = Vec::new();
        for relation in Relationships::ALL {
            let mut outgoing = route.clone();
            if !policy.forward_to(&mut outgoing, relation, &self.as_graph) {
                continue;
            }
            for neighbor in as_obj.get_neighbors(relation) {
                let bgpsec = self
                    .as_graph
                    .get(&neighbor)
                    .map_or(false, |neighbor| neighbor.bgpsec_enabled);
                forwarded.push(outgoing.forward(neighbor, bgpsec));
            }
        }

        if let Some(as_obj) = self.as_graph.get_mut(&asn) {
            as_obj.force_route(route);
        }
        Some(forwarded)
    }

    /// Path of the route every AS holds to `dest`
    pub fn get_local_rib_snapshot(&self, dest: ASN) -> HashMap<ASN, Vec<ASN>> {
        self.as_graph
            .iter()
            .filter_map(|as_obj| {
                as_obj
                    .get_route(dest)
                    .map(|route| (as_obj.asn, route.path.clone()))
            })
            .collect()
    }

    /// Number of ASes holding a route to `dest`, `dest` itself included
    pub fn route_count(&self, dest: ASN) -> usize {
        self.as_graph
            .iter()
            .filter(|as_obj| as_obj.get_route(dest).is_some())
            .count()
    }
}
