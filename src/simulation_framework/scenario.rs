use rand::Rng;

use crate::as_graph::{ASGraph, ASN};
use crate::attacks::{attacker_success_rate, hijack_n_hops, route_leak, route_leak_success_rate};
use crate::engine::SimulationEngine;
use crate::policies::RoutingPolicy;
use crate::shared::SimulationError;

use super::scenario_config::{AttackKind, ScenarioConfig};

/// (victim, attacker)
pub type Trial = (ASN, ASN);

/// Runs trials of one scenario config against an engine
#[derive(Debug, Clone)]
pub struct Scenario {
    pub config: ScenarioConfig,
}

impl Scenario {
    pub fn new(config: ScenarioConfig) -> Self {
        Scenario { config }
    }

    /// Put the graph into this scenario's starting state: base policy and
    /// BGPsec capability everywhere, then the deployment's policy and
    /// attestation objects on the adopting ASes.
    ///
    /// Expects policies and attestation objects to have been reset already.
    pub fn apply_deployment<R: Rng + ?Sized>(
        &self,
        as_graph: &mut ASGraph,
        rng: &mut R,
    ) -> Result<(), SimulationError> {
        as_graph.set_all_policies(self.config.base_policy);
        for as_obj in as_graph.iter_mut() {
            as_obj.bgpsec_enabled = self.config.bgpsec_everywhere;
            as_obj.publishes_rpki = false;
            as_obj.publishes_path_end = false;
        }

        let Some(deployment) = &self.config.deployment else {
            return Ok(());
        };

        if let Some(policy) = deployment.policy {
            let adopters = deployment.policy_adoption.select(as_graph, rng);
            log::debug!("{} ASes adopt {}", adopters.len(), policy.name());
            for asn in adopters {
                as_graph.set_policy(asn, policy)?;
                let as_obj = as_graph.get_mut(&asn).ok_or(SimulationError::UnknownAs(asn))?;
                match policy {
                    RoutingPolicy::Rpki => as_obj.publishes_rpki = true,
                    RoutingPolicy::PathEndValidation => as_obj.publishes_path_end = true,
                    RoutingPolicy::BgpsecHigh | RoutingPolicy::BgpsecMed | RoutingPolicy::BgpsecLow => {
                        as_obj.bgpsec_enabled = true
                    }
                    _ => {}
                }
            }
        }

        if let Some(kind) = deployment.attestation {
            let publishers = deployment.attestation_adoption.select(as_graph, rng);
            log::debug!("{} ASes publish {:?} objects", publishers.len(), kind);
            for asn in publishers {
                kind.create_object(as_graph, asn)?;
            }
        }

        Ok(())
    }

    /// Run one trial from a clean slate and return the attack's success
    /// rate in percent.
    pub fn run_trial<R: Rng + ?Sized>(
        &self,
        engine: &mut SimulationEngine,
        (victim, attacker): Trial,
        rng: &mut R,
    ) -> Result<f64, SimulationError> {
        for asn in [victim, attacker] {
            if !engine.as_graph.contains(asn) {
                return Err(SimulationError::UnknownAs(asn));
            }
        }

        engine.reset();
        self.apply_deployment(&mut engine.as_graph, rng)?;

        match self.config.attack {
            AttackKind::Hijack { n_hops } => {
                engine.as_graph.set_policy(attacker, RoutingPolicy::Default)?;
                engine.clear_routing_tables();
                engine.find_routes_to(victim)?;
                hijack_n_hops(engine, victim, attacker, n_hops, rng)?;
                Ok(attacker_success_rate(&engine.as_graph, attacker, victim))
            }
            AttackKind::RouteLeak => {
                route_leak(engine, victim, attacker)?;
                Ok(route_leak_success_rate(&engine.as_graph, attacker, victim))
            }
        }
    }
}
