//! ASPA / AS-Cones path verification.
//!
//! Both attestations answer the same question, "is `b` a provider of `a`?",
//! from opposite ends: ASPA is published by the customer and lists its
//! providers, AS-Cones is published by the provider and lists its customers.

use serde::{Deserialize, Serialize};

use crate::as_graph::{ASGraph, ASN};
use crate::route::Route;
use crate::shared::{Relationships, SimulationError, ValidationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttestationKind {
    Aspa,
    AsCones,
}

impl AttestationKind {
    /// `Some(true)` if the relevant record lists the hop, `Some(false)` if
    /// the record exists but does not, `None` if there is no record.
    pub fn provider_attested(&self, as_graph: &ASGraph, customer: ASN, provider: ASN) -> Option<bool> {
        match self {
            AttestationKind::Aspa => as_graph
                .get(&customer)?
                .aspa
                .as_ref()
                .map(|aspa| aspa.authorizes(provider)),
            AttestationKind::AsCones => as_graph
                .get(&provider)?
                .ascones
                .as_ref()
                .map(|ascones| ascones.authorizes(customer)),
        }
    }

    /// Publish this kind of record for `asn`
    pub fn create_object(&self, as_graph: &mut ASGraph, asn: ASN) -> Result<(), SimulationError> {
        match self {
            AttestationKind::Aspa => as_graph.create_new_aspa(asn),
            AttestationKind::AsCones => as_graph.create_new_ascones(asn),
        }
    }
}

/// Classify `route` as seen by the AS holding it.
///
/// Panics if the holder has no relation to the neighbor it learned the
/// route from; that means the propagation state is already corrupt.
pub fn verify_path(route: &Route, as_graph: &ASGraph, kind: AttestationKind) -> ValidationState {
    let validator = route.final_as();
    let next_hop = route.first_hop();

    match as_graph.relation(validator, next_hop) {
        Some(Relationships::Customers) | Some(Relationships::Peers) => {
            verify_upstream(&route.path, as_graph, kind)
        }
        Some(Relationships::Providers) => verify_downstream(&route.path, as_graph, kind),
        None => panic!(
            "AS {} validated a route from {} which is not its neighbor: {}",
            validator, next_hop, route
        ),
    }
}

/// Route came from a customer or peer: every hop before the validator must
/// be an attested customer-to-provider hop.
fn verify_upstream(path: &[ASN], as_graph: &ASGraph, kind: AttestationKind) -> ValidationState {
    let hops = 0..path.len().saturating_sub(2);
    // ASPA scans from the origin, AS-Cones from the validator. The first
    // missing or mismatching record decides.
    let order: Vec<usize> = match kind {
        AttestationKind::Aspa => hops.collect(),
        AttestationKind::AsCones => hops.rev().collect(),
    };

    for i in order {
        match kind.provider_attested(as_graph, path[i], path[i + 1]) {
            None => return ValidationState::Unknown,
            Some(false) => return ValidationState::Invalid,
            Some(true) => {}
        }
    }
    ValidationState::Valid
}

/// Route came from a provider: the path may climb an up-ramp from the
/// origin, cross the apex, then descend a down-ramp to the validator.
fn verify_downstream(path: &[ASN], as_graph: &ASGraph, kind: AttestationKind) -> ValidationState {
    let n = path.len();
    if n <= 3 {
        return ValidationState::Valid;
    }

    // Up-ramp pairs walk from the origin, down-ramp pairs from the
    // validator. Positions below are 1-based like the draft's.
    let up = |i: usize| kind.provider_attested(as_graph, path[i], path[i + 1]);
    let down = |i: usize| kind.provider_attested(as_graph, path[n - 1 - i], path[n - 2 - i]);

    let u_min = (0..n - 2)
        .find(|&i| up(i) == Some(false))
        .map_or(n, |i| i + 2);
    let v_max = (1..n - 1)
        .find(|&i| down(i) == Some(false))
        .map_or(0, |i| n - 1 - i);

    if u_min <= v_max {
        return ValidationState::Invalid;
    }

    let k = (0..n - 2)
        .take_while(|&i| up(i) == Some(true))
        .last()
        .map_or(1, |i| i + 2);
    let l = (1..n - 1)
        .take_while(|&i| down(i) == Some(true))
        .last()
        .map_or(n - 1, |i| n - 1 - i);

    if l as isize - k as isize <= 1 {
        ValidationState::Valid
    } else {
        ValidationState::Unknown
    }
}
