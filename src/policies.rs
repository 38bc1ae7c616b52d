use serde::{Deserialize, Serialize};

use crate::as_graph::ASGraph;
use crate::path_validation::{verify_path, AttestationKind};
use crate::route::Route;
use crate::shared::{Relationships, ValidationState};

/// Routing policy run by one AS.
///
/// Every policy rejects paths that visit an AS twice. Past that, policies
/// differ in which routes they accept, how they rank two routes to the same
/// destination, and which neighbors they forward to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoutingPolicy {
    /// Plain Gao-Rexford BGP
    #[default]
    Default,
    /// Drop origin-invalid routes
    Rpki,
    /// Drop routes whose first hop lacks a path-end record
    PathEndValidation,
    /// Authentication outranks everything else
    BgpsecHigh,
    /// Authentication right after local preference
    BgpsecMed,
    /// Authentication only breaks path-length ties
    BgpsecLow,
    /// Attacker behaviour: forward to every neighbor
    RouteLeak,
    Aspa,
    AsCones,
    /// Tag routes learned from providers and peers, drop tagged routes
    /// coming back up
    DownOnly,
    /// RFC 9234 style only-to-customer attribute
    OnlyToCustomer,
}

/// One step of the lexicographic route comparison. Each rule maps a route to
/// a key where lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceRule {
    LocalPref,
    PathLength,
    NextHop,
    Authenticated,
}

impl PreferenceRule {
    pub fn key(&self, route: &Route, as_graph: &ASGraph) -> i64 {
        match self {
            // A route from a non-neighbor ranks above every real relation
            PreferenceRule::LocalPref => as_graph
                .relation(route.final_as(), route.first_hop())
                .map_or(-1, |rel| rel.rank()),
            PreferenceRule::PathLength => route.len() as i64,
            PreferenceRule::NextHop => i64::from(route.first_hop()),
            PreferenceRule::Authenticated => i64::from(!route.authenticated),
        }
    }
}

const DEFAULT_RULES: &[PreferenceRule] = &[
    PreferenceRule::LocalPref,
    PreferenceRule::PathLength,
    PreferenceRule::NextHop,
];

const BGPSEC_HIGH_RULES: &[PreferenceRule] = &[
    PreferenceRule::Authenticated,
    PreferenceRule::LocalPref,
    PreferenceRule::PathLength,
    PreferenceRule::NextHop,
];

const BGPSEC_MED_RULES: &[PreferenceRule] = &[
    PreferenceRule::LocalPref,
    PreferenceRule::Authenticated,
    PreferenceRule::PathLength,
    PreferenceRule::NextHop,
];

const BGPSEC_LOW_RULES: &[PreferenceRule] = &[
    PreferenceRule::LocalPref,
    PreferenceRule::PathLength,
    PreferenceRule::Authenticated,
    PreferenceRule::NextHop,
];

impl RoutingPolicy {
    pub const ALL: [RoutingPolicy; 11] = [
        RoutingPolicy::Default,
        RoutingPolicy::Rpki,
        RoutingPolicy::PathEndValidation,
        RoutingPolicy::BgpsecHigh,
        RoutingPolicy::BgpsecMed,
        RoutingPolicy::BgpsecLow,
        RoutingPolicy::RouteLeak,
        RoutingPolicy::Aspa,
        RoutingPolicy::AsCones,
        RoutingPolicy::DownOnly,
        RoutingPolicy::OnlyToCustomer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RoutingPolicy::Default => "DefaultPolicy",
            RoutingPolicy::Rpki => "RPKIPolicy",
            RoutingPolicy::PathEndValidation => "PathEndValidationPolicy",
            RoutingPolicy::BgpsecHigh => "BGPsecHighSecPolicy",
            RoutingPolicy::BgpsecMed => "BGPsecMedSecPolicy",
            RoutingPolicy::BgpsecLow => "BGPsecLowSecPolicy",
            RoutingPolicy::RouteLeak => "RouteLeakPolicy",
            RoutingPolicy::Aspa => "ASPAPolicy",
            RoutingPolicy::AsCones => "ASCONESPolicy",
            RoutingPolicy::DownOnly => "DownOnlyPolicy",
            RoutingPolicy::OnlyToCustomer => "OnlyToCustomerPolicy",
        }
    }

    pub fn from_name(name: &str) -> Option<RoutingPolicy> {
        RoutingPolicy::ALL.into_iter().find(|policy| policy.name() == name)
    }

    pub fn preference_rules(&self) -> &'static [PreferenceRule] {
        match self {
            RoutingPolicy::BgpsecHigh => BGPSEC_HIGH_RULES,
            RoutingPolicy::BgpsecMed => BGPSEC_MED_RULES,
            RoutingPolicy::BgpsecLow => BGPSEC_LOW_RULES,
            _ => DEFAULT_RULES,
        }
    }

    /// Ingress filter for a route just received by `route.final_as()`.
    ///
    /// Down-Only and Only-to-Customer may append to the route's community
    /// marker while checking it.
    pub fn accept_route(&self, route: &mut Route, as_graph: &ASGraph) -> bool {
        if route.contains_cycle() {
            return false;
        }

        match self {
            RoutingPolicy::Default | RoutingPolicy::RouteLeak => true,
            RoutingPolicy::Rpki
            | RoutingPolicy::BgpsecHigh
            | RoutingPolicy::BgpsecMed
            | RoutingPolicy::BgpsecLow => !route.origin_invalid,
            RoutingPolicy::PathEndValidation => !route.path_end_invalid,
            RoutingPolicy::Aspa => {
                verify_path(route, as_graph, AttestationKind::Aspa) != ValidationState::Invalid
            }
            RoutingPolicy::AsCones => {
                verify_path(route, as_graph, AttestationKind::AsCones) != ValidationState::Invalid
            }
            RoutingPolicy::DownOnly => check_community_marker(route, as_graph, false),
            RoutingPolicy::OnlyToCustomer => check_community_marker(route, as_graph, true),
        }
    }

    /// True if `new` beats `current`. Ties keep the current route.
    pub fn prefer_route(&self, current: &Route, new: &Route, as_graph: &ASGraph) -> bool {
        assert_eq!(
            current.final_as(),
            new.final_as(),
            "can only compare routes held by the same AS"
        );

        for rule in self.preference_rules() {
            let current_key = rule.key(current, as_graph);
            let new_key = rule.key(new, as_graph);
            if new_key != current_key {
                return new_key < current_key;
            }
        }
        false
    }

    /// Whether the holder of `route` sends it to neighbors with `relation`.
    ///
    /// `route` is the copy about to go out; Only-to-Customer stamps its
    /// marker here.
    pub fn forward_to(&self, route: &mut Route, relation: Relationships, as_graph: &ASGraph) -> bool {
        match self {
            RoutingPolicy::RouteLeak => true,
            RoutingPolicy::OnlyToCustomer => {
                if !gao_rexford_forward(route, relation, as_graph) {
                    return false;
                }
                if route.marker_set() {
                    relation == Relationships::Customers
                } else {
                    if matches!(relation, Relationships::Customers | Relationships::Peers) {
                        route.community_marker.push(route.final_as());
                    }
                    true
                }
            }
            _ => gao_rexford_forward(route, relation, as_graph),
        }
    }
}

/// Customer routes go everywhere, everything else only to customers.
fn gao_rexford_forward(route: &Route, relation: Relationships, as_graph: &ASGraph) -> bool {
    let learned_from = as_graph.relation(route.final_as(), route.first_hop());
    if learned_from.is_none() {
        panic!(
            "AS {} holds a route from non-neighbor {}: {}",
            route.final_as(),
            route.first_hop(),
            route
        );
    }
    learned_from == Some(Relationships::Customers) || relation == Relationships::Customers
}

/// Down-Only / Only-to-Customer ingress check, from the receiver's view of
/// the neighbor the route came from.
///
/// A marked route must never arrive from a customer, and from a peer only if
/// that peer is the one that marked it. Down-Only tags every route from a
/// provider or peer with the sender; Only-to-Customer tags it only once.
fn check_community_marker(route: &mut Route, as_graph: &ASGraph, only_to_customer: bool) -> bool {
    let sender = route.first_hop();
    let relation = as_graph.relation(route.final_as(), sender);
    let marked = route.marker_set();

    if marked {
        match relation {
            Some(Relationships::Customers) => return false,
            Some(Relationships::Peers) => {
                if route.community_marker.iter().any(|&tag| tag != sender) {
                    return false;
                }
            }
            _ => {}
        }
    }

    let from_above = matches!(relation, Some(Relationships::Providers) | Some(Relationships::Peers));
    if from_above && !(only_to_customer && marked) {
        route.community_marker.push(sender);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::as_graph::Edge;

    // 1 is the provider of 2 and 3, 2 and 3 peer, 4 is a customer of 2 and 3
    fn diamond() -> ASGraph {
        ASGraph::from_edges(&[
            Edge::customer(1, 2),
            Edge::customer(1, 3),
            Edge::peer(2, 3),
            Edge::customer(2, 4),
            Edge::customer(3, 4),
        ])
    }

    #[test]
    fn names_round_trip() {
        for policy in RoutingPolicy::ALL {
            assert_eq!(RoutingPolicy::from_name(policy.name()), Some(policy));
        }
        assert_eq!(RoutingPolicy::from_name("NoSuchPolicy"), None);
    }

    #[test]
    fn next_hop_breaks_ties() {
        let graph = diamond();
        let via_2 = Route::new(5, vec![5, 2, 4], false, false, false);
        let via_3 = Route::new(5, vec![5, 3, 4], false, false, false);
        let policy = RoutingPolicy::Default;

        assert!(policy.prefer_route(&via_3, &via_2, &graph));
        assert!(!policy.prefer_route(&via_2, &via_3, &graph));
        assert!(!policy.prefer_route(&via_2, &via_2.clone(), &graph));
    }

    #[test]
    fn missing_relation_outranks_customers() {
        let graph = diamond();
        let stray = Route::new(9, vec![9, 7, 1], false, false, false);
        let customer = Route::new(9, vec![9, 2, 1], false, false, false);
        assert_eq!(PreferenceRule::LocalPref.key(&stray, &graph), -1);
        assert!(RoutingPolicy::Default.prefer_route(&customer, &stray, &graph));
    }

    #[test]
    fn only_to_customer_marks_outgoing_copy() {
        let graph = diamond();
        // AS 2 learned this from its customer 4
        let mut to_peer = Route::new(4, vec![4, 2], false, false, false);
        assert!(RoutingPolicy::OnlyToCustomer.forward_to(&mut to_peer, Relationships::Peers, &graph));
        assert_eq!(to_peer.community_marker, vec![2]);

        let mut to_provider = Route::new(4, vec![4, 2], false, false, false);
        assert!(RoutingPolicy::OnlyToCustomer.forward_to(&mut to_provider, Relationships::Providers, &graph));
        assert!(to_provider.community_marker.is_empty());

        let mut marked = Route::new(4, vec![4, 2], false, false, false);
        marked.community_marker.push(4);
        assert!(!RoutingPolicy::OnlyToCustomer.forward_to(&mut marked, Relationships::Providers, &graph));
        assert!(RoutingPolicy::OnlyToCustomer.forward_to(&mut marked, Relationships::Customers, &graph));
    }
}
