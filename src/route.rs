use std::collections::HashSet;
use std::fmt;

use crate::as_graph::ASN;

/// A path record held in some AS's routing table.
///
/// `path[0]` is the origin and the last element is the AS currently holding
/// the route. Forwarding never mutates a route; it builds a longer copy.
/// The only field written after construction is `community_marker`, which
/// the Down-Only and Only-to-Customer policies append to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub dest: ASN,
    pub path: Vec<ASN>,
    /// No valid RPKI record where one is expected
    pub origin_invalid: bool,
    /// First hop lacks a valid path-end record
    pub path_end_invalid: bool,
    /// BGPsec chain intact
    pub authenticated: bool,
    pub community_marker: Vec<ASN>,
}

impl Route {
    pub fn new(
        dest: ASN,
        path: Vec<ASN>,
        origin_invalid: bool,
        path_end_invalid: bool,
        authenticated: bool,
    ) -> Self {
        assert!(!path.is_empty(), "a route needs at least one AS in its path");
        Route {
            dest,
            path,
            origin_invalid,
            path_end_invalid,
            authenticated,
            community_marker: Vec::new(),
        }
    }

    /// The trivial route every AS holds to itself
    pub fn self_route(asn: ASN) -> Self {
        Route::new(asn, vec![asn], false, false, true)
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn origin(&self) -> ASN {
        self.path[0]
    }

    pub fn final_as(&self) -> ASN {
        self.path[self.path.len() - 1]
    }

    /// Neighbor the final AS learned this route from. For a single-element
    /// path this is the AS itself.
    pub fn first_hop(&self) -> ASN {
        self.path[self.path.len().saturating_sub(2)]
    }

    pub fn contains_cycle(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.path.len());
        !self.path.iter().all(|asn| seen.insert(*asn))
    }

    pub fn marker_set(&self) -> bool {
        !self.community_marker.is_empty()
    }

    /// Copy of this route as received by `next_hop`.
    pub fn forward(&self, next_hop: ASN, next_hop_bgpsec: bool) -> Route {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(next_hop);
        Route {
            dest: self.dest,
            path,
            origin_invalid: self.origin_invalid,
            path_end_invalid: self.path_end_invalid,
            authenticated: self.authenticated && next_hop_bgpsec,
            community_marker: self.community_marker.clone(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: Vec<String> = self.path.iter().map(|asn| asn.to_string()).collect();
        write!(
            f,
            "Route(dest={}, path=[{}], origin_invalid={}, path_end_invalid={}, authenticated={})",
            self.dest,
            path.join(", "),
            self.origin_invalid,
            self.path_end_invalid,
            self.authenticated
        )
    }
}
