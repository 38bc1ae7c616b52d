use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::policies::RoutingPolicy;
use crate::route::Route;
use crate::shared::{CycleError, Relationships, SimulationError, Tier};

pub type ASN = u32;

/// Relationship hint carried by one topology edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// `as2` is a customer of `as1`
    Customer,
    Peer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub as1: ASN,
    pub as2: ASN,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn customer(provider: ASN, customer: ASN) -> Self {
        Edge { as1: provider, as2: customer, kind: EdgeKind::Customer }
    }

    pub fn peer(as1: ASN, as2: ASN) -> Self {
        Edge { as1, as2, kind: EdgeKind::Peer }
    }
}

/// An ASPA (authorized providers) or AS-Cones (authorized customers) record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    pub owner: ASN,
    pub authorized: Vec<ASN>,
}

impl Attestation {
    pub fn new(owner: ASN, authorized: Vec<ASN>) -> Self {
        Attestation { owner, authorized }
    }

    pub fn authorizes(&self, asn: ASN) -> bool {
        self.authorized.contains(&asn)
    }
}

#[derive(Debug, Clone)]
pub struct AS {
    pub asn: ASN,
    /// Relation of each neighbor from this AS's point of view
    pub neighbors: BTreeMap<ASN, Relationships>,
    pub policy: RoutingPolicy,
    pub publishes_rpki: bool,
    pub publishes_path_end: bool,
    pub bgpsec_enabled: bool,
    /// Best known route keyed by destination AS
    pub routing_table: HashMap<ASN, Route>,
    pub aspa: Option<Attestation>,
    pub ascones: Option<Attestation>,
}

impl AS {
    pub fn new(asn: ASN) -> Self {
        let mut as_obj = AS {
            asn,
            neighbors: BTreeMap::new(),
            policy: RoutingPolicy::default(),
            publishes_rpki: false,
            publishes_path_end: false,
            bgpsec_enabled: false,
            routing_table: HashMap::new(),
            aspa: None,
            ascones: None,
        };
        as_obj.reset_routing_table();
        as_obj
    }

    pub fn from_asn_sets(
        asn: ASN,
        peer_asns: HashSet<ASN>,
        provider_asns: HashSet<ASN>,
        customer_asns: HashSet<ASN>,
    ) -> Self {
        let mut as_obj = AS::new(asn);
        for peer in peer_asns {
            as_obj.add_neighbor(peer, Relationships::Peers);
        }
        for provider in provider_asns {
            as_obj.add_neighbor(provider, Relationships::Providers);
        }
        for customer in customer_asns {
            as_obj.add_neighbor(customer, Relationships::Customers);
        }
        as_obj
    }

    pub fn add_neighbor(&mut self, asn: ASN, rel: Relationships) {
        self.neighbors.insert(asn, rel);
    }

    pub fn get_relation(&self, asn: ASN) -> Option<Relationships> {
        self.neighbors.get(&asn).copied()
    }

    /// Neighbors with the given relation, in ascending ASN order
    pub fn get_neighbors(&self, rel: Relationships) -> Vec<ASN> {
        self.neighbors
            .iter()
            .filter(|(_, &r)| r == rel)
            .map(|(&asn, _)| asn)
            .collect()
    }

    pub fn providers(&self) -> Vec<ASN> {
        self.get_neighbors(Relationships::Providers)
    }

    pub fn customers(&self) -> Vec<ASN> {
        self.get_neighbors(Relationships::Customers)
    }

    pub fn peers(&self) -> Vec<ASN> {
        self.get_neighbors(Relationships::Peers)
    }

    pub fn neighbor_counts_by_relation(&self) -> HashMap<Relationships, usize> {
        let mut counts: HashMap<Relationships, usize> =
            Relationships::ALL.iter().map(|&rel| (rel, 0)).collect();
        for rel in self.neighbors.values() {
            *counts.entry(*rel).or_insert(0) += 1;
        }
        counts
    }

    pub fn count_of(&self, rel: Relationships) -> usize {
        self.neighbors.values().filter(|&&r| r == rel).count()
    }

    pub fn get_route(&self, dest: ASN) -> Option<&Route> {
        self.routing_table.get(&dest)
    }

    /// Install a route without consulting the policy
    pub fn force_route(&mut self, route: Route) {
        self.routing_table.insert(route.dest, route);
    }

    pub fn reset_routing_table(&mut self) {
        self.routing_table.clear();
        self.routing_table.insert(self.asn, Route::self_route(self.asn));
    }

    pub fn reset_rpki_objects(&mut self) {
        self.aspa = None;
        self.ascones = None;
    }

    /// Publish an ASPA listing this AS's providers. A Tier-1 AS has no
    /// provider to authorize, so its record authorizes nobody.
    pub fn create_new_aspa(&mut self, is_tier_1: bool) {
        let providers = if is_tier_1 { Vec::new() } else { self.providers() };
        self.aspa = Some(Attestation::new(self.asn, providers));
    }

    pub fn create_new_ascones(&mut self) {
        self.ascones = Some(Attestation::new(self.asn, self.customers()));
    }
}

#[derive(Debug, Clone)]
pub struct ASGraph {
    pub as_dict: HashMap<ASN, AS>,
    pub tier_1: Vec<ASN>,
    pub tier_2: Vec<ASN>,
    pub tier_3: Vec<ASN>,
}

impl ASGraph {
    pub fn new() -> Self {
        ASGraph {
            as_dict: HashMap::new(),
            tier_1: Vec::new(),
            tier_2: Vec::new(),
            tier_3: Vec::new(),
        }
    }

    /// Build the graph from a relationship edge list. Each edge is written
    /// into both endpoints' neighbor tables, then tiers are assigned.
    pub fn from_edges(edges: &[Edge]) -> Self {
        let mut as_graph = ASGraph::new();

        for edge in edges {
            if edge.as1 == edge.as2 {
                log::warn!("Ignoring self-loop edge on AS {}", edge.as1);
                continue;
            }
            let (rel_1, rel_2) = match edge.kind {
                EdgeKind::Customer => (Relationships::Customers, Relationships::Providers),
                EdgeKind::Peer => (Relationships::Peers, Relationships::Peers),
            };
            as_graph
                .as_dict
                .entry(edge.as1)
                .or_insert_with(|| AS::new(edge.as1))
                .add_neighbor(edge.as2, rel_1);
            as_graph
                .as_dict
                .entry(edge.as2)
                .or_insert_with(|| AS::new(edge.as2))
                .add_neighbor(edge.as1, rel_2);
        }

        as_graph.assign_tiers();
        as_graph
    }

    pub fn get(&self, asn: &ASN) -> Option<&AS> {
        self.as_dict.get(asn)
    }

    pub fn get_mut(&mut self, asn: &ASN) -> Option<&mut AS> {
        self.as_dict.get_mut(asn)
    }

    pub fn contains(&self, asn: ASN) -> bool {
        self.as_dict.contains_key(&asn)
    }

    /// Insert an AS as-is. Call `assign_tiers` once all ASes are in.
    pub fn insert(&mut self, as_obj: AS) {
        self.as_dict.insert(as_obj.asn, as_obj);
    }

    pub fn iter(&self) -> impl Iterator<Item = &AS> {
        self.as_dict.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AS> {
        self.as_dict.values_mut()
    }

    pub fn len(&self) -> usize {
        self.as_dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_dict.is_empty()
    }

    /// All ASNs in ascending order. Random sampling goes through this so a
    /// seeded RNG gives the same picks on every run.
    pub fn asns(&self) -> Vec<ASN> {
        let mut asns: Vec<ASN> = self.as_dict.keys().copied().collect();
        asns.sort_unstable();
        asns
    }

    pub fn relation(&self, from: ASN, to: ASN) -> Option<Relationships> {
        self.get(&from).and_then(|as_obj| as_obj.get_relation(to))
    }

    /// Tier-3 = no customers, Tier-1 = no providers, Tier-2 = the rest.
    /// An AS with neither lands in Tier-3.
    pub fn assign_tiers(&mut self) {
        self.tier_1.clear();
        self.tier_2.clear();
        self.tier_3.clear();

        for asn in self.asns() {
            let as_obj = &self.as_dict[&asn];
            if as_obj.count_of(Relationships::Customers) == 0 {
                self.tier_3.push(asn);
            } else if as_obj.count_of(Relationships::Providers) == 0 {
                self.tier_1.push(asn);
            } else {
                self.tier_2.push(asn);
            }
        }
    }

    pub fn tier(&self, tier: Tier) -> &[ASN] {
        match tier {
            Tier::One => &self.tier_1,
            Tier::Two => &self.tier_2,
            Tier::Three => &self.tier_3,
        }
    }

    pub fn tier_of(&self, asn: ASN) -> Option<Tier> {
        [Tier::One, Tier::Two, Tier::Three]
            .into_iter()
            .find(|&tier| self.tier(tier).binary_search(&asn).is_ok())
    }

    pub fn is_tier_1(&self, asn: ASN) -> bool {
        self.tier_1.binary_search(&asn).is_ok()
    }

    /// Provider-to-customer edges must form a DAG
    pub fn check_for_cycles(&self) -> Result<(), CycleError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            InProgress,
            Done,
        }

        let mut marks: HashMap<ASN, Mark> = HashMap::with_capacity(self.as_dict.len());

        for start in self.asns() {
            if marks.contains_key(&start) {
                continue;
            }
            marks.insert(start, Mark::InProgress);
            let mut stack: Vec<(ASN, Vec<ASN>)> = vec![(start, self.as_dict[&start].customers())];

            loop {
                let (asn, next) = match stack.last_mut() {
                    Some((asn, children)) => (*asn, children.pop()),
                    None => break,
                };

                match next {
                    Some(child) => match marks.get(&child) {
                        Some(Mark::InProgress) => return Err(CycleError),
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(child, Mark::InProgress);
                            let children = self
                                .get(&child)
                                .map(|as_obj| as_obj.customers())
                                .unwrap_or_default();
                            stack.push((child, children));
                        }
                    },
                    None => {
                        marks.insert(asn, Mark::Done);
                        stack.pop();
                    }
                }
            }
        }

        Ok(())
    }

    pub fn any_customer_provider_cycles(&self) -> bool {
        self.check_for_cycles().is_err()
    }

    pub fn reset_policies(&mut self) {
        self.set_all_policies(RoutingPolicy::default());
    }

    pub fn set_all_policies(&mut self, policy: RoutingPolicy) {
        for as_obj in self.as_dict.values_mut() {
            as_obj.policy = policy;
        }
    }

    pub fn set_policy(&mut self, asn: ASN, policy: RoutingPolicy) -> Result<(), SimulationError> {
        let as_obj = self.get_mut(&asn).ok_or(SimulationError::UnknownAs(asn))?;
        as_obj.policy = policy;
        Ok(())
    }

    pub fn clear_rpki_objects(&mut self) {
        for as_obj in self.as_dict.values_mut() {
            as_obj.reset_rpki_objects();
        }
    }

    pub fn clear_routing_tables(&mut self) {
        for as_obj in self.as_dict.values_mut() {
            as_obj.reset_routing_table();
        }
    }

    pub fn create_new_aspa(&mut self, asn: ASN) -> Result<(), SimulationError> {
        let is_tier_1 = self.is_tier_1(asn);
        let as_obj = self.get_mut(&asn).ok_or(SimulationError::UnknownAs(asn))?;
        as_obj.create_new_aspa(is_tier_1);
        Ok(())
    }

    pub fn create_new_ascones(&mut self, asn: ASN) -> Result<(), SimulationError> {
        let as_obj = self.get_mut(&asn).ok_or(SimulationError::UnknownAs(asn))?;
        as_obj.create_new_ascones();
        Ok(())
    }

    /// Top ISPs by customer degree, ties broken by lower ASN
    pub fn identify_top_isps(&self, n: usize) -> Vec<ASN> {
        self.rank_by_customers(self.asns(), n)
    }

    pub fn identify_top_isps_in(&self, tier: Tier, n: usize) -> Vec<ASN> {
        self.rank_by_customers(self.tier(tier).to_vec(), n)
    }

    fn rank_by_customers(&self, mut asns: Vec<ASN>, n: usize) -> Vec<ASN> {
        asns.sort_by_key(|asn| {
            let customers = self.as_dict[asn].count_of(Relationships::Customers);
            (std::cmp::Reverse(customers), *asn)
        });
        asns.truncate(n);
        asns
    }

    /// Distinct providers of the given ASes
    pub fn get_providers(&self, asns: &[ASN]) -> Vec<ASN> {
        let mut providers: Vec<ASN> = asns
            .iter()
            .filter_map(|asn| self.get(asn))
            .flat_map(|as_obj| as_obj.providers())
            .collect::<HashSet<ASN>>()
            .into_iter()
            .collect();
        providers.sort_unstable();
        providers
    }

    /// Number of ASes with a valley-free path to `asn`, itself included.
    pub fn reachable_from_count(&self, asn: ASN) -> usize {
        if !self.contains(asn) {
            return 0;
        }

        // A route may still climb to providers or cross one peer link until
        // it has gone down once.
        let mut climbing: HashSet<ASN> = HashSet::from([asn]);
        let mut descending: HashSet<ASN> = HashSet::new();
        let mut queue = VecDeque::from([(asn, true)]);

        while let Some((current, may_climb)) = queue.pop_front() {
            let Some(as_obj) = self.get(&current) else { continue };
            for (&neighbor, &rel) in &as_obj.neighbors {
                let next = match (may_climb, rel) {
                    (true, Relationships::Providers) => Some(true),
                    (true, Relationships::Peers) => Some(false),
                    (_, Relationships::Customers) => Some(false),
                    _ => None,
                };
                if let Some(next_may_climb) = next {
                    let seen = if next_may_climb { &mut climbing } else { &mut descending };
                    if seen.insert(neighbor) {
                        queue.push_back((neighbor, next_may_climb));
                    }
                }
            }
        }

        climbing.union(&descending).count()
    }

    /// Number of ASes running each policy, keyed by policy name
    pub fn policy_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for as_obj in self.as_dict.values() {
            *counts.entry(as_obj.policy.name()).or_insert(0) += 1;
        }
        counts
    }
}

impl Default for ASGraph {
    fn default() -> Self {
        Self::new()
    }
}
