#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;

use bgpsecsim::as_graph_generators::read_caida;
use bgpsecsim::{ASGraph, Route, ASN};

/// AS1 on top with customers 2, 3 and 4; a peering layer 5..8 below them;
/// leaves 9..17 and AS18 under AS16.
pub const FIXTURE: &str = "\
# provider|customer|-1, peer|peer|0
1|2|-1
1|3|-1
1|4|-1
2|3|0
2|5|-1
2|6|-1
3|6|-1
3|7|-1
4|7|-1
4|8|-1
5|6|0
6|7|0
7|8|0
5|9|-1
5|10|-1
6|11|-1
6|12|-1
7|13|-1
7|14|-1
8|14|-1
8|15|-1
8|16|-1
9|17|-1
16|18|-1
";

pub fn fixture_graph() -> ASGraph {
    let edges = read_caida(Cursor::new(FIXTURE), Path::new("fixture.txt")).unwrap();
    ASGraph::from_edges(&edges)
}

/// Fixture with an ASPA object on every AS
pub fn aspa_graph() -> ASGraph {
    let mut graph = fixture_graph();
    for asn in graph.asns() {
        graph.create_new_aspa(asn).unwrap();
    }
    graph
}

/// Fixture with AS-Cones objects on every Tier-1 and Tier-2 AS
pub fn ascones_graph() -> ASGraph {
    let mut graph = fixture_graph();
    let publishers: Vec<ASN> = graph.tier_1.iter().chain(graph.tier_2.iter()).copied().collect();
    for asn in publishers {
        graph.create_new_ascones(asn).unwrap();
    }
    graph
}

/// Plain route along `path`, destined to its origin
pub fn route(path: &[ASN]) -> Route {
    Route::new(path[0], path.to_vec(), false, false, false)
}
