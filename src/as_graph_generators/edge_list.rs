use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::as_graph::{Edge, ASN};
use crate::shared::TopologyError;

/// Read a JSON list of directed `[provider, customer]` pairs. A pair that
/// also appears reversed is a peering link and yields one peer edge.
pub fn read_edge_list<R: Read>(reader: R, filename: &Path) -> Result<Vec<Edge>, TopologyError> {
    let pairs: Vec<(ASN, ASN)> = serde_json::from_reader(reader).map_err(|source| TopologyError::Json {
        filename: filename.to_path_buf(),
        source,
    })?;

    let directed: HashSet<(ASN, ASN)> = pairs.iter().copied().collect();
    let mut emitted: HashSet<(ASN, ASN)> = HashSet::new();
    let mut edges = Vec::with_capacity(pairs.len());

    for (from, to) in pairs {
        if directed.contains(&(to, from)) {
            let key = (from.min(to), from.max(to));
            if emitted.insert(key) {
                edges.push(Edge::peer(key.0, key.1));
            }
        } else if emitted.insert((from, to)) {
            edges.push(Edge::customer(from, to));
        }
    }

    Ok(edges)
}

pub fn parse_edge_list_file(path: &Path) -> Result<Vec<Edge>, TopologyError> {
    let file = File::open(path).map_err(|source| TopologyError::Io {
        filename: path.to_path_buf(),
        source,
    })?;
    read_edge_list(BufReader::new(file), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reciprocal_pairs_become_one_peer_edge() {
        let json = "[[1, 2], [2, 3], [3, 2], [1, 2]]";
        let edges = read_edge_list(Cursor::new(json), Path::new("graph.json")).unwrap();
        assert_eq!(edges, vec![Edge::customer(1, 2), Edge::peer(2, 3)]);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = read_edge_list(Cursor::new("[[1, 2"), Path::new("graph.json")).unwrap_err();
        assert!(matches!(err, TopologyError::Json { .. }));
    }
}
