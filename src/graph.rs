//! Input parsing for undirected simple graphs in SNAP edge-list and DIMACS
//! formats. Both readers produce the same internal model: 0-indexed sorted
//! adjacency lists plus a map back to the original vertex labels.

use std::io::BufRead;

use fxhash::FxHashMap;

use crate::cust_error::ImportError;

/// An undirected simple graph with external vertex labels.
///
/// `adj[v]` lists the neighbors of internal vertex `v` in ascending order,
/// free of duplicates and self-loops. `vertex_id[v]` is the label the vertex
/// carried in the input file; it is only used for reporting.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Graph {
    pub adj: Vec<Vec<usize>>,
    pub vertex_id: Vec<usize>,
}

impl Graph {
    pub fn num_vertices(&self) -> usize {
        self.adj.len()
    }

    pub fn num_edges(&self) -> usize {
        self.adj.iter().map(|a| a.len()).sum::<usize>() / 2
    }

    /// Reads a SNAP-style edge list: `#`-prefixed comment lines, then one
    /// `u v` pair per line with arbitrary positive vertex labels. Duplicate
    /// edges in either orientation and self-loops are ignored. Labels are
    /// remapped to 0..n in ascending label order.
    pub fn read_snap<R: BufRead>(input: R) -> Result<Self, ImportError> {
        let mut edges: Vec<(usize, usize)> = Vec::new();
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut s = line.split_whitespace();
            let u: usize = s.next().ok_or(ImportError::Malformed)?.parse()?;
            let v: usize = s.next().ok_or(ImportError::Malformed)?.parse()?;
            if s.next().is_some() {
                return Err(ImportError::Malformed);
            }
            if u != v {
                edges.push((u, v));
            }
        }
        if edges.is_empty() {
            return Err(ImportError::Malformed);
        }
        let mut vertex_id: Vec<usize> = edges
            .iter()
            .flat_map(|&(u, v)| [u, v])
            .collect();
        vertex_id.sort_unstable();
        vertex_id.dedup();
        let index_of: FxHashMap<usize, usize> = vertex_id
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();
        let mut adj = vec![Vec::new(); vertex_id.len()];
        for (u, v) in edges {
            let ui = index_of[&u];
            let vi = index_of[&v];
            adj[ui].push(vi);
            adj[vi].push(ui);
        }
        for list in adj.iter_mut() {
            list.sort_unstable();
            list.dedup();
        }
        Ok(Graph { adj, vertex_id })
    }

    /// Reads a DIMACS graph: `c` comment lines, a `p edge <n> <m>` header,
    /// then `e u v` lines with 1-based vertex ids.
    pub fn read_dimacs<R: BufRead>(input: R) -> Result<Self, ImportError> {
        let mut n = None;
        let mut adj: Vec<Vec<usize>> = Vec::new();
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('c') {
                continue;
            }
            let mut s = line.split_whitespace();
            match s.next() {
                Some("p") => {
                    if s.next() != Some("edge") {
                        return Err(ImportError::Malformed);
                    }
                    let vertices: usize =
                        s.next().ok_or(ImportError::Malformed)?.parse()?;
                    let _edges: usize =
                        s.next().ok_or(ImportError::Malformed)?.parse()?;
                    n = Some(vertices);
                    adj = vec![Vec::new(); vertices];
                }
                Some("e") => {
                    let n = n.ok_or(ImportError::Malformed)?;
                    let u: usize = s.next().ok_or(ImportError::Malformed)?.parse()?;
                    let v: usize = s.next().ok_or(ImportError::Malformed)?.parse()?;
                    if u < 1 || v < 1 || u > n || v > n {
                        return Err(ImportError::Malformed);
                    }
                    if u != v {
                        adj[u - 1].push(v - 1);
                        adj[v - 1].push(u - 1);
                    }
                }
                _ => return Err(ImportError::Malformed),
            }
        }
        if n.is_none() {
            return Err(ImportError::Malformed);
        }
        for list in adj.iter_mut() {
            list.sort_unstable();
            list.dedup();
        }
        let vertex_id = (1..=adj.len()).collect();
        Ok(Graph { adj, vertex_id })
    }

    /// Tries the SNAP edge-list reader first and falls back to DIMACS if the
    /// content does not parse as an edge list.
    pub fn read_auto(content: &str) -> Result<Self, ImportError> {
        match Self::read_snap(content.as_bytes()) {
            Ok(graph) => Ok(graph),
            Err(_) => Self::read_dimacs(content.as_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_snap_test() {
        let input = Cursor::new("# a comment\n1 2\n2 3\n3 1\n2 1\n");
        let graph = Graph::read_snap(input);
        assert!(graph.is_ok());
        let graph = graph.unwrap();
        assert_eq!(graph.num_vertices(), 3);
        assert_eq!(graph.num_edges(), 3);
        assert_eq!(graph.vertex_id, vec![1, 2, 3]);
        assert_eq!(graph.adj[0], vec![1, 2]);
    }

    #[test]
    fn read_snap_sparse_ids_test() {
        let input = Cursor::new("10 20\n20 405\n");
        let graph = Graph::read_snap(input).unwrap();
        assert_eq!(graph.num_vertices(), 3);
        assert_eq!(graph.vertex_id, vec![10, 20, 405]);
        assert_eq!(graph.adj[1], vec![0, 2]);
    }

    #[test]
    fn read_dimacs_test() {
        let input = Cursor::new("c comment\np edge 4 3\ne 1 2\ne 2 3\ne 3 4\n");
        let graph = Graph::read_dimacs(input);
        assert!(graph.is_ok());
        let graph = graph.unwrap();
        assert_eq!(graph.num_vertices(), 4);
        assert_eq!(graph.num_edges(), 3);
        assert_eq!(graph.vertex_id, vec![1, 2, 3, 4]);
    }

    #[test]
    fn read_auto_fallback_test() {
        let dimacs = "c comment\np edge 3 2\ne 1 2\ne 2 3\n";
        let graph = Graph::read_auto(dimacs).unwrap();
        assert_eq!(graph.num_vertices(), 3);
        let snap = "1 2\n2 3\n";
        let graph = Graph::read_auto(snap).unwrap();
        assert_eq!(graph.num_vertices(), 3);
    }

    #[test]
    fn self_loop_ignored_test() {
        let input = Cursor::new("1 1\n1 2\n");
        let graph = Graph::read_snap(input).unwrap();
        assert_eq!(graph.num_vertices(), 2);
        assert_eq!(graph.num_edges(), 1);
    }
}
