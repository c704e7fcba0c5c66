//! Two-child branching. The branch vertex is chosen by the configured rule;
//! in the cover-child every mirror of the vertex joins it as well, and both
//! children derive packing constraints that later prune sibling subtrees.

use rand::Rng;

use crate::params::BranchRule;
use crate::vc_solver::{PackingConstraint, VCSolver};

impl VCSolver {
    /// Picks the branch vertex and returns it with its residual degree.
    fn choose_branch_vertex(&mut self) -> (usize, usize) {
        match self.params.branching {
            BranchRule::Random => {
                let mut skip = self.rng.gen_range(0..self.remaining);
                let mut v = usize::MAX;
                for i in 0..self.n {
                    if self.assignment[i] < 0 {
                        if skip == 0 {
                            v = i;
                            break;
                        }
                        skip -= 1;
                    }
                }
                let d = self.deg(v);
                (v, d)
            }
            BranchRule::MinDegree => {
                let mut v = usize::MAX;
                let mut v_degree = self.n + 1;
                for u in 0..self.n {
                    if self.assignment[u] < 0 {
                        let d = self.deg(u);
                        if d < v_degree {
                            v = u;
                            v_degree = d;
                        }
                    }
                }
                (v, v_degree)
            }
            BranchRule::MaxDegree => {
                // Highest degree, ties broken by the sparsest neighborhood:
                // fewer internal edges mean the exclusion child forces more.
                let mut v = usize::MAX;
                let mut v_degree: isize = -1;
                let mut min_edges = 0i64;
                for u in 0..self.n {
                    if self.assignment[u] < 0 {
                        let d = self.deg(u) as isize;
                        if v_degree > d {
                            continue;
                        }
                        let mut e = 0i64;
                        self.used.clear();
                        for i in 0..self.adj[u].len() {
                            let w = self.adj[u][i];
                            if self.assignment[w] < 0 {
                                self.used.add(w);
                            }
                        }
                        for i in 0..self.adj[u].len() {
                            let w = self.adj[u][i];
                            if self.assignment[w] < 0 {
                                for j in 0..self.adj[w].len() {
                                    let w2 = self.adj[w][j];
                                    if self.assignment[w2] < 0 && self.used.contains(w2) {
                                        e += 1;
                                    }
                                }
                            }
                        }
                        if v_degree < d || min_edges > e {
                            v_degree = d;
                            min_edges = e;
                            v = u;
                        }
                    }
                }
                (v, v_degree as usize)
            }
        }
    }

    /// Mirrors of `v`: vertices at distance two whose removal from
    /// consideration is free because N(v) \ N(w) induces a clique. They can
    /// join the cover together with `v` without losing optimality.
    fn find_mirrors(&mut self, v: usize, v_degree: usize) -> Vec<usize> {
        let mut mirrors = Vec::new();
        let mut ps = vec![-2isize; self.n];
        self.used.clear();
        self.used.add(v);
        for i in 0..self.adj[v].len() {
            let u = self.adj[v][i];
            if self.assignment[u] < 0 {
                self.used.add(u);
                ps[u] = -1;
            }
        }
        for i in 0..self.adj[v].len() {
            let u = self.adj[v][i];
            if self.assignment[u] >= 0 {
                continue;
            }
            for j in 0..self.adj[u].len() {
                let w = self.adj[u][j];
                if self.assignment[w] < 0 && self.used.add(w) {
                    // Mark N(v) ∩ N(w) with w; unmarked neighbors of v form
                    // N(v) \ N(w).
                    let mut outside = v_degree as isize;
                    for k in 0..self.adj[w].len() {
                        let z = self.adj[w][k];
                        if self.assignment[z] < 0 && ps[z] != -2 {
                            ps[z] = w as isize;
                            outside -= 1;
                        }
                    }
                    let mut ok = true;
                    for k in 0..self.adj[v].len() {
                        let u2 = self.adj[v][k];
                        if self.assignment[u2] < 0 && ps[u2] != w as isize {
                            let mut inside = 0isize;
                            for l in 0..self.adj[u2].len() {
                                let w2 = self.adj[u2][l];
                                if self.assignment[w2] < 0
                                    && ps[w2] != -2
                                    && ps[w2] != w as isize
                                {
                                    inside += 1;
                                }
                            }
                            if inside != outside - 1 {
                                ok = false;
                                break;
                            }
                        }
                    }
                    if ok {
                        mirrors.push(w);
                    }
                }
            }
        }
        mirrors
    }

    /// Branches on the chosen vertex: first the cover child (with mirrors),
    /// then the exclusion child. All node-local state is saved before the
    /// first child and restored between and after the children.
    pub(crate) fn branching(&mut self) {
        let old_lb = self.lb;
        let old_lb_type = self.lb_type;
        let (v, v_degree) = self.choose_branch_vertex();
        let mirrors = self.find_mirrors(v, v_degree);
        let saved_remaining = self.remaining;
        let saved_packing = self.packing.len();

        if self.params.packing {
            let members: Vec<usize> = self.adj[v]
                .iter()
                .copied()
                .filter(|&u| self.assignment[u] < 0)
                .collect();
            let bound = if mirrors.is_empty() { 1 } else { 2 };
            self.packing.push(PackingConstraint { bound, members });
        }
        self.set(v, 1);
        for &m in &mirrors {
            self.set(m, 1);
        }
        self.depth += 1;
        self.rec();
        self.packing.truncate(saved_packing);
        self.lb = old_lb;
        self.lb_type = old_lb_type;
        self.depth -= 1;
        self.restore_to(saved_remaining);

        if self.lb >= self.optimal_value {
            self.stats.lb_hits[self.lb_type.index()] += 1;
            self.stats.left_cuts += 1;
            return;
        }
        self.stats.branchings += 1;

        if mirrors.is_empty() {
            self.used.clear();
            self.used.add(v);
            for i in 0..self.adj[v].len() {
                let u = self.adj[v][i];
                if self.assignment[u] < 0 {
                    self.used.add(u);
                }
            }
            if self.params.packing {
                // Excluding v forces N(v) into the cover; each forced vertex
                // must still pay for itself outside N[v].
                let mut touched = vec![-1isize; self.n];
                for i in 0..self.adj[v].len() {
                    let u = self.adj[v][i];
                    if self.assignment[u] >= 0 {
                        continue;
                    }
                    let mut members: Vec<usize> = Vec::new();
                    for j in 0..self.adj[u].len() {
                        let w = self.adj[u][j];
                        if self.assignment[w] < 0 && !self.used.contains(w) {
                            members.push(w);
                            touched[w] = u as isize;
                        }
                    }
                    if members.is_empty() {
                        continue;
                    }
                    let mut bound = 1;
                    // A witness inside N[v] whose whole residual neighborhood
                    // is u plus u's private neighbors tightens the bound.
                    for j in 0..self.adj[members[0]].len() {
                        let u2 = self.adj[members[0]][j];
                        if self.assignment[u2] < 0 && self.used.contains(u2) && u2 != u {
                            let mut hits = 0isize;
                            for l in 0..self.adj[u2].len() {
                                let w = self.adj[u2][l];
                                if self.assignment[w] < 0 {
                                    if touched[w] == u as isize {
                                        hits += 1;
                                    } else if w == u || !self.used.contains(w) {
                                        hits = -1;
                                        break;
                                    }
                                }
                            }
                            if hits == members.len() as isize {
                                bound = 2;
                                break;
                            }
                        }
                    }
                    self.packing.push(PackingConstraint { bound, members });
                }
            }
        }
        self.set(v, 0);
        self.depth += 1;
        self.rec();
        self.packing.truncate(saved_packing);
        self.lb = old_lb;
        self.lb_type = old_lb_type;
        self.depth -= 1;
        self.restore_to(saved_remaining);
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::Graph;
    use crate::params::{BranchRule, Params};
    use crate::vc_solver::VCSolver;
    use std::io::Cursor;
    use std::rc::Rc;
    use std::time::Duration;

    fn solve_with(input: &str, params: Params) -> VCSolver {
        let graph = Graph::read_snap(Cursor::new(input)).unwrap();
        let mut solver = VCSolver::from_graph(&graph, Rc::new(params));
        solver.solve().unwrap();
        solver
    }

    fn assert_cover(input: &str, expected: usize, params: Params) {
        let graph = Graph::read_snap(Cursor::new(input)).unwrap();
        let solver = solve_with(input, params);
        assert_eq!(solver.optimal_value, expected);
        // The recovered assignment must be a cover of the right size.
        let mut count = 0;
        for v in 0..graph.num_vertices() {
            assert!(solver.optimal_solution[v] == 0 || solver.optimal_solution[v] == 1);
            count += solver.optimal_solution[v] as usize;
            for &u in &graph.adj[v] {
                assert!(solver.optimal_solution[v] + solver.optimal_solution[u] >= 1);
            }
        }
        assert_eq!(count, expected);
    }

    #[test]
    fn single_edge_test() {
        assert_cover("1 2\n", 1, Params::default());
    }

    #[test]
    fn triangle_test() {
        assert_cover("1 2\n2 3\n1 3\n", 2, Params::default());
    }

    #[test]
    fn path_test() {
        assert_cover("1 2\n2 3\n3 4\n", 2, Params::default());
    }

    #[test]
    fn complete_bipartite_test() {
        assert_cover(
            "1 4\n1 5\n1 6\n2 4\n2 5\n2 6\n3 4\n3 5\n3 6\n",
            3,
            Params::default(),
        );
    }

    #[test]
    fn five_cycle_test() {
        assert_cover("1 2\n2 3\n3 4\n4 5\n5 1\n", 3, Params::default());
    }

    #[test]
    fn petersen_test() {
        let petersen =
            "1 2\n2 3\n3 4\n4 5\n5 1\n1 6\n2 7\n3 8\n4 9\n5 10\n6 8\n8 10\n10 7\n7 9\n9 6\n";
        assert_cover(petersen, 6, Params::default());
    }

    #[test]
    fn petersen_bare_branching_test() {
        // Everything off: plain branching with the trivial bound only.
        let params = Params {
            deg1: false,
            dominance: false,
            fold2: false,
            lp: false,
            unconfined: false,
            twin: false,
            funnel: false,
            desk: false,
            packing: false,
            clique_lb: false,
            lp_lb: false,
            cycle_lb: false,
            ..Params::default()
        };
        let petersen =
            "1 2\n2 3\n3 4\n4 5\n5 1\n1 6\n2 7\n3 8\n4 9\n5 10\n6 8\n8 10\n10 7\n7 9\n9 6\n";
        assert_cover(petersen, 6, params);
    }

    #[test]
    fn branch_and_reduce_test() {
        let input = "1 2\n1 3\n1 4\n1 5\n1 6\n2 3\n2 4\n2 5\n2 10\n\
                     3 4\n3 5\n3 9\n4 5\n4 8\n5 7\n6 11\n6 12\n7 13\n8 14\n\
                     9 15\n10 16\n11 12\n11 13\n11 15\n11 16\n12 13\n12 14\n\
                     12 16\n13 14\n13 15\n14 15\n14 16\n15 16\n";
        assert_cover(input, 10, Params::default());
    }

    #[test]
    fn intertwined_cliques_test() {
        let input = "1 2\n1 3\n1 4\n1 5\n1 9\n2 3\n2 4\n2 6\n2 10\n\
                     3 4\n3 7\n3 11\n4 8\n4 12\n5 6\n5 7\n5 8\n5 9\n6 7\n\
                     6 8\n6 10\n7 8\n7 11\n8 12\n9 10\n9 11\n9 12\n\
                     10 11\n10 12\n11 12\n";
        assert_cover(input, 9, Params::default());
    }

    #[test]
    fn disconnected_components_test() {
        // Two triangles and a path, solved through decomposition.
        assert_cover(
            "1 2\n2 3\n1 3\n4 5\n5 6\n4 6\n7 8\n8 9\n",
            5,
            Params::default(),
        );
    }

    #[test]
    fn min_degree_branching_test() {
        let params = Params {
            branching: BranchRule::MinDegree,
            ..Params::default()
        };
        assert_cover("1 2\n2 3\n3 4\n4 5\n5 1\n", 3, params);
    }

    #[test]
    fn random_branching_reproducible_test() {
        let petersen =
            "1 2\n2 3\n3 4\n4 5\n5 1\n1 6\n2 7\n3 8\n4 9\n5 10\n6 8\n8 10\n10 7\n7 9\n9 6\n";
        let params = Params {
            branching: BranchRule::Random,
            ..Params::default()
        };
        let a = solve_with(petersen, params.clone());
        let b = solve_with(petersen, params);
        assert_eq!(a.optimal_value, 6);
        assert_eq!(a.optimal_solution, b.optimal_solution);
        assert_eq!(a.stats.branchings, b.stats.branchings);
    }

    #[test]
    fn timeout_reports_upper_bound_test() {
        let params = Params {
            time_limit: Duration::from_secs(0),
            ..Params::default()
        };
        let graph = Graph::read_snap(Cursor::new("1 2\n2 3\n1 3\n")).unwrap();
        let mut solver = VCSolver::from_graph(&graph, Rc::new(params));
        let value = solver.solve().unwrap();
        assert!(solver.timed_out);
        // Nothing was explored; the trivial all-in cover stands.
        assert_eq!(value, 3);
    }

    #[test]
    fn random_graphs_match_brute_force_test() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        fn brute_force(n: usize, edges: &[(usize, usize)]) -> usize {
            let mut best = n;
            for mask in 0u32..(1 << n) {
                if edges
                    .iter()
                    .all(|&(u, v)| mask & (1 << u) != 0 || mask & (1 << v) != 0)
                {
                    best = best.min(mask.count_ones() as usize);
                }
            }
            best
        }

        let mut rng = StdRng::seed_from_u64(20260802);
        for round in 0..40 {
            let n = 4 + (round % 11);
            let p = if round % 3 == 0 { 0.2 } else { 0.45 };
            let mut edges = Vec::new();
            let mut adj = vec![Vec::new(); n];
            for u in 0..n {
                for v in (u + 1)..n {
                    if rng.gen::<f64>() < p {
                        edges.push((u, v));
                        adj[u].push(v);
                        adj[v].push(u);
                    }
                }
            }
            let expected = brute_force(n, &edges);
            let mut solver = VCSolver::new(adj.clone(), n, Rc::new(Params::default()));
            let value = solver.solve().unwrap();
            assert_eq!(value, expected, "round {} edges {:?}", round, edges);
            let mut count = 0;
            for v in 0..n {
                assert!(solver.optimal_solution[v] == 0 || solver.optimal_solution[v] == 1);
                count += solver.optimal_solution[v] as usize;
            }
            assert_eq!(count, value);
            for &(u, v) in &edges {
                assert!(solver.optimal_solution[u] + solver.optimal_solution[v] >= 1);
            }
        }
    }

    #[test]
    fn random_graphs_bare_stack_test() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        // Cross-check the reduced configurations against the full one.
        let mut rng = StdRng::seed_from_u64(77);
        for _ in 0..12 {
            let n = 10;
            let mut adj = vec![Vec::new(); n];
            for u in 0..n {
                for v in (u + 1)..n {
                    if rng.gen::<f64>() < 0.35 {
                        adj[u].push(v);
                        adj[v].push(u);
                    }
                }
            }
            let mut full = VCSolver::new(adj.clone(), n, Rc::new(Params::default()));
            let reference = full.solve().unwrap();
            let variants = [
                Params {
                    packing: false,
                    ..Params::default()
                },
                Params {
                    lp: false,
                    cycle_lb: false,
                    ..Params::default()
                },
                Params {
                    unconfined: false,
                    twin: false,
                    funnel: false,
                    desk: false,
                    ..Params::default()
                },
            ];
            for params in variants {
                let mut solver = VCSolver::new(adj.clone(), n, Rc::new(params));
                assert_eq!(solver.solve().unwrap(), reference);
            }
        }
    }
}
