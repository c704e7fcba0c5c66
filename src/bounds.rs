//! Lower bounds on the size of any cover extending the current assignment:
//! the trivial bound, a greedy clique cover, the half-integral LP bound, and
//! a cycle cover derived from the LP matching. The driver takes the maximum
//! of whatever is enabled and records which bound was decisive.

use std::time::Instant;

use crate::stats::LowerBoundType;
use crate::vc_solver::VCSolver;

impl VCSolver {
    /// Greedily packs the undecided vertices, in order of non-decreasing
    /// degree, into cliques; every vertex that joins an existing clique
    /// raises the bound by one.
    fn clique_lower_bound(&mut self) -> usize {
        let mut order: Vec<(usize, usize)> = (0..self.n)
            .filter(|&v| self.assignment[v] < 0)
            .map(|v| (self.deg(v), v))
            .collect();
        order.sort_unstable();
        let mut clique = vec![0usize; self.n];
        let mut size = vec![0usize; self.n];
        let mut shared = vec![0usize; self.n];
        let mut need = self.current_value;
        self.used.clear();
        for &(_, v) in &order {
            for i in 0..self.adj[v].len() {
                let u = self.adj[v][i];
                if self.assignment[u] < 0 && self.used.contains(u) {
                    shared[clique[u]] = 0;
                }
            }
            // v joins the largest clique all of whose members neighbor v.
            let mut to = v;
            let mut best = 0;
            for i in 0..self.adj[v].len() {
                let u = self.adj[v][i];
                if self.assignment[u] < 0 && self.used.contains(u) {
                    let c = clique[u];
                    shared[c] += 1;
                    if shared[c] == size[c] && best < size[c] {
                        to = c;
                        best = size[c];
                    }
                }
            }
            clique[v] = to;
            if to != v {
                size[to] += 1;
                need += 1;
            } else {
                size[v] = 1;
            }
            self.used.add(v);
        }
        need
    }

    /// Walks the permutation induced by the matching (`v -> out_flow[v]`)
    /// into cycles. A cycle of length l needs ceil(l / 2) cover vertices,
    /// one less when it is a clique; even cycles are repeatedly split along
    /// chord pairs that leave a shorter odd cycle.
    fn cycle_lower_bound(&mut self) -> usize {
        let mut lb = self.current_value;
        let mut cycle_id = vec![-1isize; self.n];
        let mut pos = vec![0usize; self.n];
        let mut cycle: Vec<usize> = Vec::new();
        let mut other: Vec<usize> = Vec::new();
        for i in 0..self.n {
            if self.assignment[i] >= 0 || cycle_id[i] >= 0 {
                continue;
            }
            // Vertices the matching does not reach contribute nothing; the
            // bound stays valid without them.
            if self.out_flow[i] < 0 {
                continue;
            }
            cycle.clear();
            let mut v = i;
            let mut intact = true;
            loop {
                cycle_id[v] = i as isize;
                let next = self.out_flow[v];
                if next < 0 {
                    intact = false;
                    break;
                }
                v = next as usize;
                if v != i && cycle_id[v] >= 0 {
                    intact = false;
                    break;
                }
                pos[v] = cycle.len();
                cycle.push(v);
                if v == i {
                    break;
                }
            }
            if !intact {
                continue;
            }
            let mut is_clique = true;
            for &v in &cycle {
                let mut inside = 0;
                for &u in &self.adj[v] {
                    if self.assignment[u] < 0 && cycle_id[u] == cycle_id[v] {
                        inside += 1;
                    }
                }
                if inside != cycle.len() - 1 {
                    is_clique = false;
                    break;
                }
            }
            if is_clique {
                lb += cycle.len() - 1;
                continue;
            }
            let mut size = cycle.len();
            while size >= 6 {
                let mut min_size = size;
                let mut split_start = 0;
                let mut split_end = size;
                for j in 0..size {
                    self.used.clear();
                    let vj = cycle[j];
                    for idx in 0..self.adj[vj].len() {
                        let u = self.adj[vj][idx];
                        if self.assignment[u] < 0 && cycle_id[u] == cycle_id[vj] {
                            self.used.add(u);
                        }
                    }
                    let vj1 = cycle[(j + 1) % size];
                    for idx in 0..self.adj[vj1].len() {
                        let u = self.adj[vj1][idx];
                        if self.assignment[u] < 0 && cycle_id[u] == cycle_id[vj1] {
                            // Chord pair (v_j, succ(u)) and (v_j+1, u): the
                            // piece between them closes into its own cycle.
                            if self.used.contains(cycle[(pos[u] + 1) % size]) {
                                let piece = (pos[u] + size - j) % size;
                                if min_size > piece && piece % 2 != 0 {
                                    min_size = piece;
                                    split_start = (j + 1) % size;
                                    split_end = (pos[u] + 1) % size;
                                }
                            }
                        }
                    }
                }
                if min_size == size {
                    break;
                }
                other.clear();
                let mut j = split_end;
                while j != split_start {
                    other.push(cycle[j]);
                    j = (j + 1) % size;
                }
                j = split_start;
                while j != split_end {
                    cycle_id[cycle[j]] = self.n as isize;
                    j = (j + 1) % size;
                }
                std::mem::swap(&mut cycle, &mut other);
                size -= min_size;
                debug_assert_eq!(size, cycle.len());
                debug_assert!(min_size > 1);
                lb += (min_size + 1) / 2;
                for (idx, &u) in cycle.iter().enumerate() {
                    pos[u] = idx;
                }
            }
            debug_assert!(size > 1);
            lb += (size + 1) / 2;
        }
        lb
    }

    /// Maximum of the enabled bounds; remembers which one won and, at the
    /// root, records it for reporting.
    pub(crate) fn lower_bound(&mut self) -> usize {
        if self.lb < self.current_value {
            self.lb = self.current_value;
            self.lb_type = LowerBoundType::Trivial;
        }
        if self.params.clique_lb {
            let started = Instant::now();
            let bound = self.clique_lower_bound();
            self.stats.clique_lb_time += started.elapsed();
            if self.lb < bound {
                self.lb = bound;
                self.lb_type = LowerBoundType::Clique;
            }
        }
        if self.params.lp_lb {
            let bound = self.current_value + (self.remaining + 1) / 2;
            if self.lb < bound {
                self.lb = bound;
                self.lb_type = LowerBoundType::Lp;
            }
        }
        if self.params.cycle_lb {
            let started = Instant::now();
            let bound = self.cycle_lower_bound();
            self.stats.cycle_lb_time += started.elapsed();
            if self.lb < bound {
                self.lb = bound;
                self.lb_type = LowerBoundType::Cycle;
            }
        }
        if self.depth == 0 {
            self.stats.root_lb = self.lb;
        }
        self.lb
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::Graph;
    use crate::params::Params;
    use crate::stats::LowerBoundType;
    use crate::vc_solver::tests::solver_from;
    use crate::vc_solver::VCSolver;
    use std::io::Cursor;
    use std::rc::Rc;

    #[test]
    fn trivial_bound_test() {
        let graph = Graph::read_snap(Cursor::new("1 2\n2 3\n")).unwrap();
        let params = Params {
            clique_lb: false,
            lp_lb: false,
            cycle_lb: false,
            ..Params::default()
        };
        let mut s = VCSolver::from_graph(&graph, Rc::new(params));
        s.set(1, 1);
        assert_eq!(s.lower_bound(), 1);
        assert_eq!(s.lb_type, LowerBoundType::Trivial);
    }

    #[test]
    fn clique_bound_on_k4_test() {
        let graph =
            Graph::read_snap(Cursor::new("1 2\n1 3\n1 4\n2 3\n2 4\n3 4\n")).unwrap();
        let params = Params {
            lp_lb: false,
            cycle_lb: false,
            ..Params::default()
        };
        let mut s = VCSolver::from_graph(&graph, Rc::new(params));
        assert_eq!(s.lower_bound(), 3);
        assert_eq!(s.lb_type, LowerBoundType::Clique);
    }

    #[test]
    fn lp_bound_on_cycle_test() {
        let graph =
            Graph::read_snap(Cursor::new("1 2\n2 3\n3 4\n4 5\n5 1\n")).unwrap();
        let params = Params {
            clique_lb: false,
            cycle_lb: false,
            ..Params::default()
        };
        let mut s = VCSolver::from_graph(&graph, Rc::new(params));
        // ceil(5 / 2) = 3 is already the exact cover size for a 5-cycle.
        assert_eq!(s.lower_bound(), 3);
        assert_eq!(s.lb_type, LowerBoundType::Lp);
    }

    #[test]
    fn cycle_bound_on_c5_test() {
        let mut s = solver_from("1 2\n2 3\n3 4\n4 5\n5 1\n");
        s.update_lp();
        let params = Params {
            clique_lb: false,
            lp_lb: false,
            ..Params::default()
        };
        s.params = Rc::new(params);
        assert_eq!(s.lower_bound(), 3);
        assert_eq!(s.lb_type, LowerBoundType::Cycle);
    }

    #[test]
    fn bound_never_exceeds_optimum_test() {
        // Petersen graph; the optimum cover has six vertices.
        let mut s = solver_from(
            "1 2\n2 3\n3 4\n4 5\n5 1\n1 6\n2 7\n3 8\n4 9\n5 10\n6 8\n8 10\n10 7\n7 9\n9 6\n",
        );
        s.update_lp();
        assert!(s.lower_bound() <= 6);
    }
}
