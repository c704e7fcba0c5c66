//! Maintenance of a maximum matching in the bipartite representation of the
//! residual graph: each vertex `v` has a left copy `l_v` and a right copy
//! `r_v`, and every residual edge `(u, v)` contributes `(l_u, r_v)` and
//! `(l_v, r_u)`. The matching is kept in `in_flow`/`out_flow` across the
//! whole search and repaired incrementally with blocking-flow phases, never
//! rebuilt from scratch.

use crate::vc_solver::VCSolver;

impl VCSolver {
    /// Advances one augmenting path from the left copy of `v` through the
    /// level graph, flipping matching edges along the way.
    fn augment(&mut self, v: usize, level: &[isize], iter: &mut [isize]) -> bool {
        while iter[v] >= 0 {
            let u = self.adj[v][iter[v] as usize];
            iter[v] -= 1;
            if self.assignment[u] >= 0 {
                continue;
            }
            let w = self.in_flow[u];
            if w < 0
                || (level[v] < level[w as usize]
                    && iter[w as usize] >= 0
                    && self.augment(w as usize, level, iter))
            {
                self.in_flow[u] = v as isize;
                self.out_flow[v] = u as isize;
                return true;
            }
        }
        false
    }

    /// Brings the matching back to maximum after assignments changed.
    ///
    /// First drops every matched pair with exactly one decided endpoint,
    /// then runs blocking-flow phases: a BFS layers the alternating level
    /// graph from all exposed left copies, and a DFS sweep augments along
    /// vertex-disjoint shortest paths until no augmenting path remains.
    /// After the final phase, `used` holds exactly the left and right copies
    /// reachable from exposed left copies.
    pub(crate) fn update_lp(&mut self) {
        for v in 0..self.n {
            if self.out_flow[v] >= 0
                && ((self.assignment[v] < 0) != (self.assignment[self.out_flow[v] as usize] < 0))
            {
                self.in_flow[self.out_flow[v] as usize] = -1;
                self.out_flow[v] = -1;
            }
        }
        let mut level = vec![0isize; self.n];
        let mut iter = vec![0isize; self.n];
        loop {
            self.used.clear();
            let mut queue: Vec<usize> = Vec::new();
            for v in 0..self.n {
                if self.assignment[v] < 0 && self.out_flow[v] < 0 {
                    level[v] = 0;
                    self.used.add(v);
                    queue.push(v);
                }
            }
            let mut reachable_exposed = false;
            let mut qs = 0;
            while qs < queue.len() {
                let v = queue[qs];
                qs += 1;
                iter[v] = self.adj[v].len() as isize - 1;
                for i in 0..self.adj[v].len() {
                    let u = self.adj[v][i];
                    if self.assignment[u] < 0 && self.used.add(self.n + u) {
                        let w = self.in_flow[u];
                        if w < 0 {
                            reachable_exposed = true;
                        } else {
                            let w = w as usize;
                            level[w] = level[v] + 1;
                            self.used.add(w);
                            queue.push(w);
                        }
                    }
                }
            }
            if !reachable_exposed {
                break;
            }
            for v in (0..self.n).rev() {
                if self.assignment[v] < 0 && self.out_flow[v] < 0 {
                    self.augment(v, &level, &mut iter);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::vc_solver::tests::solver_from;

    #[test]
    fn matching_is_consistent_test() {
        let mut s = solver_from("1 2\n2 3\n3 4\n4 5\n5 1\n");
        s.update_lp();
        // A 5-cycle admits a perfect matching in its bipartite double cover.
        for v in 0..s.n {
            let u = s.out_flow[v];
            assert!(u >= 0);
            assert!(s.adj[v].contains(&(u as usize)));
            assert_eq!(s.in_flow[u as usize], v as isize);
        }
    }

    #[test]
    fn matching_drops_decided_pairs_test() {
        let mut s = solver_from("1 2\n2 3\n3 4\n");
        s.update_lp();
        s.set(1, 1);
        s.update_lp();
        for v in 0..s.n {
            if s.assignment[v] < 0 {
                let u = s.out_flow[v];
                if u >= 0 {
                    assert!(s.assignment[u as usize] < 0);
                }
            } else {
                // Decided vertices keep no left-side match.
                assert!(s.out_flow[v] < 0 || s.assignment[s.out_flow[v] as usize] < 0);
            }
        }
    }

    #[test]
    fn star_matching_test() {
        let mut s = solver_from("1 2\n1 3\n1 4\n");
        s.update_lp();
        // Only two of the eight copies can be matched: l_center with one
        // leaf's right copy and that leaf's left copy with r_center.
        let matched = (0..s.n).filter(|&v| s.out_flow[v] >= 0).count();
        assert_eq!(matched, 2);
    }
}
