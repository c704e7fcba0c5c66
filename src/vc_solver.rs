//! The branch-and-reduce solver state and its recursive driver.
//!
//! The assignment vector holds, for every vertex, one of
//! * `-1`: undecided, still part of the residual graph,
//! * `0`: outside the cover (inside the independent set),
//! * `1`: inside the cover,
//! * `2`: removed by a fold or alternative, resolved later by replay.
//!
//! Every mutation either pushes a vertex id onto the restore stack or a `-1`
//! sentinel standing for "undo one modification"; backtracking drains the
//! stack until the saved number of undecided vertices is reached again.

use std::mem;
use std::rc::Rc;
use std::time::Instant;

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cust_error::ProcessingError;
use crate::fast_set::FastSet;
use crate::graph::Graph;
use crate::modified::{reverse_stack, ModKind, Modification};
use crate::params::Params;
use crate::stats::{LowerBoundType, Stats};

/// A constraint accumulated during branching and the unconfined reduction:
/// at least `bound` of `members` must stay out of the cover.
#[derive(Debug, Clone)]
pub struct PackingConstraint {
    pub bound: isize,
    pub members: Vec<usize>,
}

impl PackingConstraint {
    /// Largest number of members that may enter the cover.
    pub fn max_inside(&self) -> isize {
        self.members.len() as isize - self.bound
    }
}

pub struct VCSolver {
    pub params: Rc<Params>,
    pub stats: Stats,

    /// Number of real vertices.
    pub n: usize,
    /// Length of the solution vectors; slots `n..cap` are reserved for
    /// vertices tracked across a component split and for the constant-0 and
    /// constant-1 sentinels at `cap - 2` and `cap - 1`.
    pub cap: usize,
    pub adj: Vec<Vec<usize>>,

    pub assignment: Vec<i8>,
    pub current_value: usize,
    pub remaining: usize,

    pub optimal_value: usize,
    pub optimal_solution: Vec<i8>,

    pub(crate) restore: Vec<isize>,
    pub(crate) modifieds: Vec<Modification>,

    /// Bipartite matching over the vertex-duplicate graph. `in_flow[u]` is
    /// the left endpoint matched to the right copy of `u`, `out_flow[v]` the
    /// right endpoint matched to the left copy of `v`; `-1` means unmatched.
    pub(crate) in_flow: Vec<isize>,
    pub(crate) out_flow: Vec<isize>,

    pub(crate) packing: Vec<PackingConstraint>,
    pub(crate) used: FastSet,

    pub(crate) lb: usize,
    pub(crate) lb_type: LowerBoundType,
    pub(crate) density: f64,
    pub(crate) target_size: usize,

    pub(crate) depth: usize,
    pub(crate) component: bool,

    pub(crate) deadline: Instant,
    pub timed_out: bool,

    pub(crate) rng: StdRng,
}

impl VCSolver {
    /// Creates a solver over `adj` with `cap >= adj.len()` solution slots.
    pub fn new(adj: Vec<Vec<usize>>, cap: usize, params: Rc<Params>) -> Self {
        let n = adj.len();
        debug_assert!(cap >= n);
        let mut assignment = vec![-1i8; cap];
        let mut optimal_solution = vec![1i8; cap];
        for i in n..cap {
            assignment[i] = 2;
            optimal_solution[i] = 2;
        }
        let target_size = (n as f64 * params.size_threshold) as usize;
        let deadline = Instant::now() + params.time_limit;
        let rng = StdRng::seed_from_u64(params.seed);
        VCSolver {
            stats: Stats::new(),
            n,
            cap,
            adj,
            assignment,
            current_value: 0,
            remaining: n,
            optimal_value: n,
            optimal_solution,
            restore: vec![0; n],
            modifieds: Vec::new(),
            in_flow: vec![-1; n],
            out_flow: vec![-1; n],
            packing: Vec::new(),
            used: FastSet::new(n * 2),
            lb: 0,
            lb_type: LowerBoundType::Trivial,
            density: 1.0,
            target_size,
            depth: 0,
            component: false,
            deadline,
            timed_out: false,
            rng,
            params,
        }
    }

    pub fn from_graph(graph: &Graph, params: Rc<Params>) -> Self {
        let n = graph.num_vertices();
        VCSolver::new(graph.adj.clone(), n, params)
    }

    /// Residual degree of `v`: its number of undecided neighbors.
    pub(crate) fn deg(&self, v: usize) -> usize {
        debug_assert!(self.assignment[v] < 0);
        self.adj[v]
            .iter()
            .filter(|&&u| self.assignment[u] < 0)
            .count()
    }

    /// Decides `v` to `value`. Excluding a vertex forces all of its undecided
    /// neighbors into the cover. Every decision lands on the restore stack.
    pub(crate) fn set(&mut self, v: usize, value: i8) {
        debug_assert!(self.assignment[v] < 0);
        debug_assert!(value == 0 || value == 1);
        self.current_value += value as usize;
        self.assignment[v] = value;
        self.remaining -= 1;
        self.restore[self.remaining] = v as isize;
        if value == 0 {
            for i in 0..self.adj[v].len() {
                let u = self.adj[v][i];
                if self.assignment[u] < 0 {
                    self.assignment[u] = 1;
                    self.current_value += 1;
                    self.remaining -= 1;
                    self.restore[self.remaining] = u as isize;
                }
            }
        }
    }

    /// Records a modification: marks `removed` as folded away, rebinds the
    /// adjacency of every vertex in `vs`, and pushes one `-1` sentinel per
    /// removed vertex onto the restore stack.
    pub(crate) fn push_modification(
        &mut self,
        kind: ModKind,
        add: usize,
        removed: Vec<usize>,
        vs: Vec<usize>,
        new_adj: Vec<Vec<usize>>,
    ) {
        debug_assert_eq!(vs.len(), new_adj.len());
        self.current_value += add;
        for _ in 0..removed.len() {
            self.remaining -= 1;
            self.restore[self.remaining] = -1;
        }
        for &v in &removed {
            debug_assert!(self.assignment[v] < 0);
            self.assignment[v] = 2;
        }
        let mut old_adj = Vec::with_capacity(vs.len());
        for (&v, list) in vs.iter().zip(new_adj) {
            old_adj.push(mem::replace(&mut self.adj[v], list));
        }
        self.modifieds.push(Modification {
            kind,
            add,
            removed,
            vs,
            old_adj,
        });
    }

    /// Undoes the most recent modification. Matching edges that no longer
    /// exist in the restored adjacency are dropped from the flow.
    fn pop_modification(&mut self) {
        let mut m = self
            .modifieds
            .pop()
            .expect("a -1 restore entry has a matching modification");
        self.current_value -= m.add;
        self.remaining += m.removed.len();
        for &v in &m.removed {
            self.assignment[v] = -1;
        }
        for i in 0..m.vs.len() {
            let v = m.vs[i];
            self.adj[v] = mem::take(&mut m.old_adj[i]);
            let mut in_v = self.in_flow[v];
            let mut out_v = self.out_flow[v];
            for &u in &self.adj[v] {
                if u as isize == in_v {
                    in_v = -1;
                }
                if u as isize == out_v {
                    out_v = -1;
                }
            }
            if in_v >= 0 {
                self.out_flow[self.in_flow[v] as usize] = -1;
                self.in_flow[v] = -1;
            }
            if out_v >= 0 {
                self.in_flow[self.out_flow[v] as usize] = -1;
                self.out_flow[v] = -1;
            }
        }
    }

    /// Rewinds assignments and modifications until `saved_remaining`
    /// undecided vertices are back.
    pub(crate) fn restore_to(&mut self, saved_remaining: usize) {
        while self.remaining < saved_remaining {
            let v = self.restore[self.remaining];
            if v >= 0 {
                let v = v as usize;
                self.current_value -= self.assignment[v] as usize;
                self.assignment[v] = -1;
                self.remaining += 1;
            } else {
                self.pop_modification();
            }
        }
    }

    /// Clone of the assignment with every fold and alternative replayed, so
    /// vertices removed by modifications show their implied value.
    pub(crate) fn reconstructed_assignment(&self) -> Vec<i8> {
        let mut sol = self.assignment.clone();
        reverse_stack(&self.modifieds, &mut sol);
        sol
    }

    /// The folding contraction behind the fold2 and twin reductions:
    /// `s` and its neighbor set `ns` (with `|ns| = |s| + 1`) are replaced by
    /// a single representative, `ns[0]`, adjacent to the union of the old
    /// neighborhoods.
    pub(crate) fn fold(&mut self, s: &[usize], ns: &[usize]) {
        debug_assert_eq!(ns.len(), s.len() + 1);
        let mut removed = Vec::with_capacity(s.len() * 2);
        removed.extend_from_slice(s);
        removed.extend_from_slice(&ns[1..]);
        let rep = ns[0];
        self.used.clear();
        for &v in s {
            self.used.add(v);
        }
        let mut merged: Vec<usize> = Vec::new();
        for &v in ns {
            debug_assert!(!self.used.contains(v));
            for i in 0..self.adj[v].len() {
                let u = self.adj[v][i];
                if self.assignment[u] < 0 && self.used.add(u) {
                    merged.push(u);
                }
            }
        }
        merged.sort_unstable();
        self.used.clear();
        for &v in s {
            self.used.add(v);
        }
        for &v in ns {
            self.used.add(v);
        }
        let mut vs = Vec::with_capacity(merged.len() + 1);
        let mut new_adj: Vec<Vec<usize>> = Vec::with_capacity(merged.len() + 1);
        vs.push(rep);
        new_adj.push(merged.clone());
        for &v in &merged {
            // The representative is spliced into v's neighborhood at its
            // sorted position so adjacency lists stay ordered.
            let mut list = Vec::with_capacity(self.adj[v].len() + 1);
            let mut placed = false;
            for i in 0..self.adj[v].len() {
                let u = self.adj[v][i];
                if self.assignment[u] < 0 && !self.used.contains(u) {
                    if !placed && rep < u {
                        list.push(rep);
                        placed = true;
                    }
                    list.push(u);
                }
            }
            if !placed {
                list.push(rep);
            }
            vs.push(v);
            new_adj.push(list);
        }
        self.push_modification(ModKind::Fold, s.len(), removed, vs, new_adj);
    }

    /// The alternative structure behind the funnel and desk reductions.
    /// Common neighbors of `a` and `b` are forced into the cover; the private
    /// neighborhoods are then completely joined, and replay later picks
    /// whichever of the two sides the reduced cover admits.
    pub(crate) fn alternative(&mut self, a: &[usize], b: &[usize]) {
        debug_assert_eq!(a.len(), b.len());
        self.used.clear();
        for &bv in b {
            for i in 0..self.adj[bv].len() {
                let u = self.adj[bv][i];
                if self.assignment[u] < 0 {
                    self.used.add(u);
                }
            }
        }
        for &av in a {
            for i in 0..self.adj[av].len() {
                let u = self.adj[av][i];
                if self.assignment[u] < 0 && self.used.contains(u) {
                    self.set(u, 1);
                }
            }
        }
        self.used.clear();
        for &bv in b {
            self.used.add(bv);
        }
        let mut a2: Vec<usize> = Vec::new();
        for &av in a {
            for i in 0..self.adj[av].len() {
                let u = self.adj[av][i];
                if self.assignment[u] < 0 && self.used.add(u) {
                    a2.push(u);
                }
            }
        }
        a2.sort_unstable();
        self.used.clear();
        for &av in a {
            self.used.add(av);
        }
        let mut b2: Vec<usize> = Vec::new();
        for &bv in b {
            for i in 0..self.adj[bv].len() {
                let u = self.adj[bv][i];
                if self.assignment[u] < 0 && self.used.add(u) {
                    b2.push(u);
                }
            }
        }
        b2.sort_unstable();
        let mut removed = Vec::with_capacity(a.len() + b.len());
        removed.extend_from_slice(a);
        removed.extend_from_slice(b);
        let mut vs = Vec::with_capacity(a2.len() + b2.len());
        vs.extend_from_slice(&a2);
        vs.extend_from_slice(&b2);
        self.used.clear();
        for &av in a {
            self.used.add(av);
        }
        for &bv in b {
            self.used.add(bv);
        }
        let mut new_adj: Vec<Vec<usize>> = Vec::with_capacity(vs.len());
        for i in 0..vs.len() {
            let v = vs[i];
            let other: &[usize] = if i < a2.len() { &b2 } else { &a2 };
            let mut list: Vec<usize> = Vec::new();
            let mut q = 0;
            for j in 0..self.adj[v].len() {
                let u = self.adj[v][j];
                if self.assignment[u] < 0 && !self.used.contains(u) {
                    while q < other.len() && other[q] <= u {
                        if !self.used.contains(other[q]) {
                            list.push(other[q]);
                        }
                        q += 1;
                    }
                    if list.last() != Some(&u) {
                        list.push(u);
                    }
                }
            }
            while q < other.len() {
                if !self.used.contains(other[q]) {
                    list.push(other[q]);
                }
                q += 1;
            }
            new_adj.push(list);
        }
        let k = a2.len();
        let add = removed.len() / 2;
        self.push_modification(ModKind::Alternative { k }, add, removed, vs, new_adj);
    }

    /// Commits the current assignment as the new best cover.
    fn accept_incumbent(&mut self) {
        debug!(
            "incumbent improved: {} -> {}",
            self.optimal_value, self.current_value
        );
        self.optimal_value = self.current_value;
        self.optimal_solution.copy_from_slice(&self.assignment);
        reverse_stack(&self.modifieds, &mut self.optimal_solution);
    }

    /// Processes one search node: timeout check, reduce, lower-bound prune,
    /// leaf acceptance, component split, branch.
    pub(crate) fn rec(&mut self) {
        if Instant::now() >= self.deadline {
            self.timed_out = true;
            return;
        }
        if self.remaining <= self.target_size && self.reduce() {
            return;
        }
        if self.lower_bound() >= self.optimal_value {
            self.stats.lb_hits[self.lb_type.index()] += 1;
            return;
        }
        if self.remaining == 0 {
            self.accept_incumbent();
            return;
        }
        if self.decompose() {
            return;
        }
        if !self.params.only_root {
            self.branching();
        }
    }

    /// Runs the search to completion (or timeout) and returns the best cover
    /// size found. On timeout the returned value is an upper bound.
    pub fn solve(&mut self) -> Result<usize, ProcessingError> {
        self.params.validate()?;
        debug!(
            "solving {} vertices (component: {})",
            self.remaining, self.component
        );
        self.rec();
        Ok(self.optimal_value)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::graph::Graph;
    use std::io::Cursor;

    pub(crate) fn solver_from(input: &str) -> VCSolver {
        let graph = Graph::read_snap(Cursor::new(input)).unwrap();
        VCSolver::from_graph(&graph, Rc::new(Params::default()))
    }

    pub(crate) fn snapshot(s: &VCSolver) -> (Vec<i8>, usize, usize, Vec<Vec<usize>>, Vec<isize>, Vec<isize>, usize) {
        (
            s.assignment.clone(),
            s.current_value,
            s.remaining,
            s.adj.clone(),
            s.in_flow.clone(),
            s.out_flow.clone(),
            s.modifieds.len(),
        )
    }

    #[test]
    fn set_and_restore_test() {
        let mut s = solver_from("1 2\n2 3\n3 4\n");
        let before = snapshot(&s);
        let mark = s.remaining;
        s.set(1, 0);
        // Excluding vertex 1 drags both neighbors into the cover.
        assert_eq!(s.assignment[1], 0);
        assert_eq!(s.assignment[0], 1);
        assert_eq!(s.assignment[2], 1);
        assert_eq!(s.current_value, 2);
        assert_eq!(s.remaining, 1);
        s.restore_to(mark);
        assert_eq!(snapshot(&s), before);
    }

    #[test]
    fn fold_and_restore_test() {
        // Path 1-2-3-4-5; fold the degree-2 vertex 2 (index 1).
        let mut s = solver_from("1 2\n2 3\n3 4\n4 5\n");
        let before = snapshot(&s);
        let mark = s.remaining;
        s.fold(&[1], &[0, 2]);
        assert_eq!(s.assignment[1], 2);
        assert_eq!(s.assignment[2], 2);
        assert_eq!(s.current_value, 1);
        assert_eq!(s.remaining, 3);
        // The representative inherits the contracted neighborhood.
        assert_eq!(s.adj[0], vec![3]);
        assert!(s.adj[3].contains(&0));
        s.restore_to(mark);
        assert_eq!(snapshot(&s), before);
    }

    #[test]
    fn fold_reverse_solution_test() {
        let mut s = solver_from("1 2\n2 3\n3 4\n4 5\n");
        s.fold(&[1], &[0, 2]);
        // Pretend the reduced graph got solved with the representative out.
        let mut sol = s.assignment.clone();
        sol[0] = 0;
        sol[3] = 1;
        sol[4] = 0;
        reverse_stack(&s.modifieds, &mut sol);
        assert_eq!(sol, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn alternative_and_restore_test() {
        // Funnel shape: 1 adjacent to 2,3,4; 3-4 an edge; 2 private neighbor 5.
        let mut s = solver_from("1 2\n1 3\n1 4\n3 4\n2 5\n3 6\n");
        let before = snapshot(&s);
        let mark = s.remaining;
        s.alternative(&[0], &[1]);
        assert_eq!(s.assignment[0], 2);
        assert_eq!(s.assignment[1], 2);
        assert_eq!(s.current_value, 1);
        s.restore_to(mark);
        assert_eq!(snapshot(&s), before);
    }

    #[test]
    fn packing_constraint_bound_test() {
        let c = PackingConstraint {
            bound: 1,
            members: vec![2, 5, 7],
        };
        assert_eq!(c.max_inside(), 2);
    }
}
