//! The reduction suite: degree-1, dominance, fold2, LP, unconfined (with the
//! diamond extension), twin, funnel, desk and packing, plus the fixed-order
//! scheduler that drives them to a fixed point. Each rule operates in place
//! on the residual graph, records every change on the restore or
//! modification stack, and reports whether it removed or folded at least one
//! undecided vertex. Only the packing rule can signal infeasibility.

use std::collections::hash_map::Entry;
use std::time::Instant;

use fxhash::{FxHashMap, FxHashSet};

use crate::modified::reverse_stack;
use crate::stats::Reduction;
use crate::vc_solver::{PackingConstraint, VCSolver};

/// Result of one packing propagation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackingOutcome {
    /// Some constraint has more members in the cover than it allows; the
    /// current branch is dead.
    Infeasible,
    Progress,
    NoChange,
}

impl VCSolver {
    /// Coefficient of variation of the residual degrees.
    pub(crate) fn degree_variance(&self) -> f64 {
        let mut degs: Vec<f64> = Vec::new();
        for v in 0..self.n {
            if self.assignment[v] < 0 {
                let d = self.deg(v);
                if d > 0 {
                    degs.push(d as f64);
                }
            }
        }
        if degs.len() < 2 {
            return 0.0;
        }
        let mean = degs.iter().sum::<f64>() / degs.len() as f64;
        let squares: f64 = degs.iter().map(|d| (d - mean) * (d - mean)).sum();
        (squares / (degs.len() as f64 - 1.0)).sqrt() / mean
    }

    /// Ratio of odd edge sightings in a greedy 2-coloring of the residual
    /// graph; 0 means bipartite as far as the coloring can tell.
    pub(crate) fn odd_cycle_ratio(&self) -> f64 {
        let mut visited = vec![false; self.n];
        let mut color = vec![false; self.n];
        let mut odd = 0u64;
        let mut sightings = 0u64;
        for s in 0..self.n {
            if self.assignment[s] < 0 && !visited[s] {
                visited[s] = true;
                color[s] = true;
                let mut stack = vec![s];
                while let Some(v) = stack.pop() {
                    for &u in &self.adj[v] {
                        if self.assignment[u] < 0 {
                            sightings += 1;
                            if !visited[u] {
                                visited[u] = true;
                                color[u] = !color[v];
                                stack.push(u);
                            } else if color[u] == color[v] {
                                odd += 1;
                            }
                        }
                    }
                }
            }
        }
        if sightings == 0 {
            return 0.0;
        }
        2.0 * odd as f64 / sightings as f64
    }

    /// Excludes every vertex with at most one undecided neighbor, iterated to
    /// a fixed point through a work list driven by decremented degrees. Also
    /// refreshes the residual edge density.
    pub(crate) fn deg1_reduction(&mut self) -> bool {
        let oldn = self.remaining;
        let mut deg = vec![0isize; self.n];
        let mut work: Vec<usize> = Vec::new();
        let mut edges: i64 = 0;
        self.used.clear();
        for v in 0..self.n {
            if self.assignment[v] < 0 {
                deg[v] = if self.n == self.remaining {
                    self.adj[v].len() as isize
                } else {
                    self.deg(v) as isize
                };
                edges += deg[v] as i64;
                if deg[v] <= 1 {
                    work.push(v);
                    self.used.add(v);
                }
            }
        }
        while let Some(v) = work.pop() {
            if self.assignment[v] >= 0 {
                continue;
            }
            for i in 0..self.adj[v].len() {
                let u = self.adj[v][i];
                if self.assignment[u] < 0 {
                    for j in 0..self.adj[u].len() {
                        let w = self.adj[u][j];
                        if self.assignment[w] < 0 {
                            deg[w] -= 1;
                            edges -= 2;
                            if deg[w] <= 1 && self.used.add(w) {
                                work.push(w);
                            }
                        }
                    }
                }
            }
            self.set(v, 0);
        }
        if oldn != self.remaining {
            self.stats.reduce_removed[Reduction::Deg1.index()] += (oldn - self.remaining) as u64;
        }
        self.density =
            edges as f64 / (self.remaining as f64 * (self.remaining as f64 - 1.0));
        oldn != self.remaining
    }

    /// Covers every vertex whose closed neighborhood contains the closed
    /// neighborhood of one of its neighbors.
    pub(crate) fn dominate_reduction(&mut self) -> bool {
        let oldn = self.remaining;
        for v in 0..self.n {
            if self.assignment[v] < 0 {
                self.used.clear();
                self.used.add(v);
                for i in 0..self.adj[v].len() {
                    let u = self.adj[v][i];
                    if self.assignment[u] < 0 {
                        self.used.add(u);
                    }
                }
                'neighbors: for i in 0..self.adj[v].len() {
                    let u = self.adj[v][i];
                    if self.assignment[u] < 0 {
                        for j in 0..self.adj[u].len() {
                            let w = self.adj[u][j];
                            if self.assignment[w] < 0 && !self.used.contains(w) {
                                continue 'neighbors;
                            }
                        }
                        self.set(v, 1);
                        break;
                    }
                }
            }
        }
        if oldn != self.remaining {
            self.stats.reduce_removed[Reduction::Dominance.index()] +=
                (oldn - self.remaining) as u64;
        }
        oldn != self.remaining
    }

    /// Folds every degree-2 vertex whose neighbors are non-adjacent; adjacent
    /// neighbors both dominate the vertex, which is then excluded instead.
    pub(crate) fn fold2_reduction(&mut self) -> bool {
        let oldn = self.remaining;
        let mut num_folded = 0u64;
        'vertices: for v in 0..self.n {
            if self.assignment[v] < 0 {
                let mut nbrs = [0usize; 2];
                let mut p = 0;
                for i in 0..self.adj[v].len() {
                    let u = self.adj[v][i];
                    if self.assignment[u] < 0 {
                        if p == 2 {
                            continue 'vertices;
                        }
                        nbrs[p] = u;
                        p += 1;
                    }
                }
                if p < 2 {
                    continue;
                }
                if self.adj[nbrs[0]].binary_search(&nbrs[1]).is_ok() {
                    self.set(v, 0);
                } else {
                    self.fold(&[v], &nbrs);
                    num_folded += 3;
                }
            }
        }
        if oldn != self.remaining {
            self.stats.reduce_removed[Reduction::Fold2.index()] +=
                (oldn - self.remaining) as u64 + num_folded;
        }
        oldn != self.remaining
    }

    /// Nemhauser–Trotter persistency. Repairs the matching, excludes every
    /// vertex whose left copy is reachable from an exposed left copy while
    /// its right copy is not, then sweeps the matching digraph in reverse
    /// post-order and excludes whole components that are closed under the
    /// matching direction and contain no vertex together with its conjugate.
    pub(crate) fn lp_reduction(&mut self) -> bool {
        let oldn = self.remaining;
        self.update_lp();
        for v in 0..self.n {
            if self.assignment[v] < 0 && self.used.contains(v) && !self.used.contains(self.n + v)
            {
                self.set(v, 0);
            }
        }
        // Post-order of the residual orientation: left copies move along
        // unmatched edges, right copies back along their matched edge.
        self.used.clear();
        let mut iter = vec![0usize; self.n];
        let mut postorder: Vec<usize> = Vec::new();
        for s in 0..self.n {
            if self.assignment[s] < 0 && self.used.add(s) {
                let mut stack = vec![s];
                while let Some(&v) = stack.last() {
                    let mut next: isize = -1;
                    if v < self.n {
                        while iter[v] < self.adj[v].len() {
                            let u = self.n + self.adj[v][iter[v]];
                            iter[v] += 1;
                            if self.assignment[u - self.n] < 0 && self.used.add(u) {
                                next = u as isize;
                                break;
                            }
                        }
                    } else {
                        let w = self.in_flow[v - self.n];
                        if w >= 0 && self.used.add(w as usize) {
                            next = w;
                        }
                    }
                    if next >= 0 {
                        stack.push(next as usize);
                    } else {
                        postorder.push(v);
                        stack.pop();
                    }
                }
            }
        }
        self.used.clear();
        for idx in (0..postorder.len()).rev() {
            if self.used.add(postorder[idx]) {
                let mut comp = vec![postorder[idx]];
                let mut qs = 0;
                let mut pure = true;
                while qs < comp.len() {
                    let v = comp[qs];
                    qs += 1;
                    let conjugate = if v >= self.n { v - self.n } else { v + self.n };
                    if self.used.contains(conjugate) {
                        pure = false;
                    }
                    if v >= self.n {
                        for i in 0..self.adj[v - self.n].len() {
                            let u = self.adj[v - self.n][i];
                            if self.assignment[u] < 0 && self.used.add(u) {
                                comp.push(u);
                            }
                        }
                    } else {
                        let w = self.out_flow[v];
                        if w >= 0 && self.used.add(self.n + w as usize) {
                            comp.push(self.n + w as usize);
                        }
                    }
                }
                if pure {
                    for &v in &comp {
                        if v >= self.n && self.assignment[v - self.n] < 0 {
                            self.set(v - self.n, 0);
                        }
                    }
                }
            }
        }
        if oldn != self.remaining {
            self.stats.reduce_removed[Reduction::Lp.index()] += (oldn - self.remaining) as u64;
        }
        oldn != self.remaining
    }

    /// Grows a confining set around each vertex; a vertex whose set runs out
    /// of private neighbors is unconfined and goes into the cover, emitting a
    /// packing constraint over its neighborhood. The diamond extension fires
    /// on non-adjacent shell pairs sharing both confining neighbors.
    pub(crate) fn unconfined_reduction(&mut self) -> bool {
        let oldn = self.remaining;
        let mut in_s_count = vec![0i32; self.n];
        for v in 0..self.n {
            if self.assignment[v] >= 0 {
                continue;
            }
            self.used.clear();
            self.used.add(v);
            let mut shell: Vec<usize> = Vec::new();
            let mut s_size = 1usize;
            for i in 0..self.adj[v].len() {
                let u = self.adj[v][i];
                if self.assignment[u] < 0 {
                    self.used.add(u);
                    shell.push(u);
                    in_s_count[u] = 1;
                }
            }
            let mut settled = false;
            'grow: while !settled {
                settled = true;
                let mut i = 0;
                while i < shell.len() {
                    let u = shell[i];
                    i += 1;
                    if in_s_count[u] != 1 {
                        continue;
                    }
                    let mut witness: isize = -1;
                    for j in 0..self.adj[u].len() {
                        let w = self.adj[u][j];
                        if self.assignment[w] < 0 && !self.used.contains(w) {
                            if witness >= 0 {
                                witness = -2;
                                break;
                            }
                            witness = w as isize;
                        }
                    }
                    if witness == -1 {
                        if self.params.packing {
                            let members: Vec<usize> = self.adj[v]
                                .iter()
                                .copied()
                                .filter(|&w| self.assignment[w] < 0)
                                .collect();
                            self.packing.push(PackingConstraint { bound: 1, members });
                        }
                        self.set(v, 1);
                        break 'grow;
                    } else if witness >= 0 {
                        settled = false;
                        let z = witness as usize;
                        self.used.add(z);
                        s_size += 1;
                        for j in 0..self.adj[z].len() {
                            let w = self.adj[z][j];
                            if self.assignment[w] < 0 {
                                if self.used.add(w) {
                                    shell.push(w);
                                    in_s_count[w] = 1;
                                } else {
                                    in_s_count[w] += 1;
                                }
                            }
                        }
                    }
                }
            }
            if self.assignment[v] < 0 && s_size >= 2 {
                self.used.clear();
                for &u in &shell {
                    self.used.add(u);
                }
                // Shell members with exactly two confining neighbors and no
                // neighbor outside the closed neighborhood of the set.
                let mut anchors: Vec<(isize, isize)> = vec![(-1, -1); shell.len()];
                for (idx, &u) in shell.iter().enumerate() {
                    if in_s_count[u] != 2 {
                        continue;
                    }
                    let mut a1: isize = -1;
                    let mut a2: isize = -1;
                    for j in 0..self.adj[u].len() {
                        let w = self.adj[u][j];
                        if self.assignment[w] < 0 && !self.used.contains(w) {
                            if a1 < 0 {
                                a1 = w as isize;
                            } else if a2 < 0 {
                                a2 = w as isize;
                            } else {
                                a1 = -1;
                                a2 = -1;
                                break;
                            }
                        }
                    }
                    if a1 > a2 {
                        std::mem::swap(&mut a1, &mut a2);
                    }
                    anchors[idx] = (a1, a2);
                }
                'pairs: for i in 0..shell.len() {
                    if anchors[i].0 >= 0 && anchors[i].1 >= 0 {
                        let u = shell[i];
                        self.used.clear();
                        for j in 0..self.adj[u].len() {
                            let w = self.adj[u][j];
                            if self.assignment[w] < 0 {
                                self.used.add(w);
                            }
                        }
                        for j in (i + 1)..shell.len() {
                            if anchors[i] == anchors[j] && !self.used.contains(shell[j]) {
                                if self.params.packing {
                                    let members: Vec<usize> = self.adj[v]
                                        .iter()
                                        .copied()
                                        .filter(|&w| self.assignment[w] < 0)
                                        .collect();
                                    self.packing
                                        .push(PackingConstraint { bound: 1, members });
                                }
                                self.set(v, 1);
                                break 'pairs;
                            }
                        }
                    }
                }
            }
        }
        if oldn != self.remaining {
            self.stats.reduce_removed[Reduction::Unconfined.index()] +=
                (oldn - self.remaining) as u64;
        }
        oldn != self.remaining
    }

    fn is_degree3_with_neighbors(&self, w: usize, ns: &[usize; 3]) -> bool {
        if self.assignment[w] >= 0 {
            return false;
        }
        let mut p = 0;
        for &u in &self.adj[w] {
            if self.assignment[u] < 0 {
                if p == 3 || ns[p] != u {
                    return false;
                }
                p += 1;
            }
        }
        p == 3
    }

    /// Degree-3 twins. Independent shared neighborhoods are folded into their
    /// three members; otherwise both twins leave the cover and their
    /// neighbors are forced in.
    pub(crate) fn twin_reduction(&mut self) -> bool {
        let oldn = self.remaining;
        let mut num_folded = 0u64;
        let mut seen: FxHashMap<[usize; 3], usize> = FxHashMap::default();
        for v in 0..self.n {
            if self.assignment[v] < 0 && self.deg(v) == 3 {
                let mut ns = [0usize; 3];
                let mut p = 0;
                for i in 0..self.adj[v].len() {
                    let u = self.adj[v][i];
                    if self.assignment[u] < 0 {
                        ns[p] = u;
                        p += 1;
                    }
                }
                ns.sort_unstable();
                match seen.entry(ns) {
                    Entry::Occupied(mut slot) => {
                        let w = *slot.get();
                        // The stored candidate may have been decided or
                        // rewired since it was recorded.
                        if self.is_degree3_with_neighbors(w, &ns) {
                            let independent = !(self.adj[ns[0]].binary_search(&ns[1]).is_ok()
                                || self.adj[ns[0]].binary_search(&ns[2]).is_ok()
                                || self.adj[ns[1]].binary_search(&ns[2]).is_ok());
                            if independent {
                                self.fold(&[v, w], &ns);
                                num_folded += 5;
                            } else {
                                self.set(v, 0);
                                self.set(w, 0);
                            }
                            slot.remove();
                        } else {
                            *slot.get_mut() = v;
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(v);
                    }
                }
            }
        }
        if oldn != self.remaining {
            self.stats.reduce_removed[Reduction::Twin.index()] +=
                (oldn - self.remaining) as u64 + num_folded;
        }
        oldn != self.remaining
    }

    /// Vertices whose neighborhood is a clique except for one member `u`
    /// form an alternative with `u`; a fully-clique neighborhood excludes the
    /// vertex outright.
    pub(crate) fn funnel_reduction(&mut self) -> bool {
        let oldn = self.remaining;
        'vertices: for v in 0..self.n {
            if self.assignment[v] >= 0 {
                continue;
            }
            self.used.clear();
            let mut nbrs: Vec<usize> = Vec::new();
            for i in 0..self.adj[v].len() {
                let u = self.adj[v][i];
                if self.assignment[u] < 0 && self.used.add(u) {
                    nbrs.push(u);
                }
            }
            let p = nbrs.len();
            if p <= 1 {
                self.set(v, 0);
                continue;
            }
            let mut u1: isize = -1;
            for &u in &nbrs {
                let d = self.adj[u]
                    .iter()
                    .filter(|&&w| self.assignment[w] < 0 && self.used.contains(w))
                    .count();
                if d + 1 < p {
                    u1 = u as isize;
                    break;
                }
            }
            if u1 < 0 {
                // N(v) is a clique; its members cover all of v's edges.
                self.set(v, 0);
                continue;
            }
            let u1 = u1 as usize;
            let n_u1: FxHashSet<usize> = self.adj[u1]
                .iter()
                .copied()
                .filter(|&u| self.assignment[u] < 0)
                .collect();
            let u2 = nbrs
                .iter()
                .copied()
                .find(|&u| u != u1 && !n_u1.contains(&u))
                .expect("u1 misses at least one member of N(v)");
            self.used.remove(u1);
            self.used.remove(u2);
            let d1 = self
                .adj[u1]
                .iter()
                .filter(|&&w| self.assignment[w] < 0 && self.used.contains(w))
                .count();
            let d2 = self
                .adj[u2]
                .iter()
                .filter(|&&w| self.assignment[w] < 0 && self.used.contains(w))
                .count();
            if d1 < p - 2 && d2 < p - 2 {
                continue;
            }
            for &u in &nbrs {
                if u == u1 || u == u2 {
                    continue;
                }
                let d = self.adj[u]
                    .iter()
                    .filter(|&&w| self.assignment[w] < 0 && self.used.contains(w))
                    .count();
                if d < p - 3 {
                    continue 'vertices;
                }
            }
            let mate = if d1 == p - 2 { u2 } else { u1 };
            self.alternative(&[v], &[mate]);
        }
        if oldn != self.remaining {
            self.stats.reduce_removed[Reduction::Funnel.index()] +=
                (oldn - self.remaining) as u64;
        }
        oldn != self.remaining
    }

    /// Chordless 4-cycles of low-degree vertices with small outside
    /// neighborhoods: the two diagonals form an alternative.
    pub(crate) fn desk_reduction(&mut self) -> bool {
        let oldn = self.remaining;
        let mut num_folded = 0u64;
        let mut cycle_mark = vec![-1isize; self.n];
        'vertices: for v in 0..self.n {
            if self.assignment[v] >= 0 {
                continue;
            }
            let mut nbrs: Vec<usize> = Vec::new();
            for i in 0..self.adj[v].len() {
                let u = self.adj[v][i];
                if self.assignment[u] < 0 {
                    nbrs.push(u);
                    cycle_mark[u] = v as isize;
                    if nbrs.len() > 4 {
                        break;
                    }
                }
            }
            let d = nbrs.len();
            if d != 3 && d != 4 {
                continue;
            }
            let candidates: Vec<usize> = nbrs
                .iter()
                .copied()
                .filter(|&u| {
                    let a = self.deg(u);
                    a == 3 || a == 4
                })
                .collect();
            for i in 0..candidates.len() {
                let u1 = candidates[i];
                self.used.clear();
                let mut s_b1 = 0usize;
                for j in 0..self.adj[u1].len() {
                    let w = self.adj[u1][j];
                    if self.assignment[w] < 0 && w != v {
                        self.used.add(w);
                        s_b1 += 1;
                    }
                }
                for j in (i + 1)..candidates.len() {
                    let u2 = candidates[j];
                    if self.used.contains(u2) {
                        continue;
                    }
                    let s_b2 = self
                        .adj[u2]
                        .iter()
                        .filter(|&&w| {
                            self.assignment[w] < 0 && w != v && !self.used.contains(w)
                        })
                        .count();
                    if s_b1 + s_b2 > 3 {
                        continue;
                    }
                    for k in 0..self.adj[u2].len() {
                        let w = self.adj[u2][k];
                        if self.assignment[w] < 0
                            && self.used.contains(w)
                            && cycle_mark[w] != v as isize
                        {
                            let d3 = self.deg(w);
                            if d3 == 3 || d3 == 4 {
                                let mut s_a = d - 2;
                                for l in 0..self.adj[w].len() {
                                    let z = self.adj[w][l];
                                    if self.assignment[z] < 0
                                        && z != u1
                                        && z != u2
                                        && cycle_mark[z] != v as isize
                                    {
                                        s_a += 1;
                                    }
                                }
                                if s_a <= 2 {
                                    self.alternative(&[v, w], &[u1, u2]);
                                    num_folded += 4;
                                    continue 'vertices;
                                }
                            }
                        }
                    }
                }
            }
        }
        if oldn != self.remaining {
            self.stats.reduce_removed[Reduction::Desk.index()] +=
                (oldn - self.remaining) as u64 + num_folded;
        }
        oldn != self.remaining
    }

    /// Propagates the accumulated packing constraints. Member values are read
    /// through the modification stack so folded vertices count with their
    /// implied value. Saturated constraints exclude their undecided members
    /// and derive fresh constraints for the touched outside neighborhood;
    /// over-tight constraints force single cover assignments.
    pub(crate) fn packing_reduction(&mut self) -> PackingOutcome {
        let oldn = self.remaining;
        let mut reconstructed = self.assignment.clone();
        let mut cache_tag: isize = -1;
        let mut idx = 0;
        while idx < self.packing.len() {
            if cache_tag != self.remaining as isize {
                reconstructed.copy_from_slice(&self.assignment);
                reverse_stack(&self.modifieds, &mut reconstructed);
                cache_tag = self.remaining as isize;
            }
            let constraint = self.packing[idx].clone();
            let max_inside = constraint.max_inside();
            let mut sum = 0isize;
            let mut open: Vec<usize> = Vec::new();
            for &v in &constraint.members {
                if reconstructed[v] < 0 {
                    open.push(v);
                }
                if reconstructed[v] == 1 {
                    sum += 1;
                }
            }
            if sum > max_inside {
                return PackingOutcome::Infeasible;
            } else if sum == max_inside && !open.is_empty() {
                // Every open member must stay out of the cover.
                let mut touch_count: FxHashMap<usize, i32> = FxHashMap::default();
                self.used.clear();
                for &v in &open {
                    self.used.add(v);
                    touch_count.insert(v, -1);
                }
                for oi in 0..open.len() {
                    let v = open[oi];
                    for i in 0..self.adj[v].len() {
                        let u = self.adj[v][i];
                        if self.assignment[u] < 0 {
                            if self.used.add(u) {
                                touch_count.insert(u, 1);
                            } else if touch_count[&u] < 0 {
                                // Two excluded members share an edge.
                                return PackingOutcome::Infeasible;
                            } else {
                                *touch_count.get_mut(&u).expect("counted above") += 1;
                            }
                        }
                    }
                }
                for oi in 0..open.len() {
                    let v = open[oi];
                    for i in 0..self.adj[v].len() {
                        let u = self.adj[v][i];
                        if self.assignment[u] < 0 && touch_count[&u] == 1 {
                            let members: Vec<usize> = self.adj[u]
                                .iter()
                                .copied()
                                .filter(|&w| self.assignment[w] < 0 && !self.used.contains(w))
                                .collect();
                            self.packing.push(PackingConstraint { bound: 1, members });
                        }
                    }
                }
                for &v in &open {
                    if self.assignment[v] == 1 {
                        return PackingOutcome::Infeasible;
                    }
                    if self.assignment[v] < 0 {
                        self.set(v, 0);
                    }
                }
            } else if sum + open.len() as isize > max_inside {
                debug_assert!(open.len() >= 2);
                self.used.clear();
                for &v in &open {
                    self.used.add(v);
                }
                for i in 0..self.adj[open[0]].len() {
                    let v = self.adj[open[0]][i];
                    if self.assignment[v] < 0 && !self.used.contains(v) {
                        let hits = self
                            .adj[v]
                            .iter()
                            .filter(|&&u| self.used.contains(u))
                            .count() as isize;
                        if sum + hits > max_inside {
                            let members: Vec<usize> = self.adj[v]
                                .iter()
                                .copied()
                                .filter(|&u| self.assignment[u] < 0)
                                .collect();
                            self.packing.push(PackingConstraint { bound: 2, members });
                            self.set(v, 1);
                            break;
                        }
                    }
                }
            }
            idx += 1;
        }
        if oldn != self.remaining {
            self.stats.reduce_removed[Reduction::Packing.index()] +=
                (oldn - self.remaining) as u64;
            PackingOutcome::Progress
        } else {
            PackingOutcome::NoChange
        }
    }

    /// Applies the enabled reductions in fixed priority with a restart on
    /// progress, until a full pass changes nothing. Returns `true` when the
    /// branch is dead (packing infeasibility) or the residual was handed off
    /// to component sub-solvers.
    pub(crate) fn reduce(&mut self) -> bool {
        macro_rules! run {
            ($kind:expr, $call:expr) => {{
                self.stats.reduce_all_calls[$kind.index()] += 1;
                let started = Instant::now();
                let did = $call;
                self.stats.reduce_time[$kind.index()] += started.elapsed();
                if did {
                    self.stats.reduce_calls[$kind.index()] += 1;
                }
                did
            }};
        }
        loop {
            let in_band = self.density >= self.params.min_density
                && self.density <= self.params.max_density;
            if in_band {
                if self.params.deg1
                    && (self.params.dv_threshold == 0.0
                        || self.degree_variance() >= self.params.dv_threshold)
                {
                    run!(Reduction::Deg1, self.deg1_reduction());
                }
                // Hand the shrunken residual to a fresh solver for locality.
                if self.n > 100
                    && self.n as f64 * self.params.shrink >= self.remaining as f64
                    && self.decompose()
                {
                    return true;
                }
            }
            if self.params.fold2 && run!(Reduction::Fold2, self.fold2_reduction()) {
                continue;
            }
            if self.params.twin && run!(Reduction::Twin, self.twin_reduction()) {
                continue;
            }
            if self.params.desk && run!(Reduction::Desk, self.desk_reduction()) {
                continue;
            }
            if in_band
                && self.params.dominance
                && (self.params.dv_threshold == 0.0
                    || self.degree_variance() >= self.params.dv_threshold)
                && run!(Reduction::Dominance, self.dominate_reduction())
            {
                continue;
            }
            if self.params.unconfined && run!(Reduction::Unconfined, self.unconfined_reduction())
            {
                continue;
            }
            if self.params.lp
                && (self.params.oc_threshold == 1.0
                    || self.odd_cycle_ratio() > self.params.oc_threshold)
                && run!(Reduction::Lp, self.lp_reduction())
            {
                continue;
            }
            if self.params.packing {
                self.stats.reduce_all_calls[Reduction::Packing.index()] += 1;
                let started = Instant::now();
                let outcome = self.packing_reduction();
                self.stats.reduce_time[Reduction::Packing.index()] += started.elapsed();
                match outcome {
                    PackingOutcome::Infeasible => return true,
                    PackingOutcome::Progress => {
                        self.stats.reduce_calls[Reduction::Packing.index()] += 1;
                        continue;
                    }
                    PackingOutcome::NoChange => {}
                }
            }
            if self.params.funnel && run!(Reduction::Funnel, self.funnel_reduction()) {
                continue;
            }
            break;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vc_solver::tests::{snapshot, solver_from};

    #[test]
    fn deg1_reduction_test() {
        // Four pendant chains hanging off a 4-cycle.
        let mut s = solver_from(
            "5 13\n13 9\n6 14\n14 10\n7 15\n15 11\n8 16\n16 12\n9 10\n10 11\n11 12\n12 9\n",
        );
        assert!(s.deg1_reduction());
        assert_eq!(s.remaining, 4);
        assert_eq!(s.current_value, 4);
    }

    #[test]
    fn deg1_restore_test() {
        let mut s = solver_from("1 2\n2 3\n3 4\n");
        let before = snapshot(&s);
        let mark = s.remaining;
        assert!(s.deg1_reduction());
        s.restore_to(mark);
        assert_eq!(snapshot(&s), before);
    }

    #[test]
    fn dominate_reduction_test() {
        let mut s = solver_from("1 2\n1 3\n2 3\n");
        assert!(s.dominate_reduction());
        assert_eq!(s.current_value, 2);
    }

    #[test]
    fn fold2_reduction_test() {
        // Path on five vertices: folding cascades down to nothing left.
        let mut s = solver_from("1 2\n2 3\n3 4\n4 5\n");
        let before = snapshot(&s);
        let mark = s.remaining;
        assert!(s.fold2_reduction());
        assert!(s.remaining < 5);
        s.restore_to(mark);
        assert_eq!(snapshot(&s), before);
    }

    #[test]
    fn fold2_triangle_neighbors_test() {
        // Degree-2 vertex with adjacent neighbors is excluded, not folded.
        let mut s = solver_from("1 2\n1 3\n2 3\n2 4\n3 4\n");
        assert!(s.fold2_reduction());
        assert_eq!(s.assignment[0], 0);
        assert_eq!(s.assignment[1], 1);
        assert_eq!(s.assignment[2], 1);
        assert_eq!(s.remaining, 1);
        assert!(s.modifieds.is_empty());
    }

    #[test]
    fn lp_reduction_path_test() {
        let mut s = solver_from("1 2\n2 3\n3 4\n4 5\n");
        assert!(s.lp_reduction());
        assert_eq!(s.remaining, 0);
        assert_eq!(s.current_value, 2);
        assert_eq!(&s.assignment[..], &[0, 1, 0, 1, 0]);
    }

    #[test]
    fn lp_reduction_star_test() {
        let mut s = solver_from("1 2\n1 3\n1 4\n1 5\n");
        assert!(s.lp_reduction());
        assert_eq!(s.current_value, 1);
        assert_eq!(s.assignment[0], 1);
    }

    #[test]
    fn lp_reduction_restore_test() {
        let mut s = solver_from("1 2\n2 3\n3 4\n4 5\n5 1\n5 6\n6 7\n");
        let before = snapshot(&s);
        let mark = s.remaining;
        s.lp_reduction();
        s.restore_to(mark);
        let after = snapshot(&s);
        // Flow edges may differ; everything else must round-trip exactly.
        assert_eq!(after.0, before.0);
        assert_eq!(after.1, before.1);
        assert_eq!(after.2, before.2);
        assert_eq!(after.3, before.3);
        assert_eq!(after.6, before.6);
    }

    #[test]
    fn unconfined_reduction_test() {
        let mut s = solver_from(
            "1 5\n1 6\n1 7\n2 3\n2 4\n2 7\n3 5\n3 8\n4 5\n4 7\n5 6\n5 14\n6 7\n6 14\n\
             7 11\n8 11\n8 12\n8 13\n11 12\n11 13\n12 14\n13 14\n",
        );
        assert!(s.unconfined_reduction());
    }

    #[test]
    fn unconfined_diamond_test() {
        let mut s = solver_from(
            "1 2\n1 4\n1 8\n1 10\n1 13\n1 14\n2 3\n2 5\n2 9\n3 4\n3 6\n3 10\n4 5\n4 7\n\
             5 6\n5 8\n6 7\n6 9\n7 8\n7 10\n8 9\n6 11\n6 12\n6 14\n9 10\n9 13\n10 11\n\
             10 12\n11 12\n11 13\n12 14\n13 14\n",
        );
        assert!(s.unconfined_reduction());
    }

    #[test]
    fn unconfined_emits_packing_test() {
        // In a triangle every vertex confines its neighbors immediately.
        let mut s = solver_from("1 2\n1 3\n2 3\n");
        assert!(s.unconfined_reduction());
        assert_eq!(s.assignment[0], 1);
        assert!(!s.packing.is_empty());
    }

    #[test]
    fn twin_reduction_test() {
        let mut s = solver_from(
            "1 2\n1 3\n1 4\n5 2\n5 3\n5 4\n6 2\n6 3\n6 4\n7 8\n7 9\n7 10\n8 9\n11 8\n\
             11 9\n11 10\n12 13\n12 14\n12 15\n16 13\n16 14\n16 15\n",
        );
        assert!(s.twin_reduction());
        // Two independent twin pairs fold, one connected pair resolves.
        assert_eq!(s.remaining, 3);
        assert_eq!(s.current_value, 7);
    }

    #[test]
    fn twin_restore_test() {
        let mut s = solver_from("1 4\n1 5\n1 6\n2 4\n2 5\n2 6\n4 7\n5 8\n6 9\n");
        let before = snapshot(&s);
        let mark = s.remaining;
        assert!(s.twin_reduction());
        s.restore_to(mark);
        assert_eq!(snapshot(&s), before);
    }

    #[test]
    fn funnel_reduction_test() {
        let mut s = solver_from(
            "4 2\n4 11\n2 3\n3 1\n3 5\n1 5\n1 6\n1 7\n5 6\n5 7\n6 7\n6 8\n6 10\n7 9\n\
             7 11\n8 9\n10 11\n",
        );
        let before = snapshot(&s);
        let mark = s.remaining;
        assert!(s.funnel_reduction());
        assert!(!s.modifieds.is_empty());
        assert_eq!(s.assignment[0], 2);
        assert_eq!(s.assignment[2], 2);
        s.restore_to(mark);
        assert_eq!(snapshot(&s), before);
    }

    #[test]
    fn desk_reduction_test() {
        let mut s = solver_from("1 2\n1 3\n1 5\n2 3\n3 4\n3 6\n4 5\n4 7\n5 6\n6 8\n");
        let before = snapshot(&s);
        let mark = s.remaining;
        assert!(s.desk_reduction());
        assert!(!s.modifieds.is_empty());
        for v in [0, 2, 3, 4] {
            assert_eq!(s.assignment[v], 2);
        }
        // The shared neighbor of both sides is forced into the cover.
        assert_eq!(s.assignment[1], 1);
        s.restore_to(mark);
        assert_eq!(snapshot(&s), before);
    }

    #[test]
    fn packing_infeasible_test() {
        let mut s = solver_from("1 2\n2 3\n");
        s.packing.push(PackingConstraint {
            bound: 1,
            members: vec![0, 2],
        });
        s.set(1, 0);
        assert_eq!(s.packing_reduction(), PackingOutcome::Infeasible);
    }

    #[test]
    fn packing_forces_exclusion_test() {
        // A saturated constraint on opposite corners of a 4-cycle pushes
        // both corners out of the cover.
        let mut s = solver_from("1 2\n2 3\n3 4\n4 1\n");
        s.packing.push(PackingConstraint {
            bound: 2,
            members: vec![1, 3],
        });
        assert_eq!(s.packing_reduction(), PackingOutcome::Progress);
        assert_eq!(&s.assignment[..], &[1, 0, 1, 0]);
    }

    #[test]
    fn packing_forces_inclusion_test() {
        // An over-tight constraint on the leaves of a claw covers the hub.
        let mut s = solver_from("1 2\n1 3\n1 4\n");
        s.packing.push(PackingConstraint {
            bound: 1,
            members: vec![1, 2, 3],
        });
        assert_eq!(s.packing_reduction(), PackingOutcome::Progress);
        assert_eq!(s.assignment[0], 1);
        // The derived constraint over the hub's neighborhood is recorded.
        assert_eq!(s.packing.len(), 2);
        assert_eq!(s.packing[1].bound, 2);
    }

    #[test]
    fn reduce_solves_easy_graph_test() {
        let mut s = solver_from("1 2\n2 3\n3 4\n4 5\n");
        assert!(!s.reduce());
        assert_eq!(s.remaining, 0);
        assert_eq!(s.current_value, 2);
    }

    #[test]
    fn measures_test() {
        let s = solver_from("1 2\n2 3\n1 3\n3 4\n");
        assert!(s.degree_variance() > 0.0);
        assert!(s.odd_cycle_ratio() > 0.0);
        let bip = solver_from("1 2\n2 3\n3 4\n");
        assert_eq!(bip.odd_cycle_ratio(), 0.0);
    }
}
