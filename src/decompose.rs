//! Connected-component decomposition. When the residual graph falls apart
//! (or has shrunk enough to justify a fresh start), each component is handed
//! to its own solver with locally reindexed adjacency, the still-live
//! packing constraints, the modifications whose removed vertices it must
//! keep tracking, and whatever matching edges stay inside it. Two extra
//! slots per component act as constant-0 and constant-1 stand-ins for
//! out-of-component vertices referenced by translated modifications.

use std::rc::Rc;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::modified::{reverse_stack, ModKind};
use crate::vc_solver::{PackingConstraint, VCSolver};

impl VCSolver {
    /// Splits the residual graph and solves each part independently. Returns
    /// `true` when the node was fully handled here (including the infeasible
    /// case where a live packing constraint cannot be satisfied any more).
    pub(crate) fn decompose(&mut self) -> bool {
        let mut comp_id = vec![-1isize; self.n];
        let mut comp_size = vec![0usize; self.n];
        let mut num_components = 0usize;
        {
            let mut queue: Vec<usize> = Vec::new();
            for s in 0..self.n {
                if self.assignment[s] < 0 && comp_id[s] < 0 {
                    num_components += 1;
                    queue.clear();
                    queue.push(s);
                    comp_id[s] = s as isize;
                    let mut qs = 0;
                    while qs < queue.len() {
                        let v = queue[qs];
                        qs += 1;
                        for i in 0..self.adj[v].len() {
                            let u = self.adj[v][i];
                            if self.assignment[u] < 0 && comp_id[u] < 0 {
                                comp_id[u] = s as isize;
                                queue.push(u);
                            }
                        }
                    }
                    comp_size[s] = queue.len();
                }
            }
        }
        if num_components <= 1
            && (self.n <= 100 || self.n as f64 * self.params.shrink < self.remaining as f64)
        {
            return false;
        }

        let mut comps: Vec<(usize, usize)> = (0..self.n)
            .filter(|&i| self.assignment[i] < 0 && comp_id[i] == i as isize)
            .map(|i| (comp_size[i], i))
            .collect();
        comps.sort_unstable();
        let mut vss: Vec<Vec<usize>> = vec![Vec::new(); comps.len()];
        {
            let mut slot_of = vec![0usize; self.n];
            for (idx, &(_, root)) in comps.iter().enumerate() {
                slot_of[root] = idx;
            }
            for i in 0..self.n {
                if self.assignment[i] < 0 {
                    vss[slot_of[comp_id[i] as usize]].push(i);
                }
            }
            // Inside a component, highest degree first.
            for vs in vss.iter_mut() {
                let mut order: Vec<(usize, usize)> =
                    vs.iter().map(|&v| (self.n - self.deg(v), v)).collect();
                order.sort_unstable();
                *vs = order.into_iter().map(|(_, v)| v).collect();
            }
        }

        // The replayed assignment resolves folded vertices wherever their
        // representative is decided; the rest must stay tracked.
        let mut replayed = self.reconstructed_assignment();
        let mut size: Vec<usize> = vss.iter().map(|vs| vs.len()).collect();
        let mut pos1 = vec![-1isize; self.cap];
        let mut pos2 = vec![0usize; self.cap];
        for (i, vs) in vss.iter().enumerate() {
            for (j, &v) in vs.iter().enumerate() {
                pos1[v] = i as isize;
                pos2[v] = j;
            }
        }

        // Constraints that can still bite, and the folded vertices they
        // mention, which must keep living in some component.
        let mut live_packing: Vec<PackingConstraint> = Vec::new();
        let mut need = vec![false; self.cap];
        for c in &self.packing {
            let max_inside = c.max_inside();
            let mut sum = 0isize;
            let mut open = 0isize;
            for &v in &c.members {
                if replayed[v] < 0 || replayed[v] == 2 {
                    open += 1;
                }
                if replayed[v] == 1 {
                    sum += 1;
                }
            }
            if sum > max_inside {
                return true;
            }
            if sum + open > max_inside {
                live_packing.push(c.clone());
                for &v in &c.members {
                    if replayed[v] == 2 {
                        need[v] = true;
                    }
                }
            }
        }
        // A tracked removed vertex keeps its carriers tracked as well.
        for m in &self.modifieds {
            if m.removed.iter().any(|&v| need[v]) {
                match m.kind {
                    ModKind::Fold => {
                        if replayed[m.vs[0]] == 2 {
                            need[m.vs[0]] = true;
                        }
                    }
                    ModKind::Alternative { .. } => {
                        for &v in &m.vs {
                            if replayed[v] == 2 {
                                need[v] = true;
                            }
                        }
                    }
                }
            }
        }
        // Newest first: assign every tracked removed vertex a slot in the
        // component that hosts its representative.
        for m in self.modifieds.iter().rev() {
            if m.removed.iter().any(|&v| need[v]) {
                let target = match m.kind {
                    ModKind::Fold => pos1[m.vs[0]],
                    ModKind::Alternative { .. } => {
                        m.vs.iter().map(|&v| pos1[v]).max().unwrap_or(-1)
                    }
                };
                debug_assert!(target >= 0);
                for &v in &m.removed {
                    debug_assert_eq!(pos1[v], -1);
                    pos1[v] = target;
                    pos2[v] = size[target as usize];
                    size[target as usize] += 1;
                }
            }
        }

        let comp_count = vss.len();
        debug!(
            "decompose: {} components, residual {} of {}",
            comp_count, self.remaining, self.n
        );
        let mut subs: Vec<VCSolver> = Vec::with_capacity(comp_count);
        for i in 0..comp_count {
            let vs = &vss[i];
            size[i] += 2;
            let mut adj2: Vec<Vec<usize>> = Vec::with_capacity(vs.len());
            for &v in vs.iter() {
                let mut list: Vec<usize> = Vec::with_capacity(self.adj[v].len());
                for &u in &self.adj[v] {
                    if self.assignment[u] < 0 {
                        list.push(pos2[u]);
                    }
                }
                list.sort_unstable();
                adj2.push(list);
            }
            let mut sub = VCSolver::new(adj2, size[i], Rc::clone(&self.params));
            sub.deadline = self.deadline;
            sub.rng = StdRng::seed_from_u64(self.rng.gen());
            sub.component = true;
            sub.depth = self.depth + usize::from(comp_count > 1);
            for (j, &v) in vs.iter().enumerate() {
                let inf = self.in_flow[v];
                if inf >= 0 && pos1[inf as usize] == i as isize && pos2[inf as usize] < vs.len()
                {
                    sub.in_flow[j] = pos2[inf as usize] as isize;
                }
                let outf = self.out_flow[v];
                if outf >= 0
                    && pos1[outf as usize] == i as isize
                    && pos2[outf as usize] < vs.len()
                {
                    sub.out_flow[j] = pos2[outf as usize] as isize;
                }
            }
            let cap = sub.cap;
            sub.assignment[cap - 2] = 0;
            sub.optimal_solution[cap - 2] = 0;
            sub.assignment[cap - 1] = 1;
            sub.optimal_solution[cap - 1] = 1;
            subs.push(sub);
        }

        for c in &live_packing {
            let mut target = -1isize;
            for &v in &c.members {
                if (replayed[v] < 0 || replayed[v] == 2) && pos1[v] > target {
                    target = pos1[v];
                }
            }
            debug_assert!(target >= 0);
            subs[target as usize].packing.push(c.clone());
        }
        for m in &self.modifieds {
            let p = pos1[m.removed[0]];
            if p >= 0 {
                subs[p as usize].modifieds.push(m.clone());
            }
        }

        let mut vss2: Vec<Vec<usize>> = subs.iter().map(|sub| vec![0usize; sub.cap - 2]).collect();
        for i in 0..self.cap {
            if pos1[i] >= 0 {
                vss2[pos1[i] as usize][pos2[i]] = i;
            }
        }

        let mut sum = self.current_value;
        let mut idx = 0;
        let subs_len = subs.len();
        while idx < subs_len && self.optimal_value > sum {
            let sub = &mut subs[idx];
            let cap = sub.cap;

            // Translate constraint members into local indices; decided
            // out-of-component members already consumed part of the bound.
            let mut local_packing: Vec<PackingConstraint> = Vec::new();
            for c in &sub.packing {
                let mut bound = c.bound;
                let mut members: Vec<usize> = Vec::new();
                for &v in &c.members {
                    if pos1[v] == idx as isize {
                        members.push(pos2[v]);
                    } else {
                        debug_assert!(replayed[v] == 0 || replayed[v] == 1);
                        if replayed[v] == 0 {
                            bound -= 1;
                        }
                    }
                }
                if (members.len() as isize) < bound {
                    return true;
                }
                if bound <= 0 {
                    continue;
                }
                local_packing.push(PackingConstraint { bound, members });
            }
            sub.packing = local_packing;

            // Translate inherited modifications; out-of-component carriers
            // become the constant slot matching their decided value.
            for m in sub.modifieds.iter_mut() {
                let removed: Vec<usize> = m
                    .removed
                    .iter()
                    .map(|&v| {
                        debug_assert_eq!(pos1[v], idx as isize);
                        pos2[v]
                    })
                    .collect();
                let vs: Vec<usize> = match m.kind {
                    ModKind::Fold => {
                        let v = m.vs[0];
                        let slot = if pos1[v] == idx as isize {
                            pos2[v]
                        } else {
                            debug_assert!(replayed[v] == 0 || replayed[v] == 1);
                            cap - 2 + replayed[v] as usize
                        };
                        vec![slot]
                    }
                    ModKind::Alternative { .. } => m
                        .vs
                        .iter()
                        .map(|&v| {
                            if pos1[v] == idx as isize {
                                pos2[v]
                            } else {
                                debug_assert!(replayed[v] == 0 || replayed[v] == 1);
                                cap - 2 + replayed[v] as usize
                            }
                        })
                        .collect(),
                };
                m.removed = removed;
                m.vs = vs;
                m.add = 0;
                m.old_adj = Vec::new();
            }

            if idx + 1 == subs_len {
                // No point searching below what would already tie the
                // incumbent.
                sub.optimal_value = sub.optimal_value.min(self.optimal_value - sum);
            }
            // Prime the default all-in solution through the inherited folds
            // so every tracked slot starts with a consistent value.
            reverse_stack(&sub.modifieds, &mut sub.optimal_solution);
            debug_assert!(sub
                .optimal_solution
                .iter()
                .all(|&x| x == 0 || x == 1));

            sub.solve().expect("parameters were validated at the root");
            if sub.timed_out {
                self.timed_out = true;
            }
            self.stats.merge(&sub.stats);
            sum += sub.optimal_value;
            for j in 0..cap - 2 {
                debug_assert!(
                    sub.optimal_solution[j] == 0 || sub.optimal_solution[j] == 1
                );
                replayed[vss2[idx][j]] = sub.optimal_solution[j];
            }
            idx += 1;
        }

        if self.optimal_value > sum {
            debug!("components improved the incumbent to {}", sum);
            self.optimal_value = sum;
            self.optimal_solution.copy_from_slice(&self.assignment);
            for i in 0..subs.len() {
                for (j, &v) in vss[i].iter().enumerate() {
                    self.optimal_solution[v] = subs[i].optimal_solution[j];
                }
            }
            reverse_stack(&self.modifieds, &mut self.optimal_solution);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::params::Params;
    use crate::vc_solver::tests::solver_from;
    use crate::vc_solver::VCSolver;
    use std::rc::Rc;

    #[test]
    fn two_triangles_test() {
        let mut s = solver_from("1 2\n2 3\n1 3\n4 5\n5 6\n4 6\n");
        assert!(s.decompose());
        assert_eq!(s.optimal_value, 4);
        for v in 0..6 {
            assert!(s.optimal_solution[v] == 0 || s.optimal_solution[v] == 1);
        }
    }

    #[test]
    fn single_component_not_split_test() {
        let mut s = solver_from("1 2\n2 3\n1 3\n");
        assert!(!s.decompose());
    }

    #[test]
    fn component_with_fold_test() {
        // Fold a path vertex first; the tracked state survives the split.
        let mut s = solver_from("1 2\n2 3\n3 4\n4 5\n6 7\n7 8\n6 8\n");
        s.fold(&[1], &[0, 2]);
        assert!(s.decompose());
        assert_eq!(s.optimal_value, 4);
    }

    #[test]
    fn large_cycle_shrinks_into_fresh_solver_test() {
        let mut edges = String::new();
        let n = 120;
        for i in 1..=n {
            edges.push_str(&format!("{} {}\n", i, i % n + 1));
        }
        let mut s = solver_from(&edges);
        assert_eq!(s.solve().unwrap(), n / 2);
    }

    #[test]
    fn sum_of_components_test() {
        // A triangle, a 5-cycle and an edge: 2 + 3 + 1.
        let mut s = solver_from(
            "1 2\n2 3\n1 3\n4 5\n5 6\n6 7\n7 8\n8 4\n9 10\n",
        );
        assert_eq!(s.solve().unwrap(), 6);
    }

    #[test]
    fn stats_merged_from_components_test() {
        let graph = crate::graph::Graph::read_snap(std::io::Cursor::new(
            "1 2\n2 3\n1 3\n4 5\n5 6\n4 6\n",
        ))
        .unwrap();
        let mut s = VCSolver::from_graph(&graph, Rc::new(Params::default()));
        s.solve().unwrap();
        // Component solvers ran reductions; their call counters surface here.
        let calls: u64 = s.stats.reduce_all_calls.iter().sum();
        assert!(calls > 0);
    }
}
