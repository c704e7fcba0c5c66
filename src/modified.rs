//! Reversible graph transformations. A fold contracts a set of vertices into
//! one representative; an alternative encodes a two-way structural choice
//! between symmetric sets. Both carry enough state to replay the decision of
//! the reduced graph back onto the removed vertices.

/// Discriminates the replay semantics of a [`Modification`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModKind {
    /// Contraction: the first entry of `vs` is reused as the contracted
    /// vertex; its value in the reduced solution decides which half of
    /// `removed` joins the cover.
    Fold,
    /// Two symmetric sets A and B with private neighborhoods A' and B';
    /// `k` is `|A'|`, the split point of `vs`. Exactly one of A, B ends up
    /// in the cover.
    Alternative { k: usize },
}

/// One entry of the modification stack.
///
/// `removed` holds the vertices taken out of the residual graph (marked 2 in
/// the assignment vector), `vs` the vertices whose adjacency was rebound,
/// `old_adj` their previous adjacency lists, and `add` the contribution of
/// the transformation to the cover size. Entries translated into a component
/// sub-solver carry `add == 0` and empty `old_adj`; they are only ever
/// replayed, never undone.
#[derive(Debug, Clone)]
pub struct Modification {
    pub kind: ModKind,
    pub add: usize,
    pub removed: Vec<usize>,
    pub vs: Vec<usize>,
    pub old_adj: Vec<Vec<usize>>,
}

impl Modification {
    /// Rewrites `solution` for the removed vertices once the reduced graph
    /// has been decided. Entries still undecided in `solution` are left
    /// untouched.
    pub fn reverse(&self, solution: &mut [i8]) {
        match self.kind {
            ModKind::Fold => {
                let k = self.removed.len() / 2;
                match solution[self.vs[0]] {
                    0 => {
                        for &v in &self.removed[..k] {
                            solution[v] = 1;
                        }
                        for &v in &self.removed[k..] {
                            solution[v] = 0;
                        }
                    }
                    1 => {
                        for &v in &self.removed[..k] {
                            solution[v] = 0;
                        }
                        for &v in &self.removed[k..] {
                            solution[v] = 1;
                        }
                    }
                    _ => {}
                }
            }
            ModKind::Alternative { k } => {
                let mut a_all_out = false;
                let mut a_all_in = true;
                let mut b_all_out = false;
                let mut b_all_in = true;
                for &v in &self.vs[..k] {
                    if solution[v] == 0 {
                        a_all_out = true;
                    }
                    if solution[v] != 1 {
                        a_all_in = false;
                    }
                }
                for &v in &self.vs[k..] {
                    if solution[v] == 0 {
                        b_all_out = true;
                    }
                    if solution[v] != 1 {
                        b_all_in = false;
                    }
                }
                let half = self.removed.len() / 2;
                if a_all_in || b_all_out {
                    for &v in &self.removed[..half] {
                        solution[v] = 0;
                    }
                    for &v in &self.removed[half..] {
                        solution[v] = 1;
                    }
                } else if b_all_in || a_all_out {
                    for &v in &self.removed[..half] {
                        solution[v] = 1;
                    }
                    for &v in &self.removed[half..] {
                        solution[v] = 0;
                    }
                }
            }
        }
    }
}

/// Replays a whole modification stack, newest first, onto `solution`.
pub fn reverse_stack(stack: &[Modification], solution: &mut [i8]) {
    for m in stack.iter().rev() {
        m.reverse(solution);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_reverse_test() {
        // Degree-2 fold of v=0 with neighbors 1 and 2; vertex 1 is the
        // contracted representative, its reduced adjacency was {3}.
        let m = Modification {
            kind: ModKind::Fold,
            add: 1,
            removed: vec![0, 2],
            vs: vec![1, 3],
            old_adj: vec![vec![0, 3], vec![1]],
        };
        let mut sol = vec![2, 0, 2, 1];
        m.reverse(&mut sol);
        // Representative out of the cover: v joins it, the far neighbor not.
        assert_eq!(sol, vec![1, 0, 0, 1]);
        let mut sol = vec![2, 1, 2, 0];
        m.reverse(&mut sol);
        assert_eq!(sol, vec![0, 1, 1, 0]);
    }

    #[test]
    fn fold_reverse_undecided_test() {
        let m = Modification {
            kind: ModKind::Fold,
            add: 1,
            removed: vec![0, 2],
            vs: vec![1],
            old_adj: vec![vec![0, 2]],
        };
        let mut sol = vec![2, -1, 2];
        m.reverse(&mut sol);
        assert_eq!(sol, vec![2, -1, 2]);
    }

    #[test]
    fn alternative_reverse_test() {
        // A = {0}, B = {1}, A' = {2}, B' = {3, 4}.
        let m = Modification {
            kind: ModKind::Alternative { k: 1 },
            add: 1,
            removed: vec![0, 1],
            vs: vec![2, 3, 4],
            old_adj: vec![vec![], vec![], vec![]],
        };
        // All of A' covered: A can stay out, B goes in.
        let mut sol = vec![2, 2, 1, 0, 1];
        m.reverse(&mut sol);
        assert_eq!(sol[0], 0);
        assert_eq!(sol[1], 1);
        // Some of B' out: same resolution.
        let mut sol = vec![2, 2, 1, 0, 1];
        m.reverse(&mut sol);
        assert_eq!(&sol[0..2], &[0, 1]);
        // All of B' covered: B stays out, A goes in.
        let mut sol = vec![2, 2, 0, 1, 1];
        m.reverse(&mut sol);
        assert_eq!(sol[0], 1);
        assert_eq!(sol[1], 0);
    }
}
