//! Search statistics. Every solver instance owns a `Stats` value; when a
//! component sub-solver finishes, its counters are merged into the parent so
//! the root reports totals for the whole run.

use std::time::Duration;

/// The reduction kinds tracked by the statistics, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Deg1,
    Dominance,
    Unconfined,
    Lp,
    Packing,
    Fold2,
    Twin,
    Funnel,
    Desk,
}

impl Reduction {
    pub const ALL: [Reduction; 9] = [
        Reduction::Deg1,
        Reduction::Dominance,
        Reduction::Unconfined,
        Reduction::Lp,
        Reduction::Packing,
        Reduction::Fold2,
        Reduction::Twin,
        Reduction::Funnel,
        Reduction::Desk,
    ];

    pub fn index(self) -> usize {
        match self {
            Reduction::Deg1 => 0,
            Reduction::Dominance => 1,
            Reduction::Unconfined => 2,
            Reduction::Lp => 3,
            Reduction::Packing => 4,
            Reduction::Fold2 => 5,
            Reduction::Twin => 6,
            Reduction::Funnel => 7,
            Reduction::Desk => 8,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Reduction::Deg1 => "deg1",
            Reduction::Dominance => "dom",
            Reduction::Unconfined => "unconfined",
            Reduction::Lp => "lp",
            Reduction::Packing => "packing",
            Reduction::Fold2 => "fold2",
            Reduction::Twin => "twin",
            Reduction::Funnel => "funnel",
            Reduction::Desk => "desk",
        }
    }
}

/// Which lower bound produced the value that caused a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerBoundType {
    Trivial,
    Clique,
    Lp,
    Cycle,
}

impl LowerBoundType {
    pub fn index(self) -> usize {
        match self {
            LowerBoundType::Trivial => 0,
            LowerBoundType::Clique => 1,
            LowerBoundType::Lp => 2,
            LowerBoundType::Cycle => 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Completed two-child branchings.
    pub branchings: u64,
    /// Lower-bound cuts taken immediately after the first child.
    pub left_cuts: u64,
    /// Lower bound computed at the root node.
    pub root_lb: usize,

    /// Vertices removed per reduction.
    pub reduce_removed: [u64; 9],
    /// Calls per reduction that made progress.
    pub reduce_calls: [u64; 9],
    /// All calls per reduction.
    pub reduce_all_calls: [u64; 9],
    pub reduce_time: [Duration; 9],

    /// Effective cuts per lower-bound type.
    pub lb_hits: [u64; 4],
    pub clique_lb_time: Duration,
    pub cycle_lb_time: Duration,
}

impl Stats {
    pub fn new() -> Self {
        Stats::default()
    }

    /// Folds a finished sub-solver's counters into this one. The root lower
    /// bound belongs to the root solver alone and is left untouched.
    pub fn merge(&mut self, other: &Stats) {
        self.branchings += other.branchings;
        self.left_cuts += other.left_cuts;
        for i in 0..9 {
            self.reduce_removed[i] += other.reduce_removed[i];
            self.reduce_calls[i] += other.reduce_calls[i];
            self.reduce_all_calls[i] += other.reduce_all_calls[i];
            self.reduce_time[i] += other.reduce_time[i];
        }
        for i in 0..4 {
            self.lb_hits[i] += other.lb_hits[i];
        }
        self.clique_lb_time += other.clique_lb_time;
        self.cycle_lb_time += other.cycle_lb_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_test() {
        let mut a = Stats::new();
        a.branchings = 3;
        a.root_lb = 7;
        a.reduce_removed[Reduction::Fold2.index()] = 5;
        let mut b = Stats::new();
        b.branchings = 2;
        b.root_lb = 99;
        b.reduce_removed[Reduction::Fold2.index()] = 1;
        b.lb_hits[LowerBoundType::Clique.index()] = 4;
        a.merge(&b);
        assert_eq!(a.branchings, 5);
        assert_eq!(a.root_lb, 7);
        assert_eq!(a.reduce_removed[Reduction::Fold2.index()], 6);
        assert_eq!(a.lb_hits[LowerBoundType::Clique.index()], 4);
    }

    #[test]
    fn labels_test() {
        assert_eq!(Reduction::Deg1.label(), "deg1");
        assert_eq!(Reduction::ALL.len(), 9);
        for (i, r) in Reduction::ALL.iter().enumerate() {
            assert_eq!(r.index(), i);
        }
    }
}
