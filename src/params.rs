//! Parameter bundle for the branch-and-reduce solver: reduction and
//! lower-bound toggles, the branching rule, the time limit, and the
//! selective-reduction thresholds. One value of this type is shared by a
//! solver and all of its component sub-solvers.

use std::time::Duration;

use crate::cust_error::ProcessingError;

/// Vertex selection rule used when the solver has to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchRule {
    /// Uniformly random undecided vertex (seeded, reproducible).
    Random,
    /// Undecided vertex of minimum residual degree.
    MinDegree,
    /// Undecided vertex of maximum residual degree, ties broken by the
    /// smallest number of edges inside its neighborhood.
    MaxDegree,
}

impl BranchRule {
    pub fn from_index(i: u8) -> Option<Self> {
        match i {
            0 => Some(BranchRule::Random),
            1 => Some(BranchRule::MinDegree),
            2 => Some(BranchRule::MaxDegree),
            _ => None,
        }
    }
}

/// All tunable controls of the solver.
#[derive(Debug, Clone)]
pub struct Params {
    // Reductions.
    pub deg1: bool,
    pub dominance: bool,
    pub fold2: bool,
    pub lp: bool,
    pub unconfined: bool,
    pub twin: bool,
    pub funnel: bool,
    pub desk: bool,
    pub packing: bool,

    // Lower bounds. The trivial bound is always available.
    pub clique_lb: bool,
    pub lp_lb: bool,
    pub cycle_lb: bool,

    pub branching: BranchRule,
    /// Process only the root node, without branching.
    pub only_root: bool,
    pub time_limit: Duration,

    /// Degree-variance threshold gating deg1 and dominance; 0.0 disables the
    /// gate.
    pub dv_threshold: f64,
    /// Odd-cycle-ratio threshold gating the LP reduction; 1.0 disables the
    /// gate.
    pub oc_threshold: f64,
    /// Density band outside of which deg1, dominance and the opportunistic
    /// decompose are skipped.
    pub min_density: f64,
    pub max_density: f64,
    /// Reductions run only once the residual has at most
    /// `size_threshold * n` vertices; 1.0 means from the start.
    pub size_threshold: f64,
    /// Residual-shrinkage factor that respawns the solver on a smaller
    /// substrate.
    pub shrink: f64,

    /// Seed for the random branching rule.
    pub seed: u64,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            deg1: true,
            dominance: true,
            fold2: true,
            lp: true,
            unconfined: true,
            twin: true,
            funnel: true,
            desk: true,
            packing: true,
            clique_lb: true,
            lp_lb: true,
            cycle_lb: true,
            branching: BranchRule::MaxDegree,
            only_root: false,
            time_limit: Duration::from_secs(3600),
            dv_threshold: 0.0,
            oc_threshold: 1.0,
            min_density: 0.0,
            max_density: 1.0,
            size_threshold: 1.0,
            shrink: 0.5,
            seed: 4327897,
        }
    }
}

impl Params {
    /// Rejects option combinations the solver cannot honor. The cycle lower
    /// bound walks the permutation induced by the LP matching, so it cannot
    /// run without the LP reduction maintaining that matching.
    pub fn validate(&self) -> Result<(), ProcessingError> {
        if self.cycle_lb && !self.lp {
            return Err(ProcessingError::InvalidConfig(
                "the cycle lower bound requires the LP reduction".to_owned(),
            ));
        }
        if self.min_density > self.max_density {
            return Err(ProcessingError::InvalidConfig(
                "min_density exceeds max_density".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_test() {
        let p = Params::default();
        assert!(p.validate().is_ok());
        assert_eq!(p.branching, BranchRule::MaxDegree);
        assert!((p.oc_threshold - 1.0).abs() < 1e-12);
        assert_eq!(p.time_limit, Duration::from_secs(3600));
    }

    #[test]
    fn cycle_without_lp_rejected_test() {
        let p = Params {
            lp: false,
            cycle_lb: true,
            ..Params::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn branch_rule_from_index_test() {
        assert_eq!(BranchRule::from_index(0), Some(BranchRule::Random));
        assert_eq!(BranchRule::from_index(2), Some(BranchRule::MaxDegree));
        assert_eq!(BranchRule::from_index(3), None);
    }
}
