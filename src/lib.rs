//! Exact minimum vertex cover (equivalently, maximum independent set) by
//! branch-and-reduce: a suite of polynomial-time reductions shrinks the
//! residual graph, lower bounds prune the search, and connected components
//! are solved independently. Every change to the graph is recorded on a
//! restore stack so that backtracking is a deterministic replay in reverse.

pub mod cust_error;
pub mod fast_set;
pub mod graph;
pub mod params;
pub mod stats;
pub mod modified;
pub mod vc_solver;
pub mod bipart_flow;
pub mod kernelization;
pub mod bounds;
pub mod bounded_search;
pub mod decompose;
pub mod report;
