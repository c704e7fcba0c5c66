//! Binary that reads a graph file (SNAP edge list or DIMACS), computes an
//! exact minimum vertex cover and writes a key-value report to standard out.
//! Exit code 0 means the run finished normally; anything else exits 1.

use std::error::Error;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{error, info};

use branch_and_cover::cust_error::ProcessingError;
use branch_and_cover::graph::Graph;
use branch_and_cover::params::{BranchRule, Params};
use branch_and_cover::report::{self, RunStatus};
use branch_and_cover::stats::Stats;
use branch_and_cover::vc_solver::VCSolver;

#[derive(Parser, Debug)]
#[command(
    name = "exact",
    about = "Exact minimum vertex cover by branch and reduce"
)]
struct Cli {
    /// Graph file, SNAP edge list or DIMACS
    file: PathBuf,

    /// Branching rule: 0 random, 1 min degree, 2 max degree
    #[arg(short, long, default_value_t = 2)]
    branching: u8,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 3600)]
    timeout: u64,

    /// Enable every reduction plus the clique and LP lower bounds
    #[arg(long)]
    all: bool,

    /// Enable the degree-1 reduction
    #[arg(long)]
    deg1: bool,

    /// Enable the dominance reduction
    #[arg(long)]
    dom: bool,

    /// Enable the fold2 reduction
    #[arg(long)]
    fold2: bool,

    /// Enable the LP reduction
    #[arg(long)]
    lp: bool,

    /// Enable the unconfined reduction
    #[arg(long)]
    unconfined: bool,

    /// Enable the twin reduction
    #[arg(long)]
    twin: bool,

    /// Enable the funnel reduction
    #[arg(long)]
    funnel: bool,

    /// Enable the desk reduction
    #[arg(long)]
    desk: bool,

    /// Enable the packing reduction
    #[arg(long)]
    packing: bool,

    /// Enable the clique-cover lower bound
    #[arg(long)]
    clique_lb: bool,

    /// Enable the LP lower bound
    #[arg(long)]
    lp_lb: bool,

    /// Enable the cycle-cover lower bound (needs the LP reduction)
    #[arg(long)]
    cycle_lb: bool,

    /// Only process the root node, without branching
    #[arg(long)]
    root: bool,

    /// Print the solution vector
    #[arg(long)]
    show_solution: bool,

    /// Odd-cycle-ratio threshold gating the LP reduction
    #[arg(long, default_value_t = 1.0)]
    oc: f64,

    /// Degree-variance threshold gating deg1 and dominance
    #[arg(long, default_value_t = 0.0)]
    dv: f64,

    /// Lower edge-density bound for the gated reductions
    #[arg(long, default_value_t = 0.0)]
    min_density: f64,

    /// Upper edge-density bound for the gated reductions
    #[arg(long, default_value_t = 1.0)]
    max_density: f64,

    /// Residual-size fraction below which reductions run (1.0: always)
    #[arg(long, default_value_t = 1.0)]
    size: f64,
}

fn params_from(cli: &Cli) -> Result<Params, ProcessingError> {
    let branching = BranchRule::from_index(cli.branching).ok_or_else(|| {
        ProcessingError::InvalidConfig(format!("unknown branching rule {}", cli.branching))
    })?;
    Ok(Params {
        deg1: cli.all || cli.deg1,
        dominance: cli.all || cli.dom,
        fold2: cli.all || cli.fold2,
        lp: cli.all || cli.lp,
        unconfined: cli.all || cli.unconfined,
        twin: cli.all || cli.twin,
        funnel: cli.all || cli.funnel,
        desk: cli.all || cli.desk,
        packing: cli.packing,
        clique_lb: cli.all || cli.clique_lb,
        lp_lb: cli.all || cli.lp_lb,
        cycle_lb: cli.cycle_lb,
        branching,
        only_root: cli.root,
        time_limit: Duration::from_secs(cli.timeout),
        dv_threshold: cli.dv,
        oc_threshold: cli.oc,
        min_density: cli.min_density,
        max_density: cli.max_density,
        size_threshold: cli.size,
        ..Params::default()
    })
}

/// Checks the recovered assignment against the input graph: 0/1 everywhere,
/// every edge covered, and the count matching the reported value.
fn verify_cover(graph: &Graph, solver: &VCSolver) -> Result<(), ProcessingError> {
    let n = graph.num_vertices();
    let mut count = 0usize;
    for v in 0..n {
        let a = solver.optimal_solution[v];
        if a != 0 && a != 1 {
            return Err(ProcessingError::InvalidSolution(format!(
                "vertex {} left unresolved",
                graph.vertex_id[v]
            )));
        }
        count += a as usize;
        for &u in &graph.adj[v] {
            if solver.optimal_solution[v] + solver.optimal_solution[u] < 1 {
                return Err(ProcessingError::InvalidSolution(format!(
                    "edge {}-{} is not covered",
                    graph.vertex_id[v], graph.vertex_id[u]
                )));
            }
        }
    }
    if count != solver.optimal_value {
        return Err(ProcessingError::InvalidSolution(format!(
            "cover has {} vertices but value is {}",
            count, solver.optimal_value
        )));
    }
    Ok(())
}

fn run(cli: &Cli, start: Instant) -> Result<RunStatus, Box<dyn Error>> {
    let content = fs::read_to_string(&cli.file)?;
    let graph = Graph::read_auto(&content)?;
    info!(
        "graph has {} vertices and {} edges",
        graph.num_vertices(),
        graph.num_edges()
    );
    let params = params_from(cli)?;
    params.validate()?;
    let mut solver = VCSolver::from_graph(&graph, Rc::new(params));
    let value = solver.solve()?;
    let runtime = start.elapsed().as_secs_f64();
    verify_cover(&graph, &solver)?;
    let status = if solver.timed_out {
        RunStatus::Timeout
    } else {
        RunStatus::Normal
    };
    info!("minimum vertex cover has {} vertices", value);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_report(&mut out, status, value, runtime, &solver.stats)?;
    if cli.show_solution {
        use io::Write;
        writeln!(
            out,
            "{:<20}\t{}",
            "solution",
            report::solution_string(&solver.optimal_solution, &graph.vertex_id)
        )?;
    }
    Ok(status)
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();
    let status = match run(&cli, start) {
        Ok(status) => status,
        Err(err) => {
            error!("{}", err);
            let stdout = io::stdout();
            let _ = report::write_report(
                stdout.lock(),
                RunStatus::Exception,
                0,
                start.elapsed().as_secs_f64(),
                &Stats::new(),
            );
            RunStatus::Exception
        }
    };
    process::exit(status.exit_code());
}
