use clap::Parser;
use rcpsp_demos::scenarios::Scenario;
use rcpsp_solver::{Solver, SolverOptions};
use smt_backend::NativeBackend;

/// Builds and solves one of the showcased scheduling models, printing the
/// resulting schedule as JSON.
#[derive(Parser)]
struct Cli {
    #[arg(value_enum)]
    scenario: Scenario,

    /// Reify every assertion behind a guard and shrink an unsat core on failure.
    #[arg(long)]
    debug: bool,
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let problem = cli.scenario.build();
    let options = SolverOptions {
        debug: cli.debug,
        ..SolverOptions::default()
    };
    let mut solver = Solver::new(NativeBackend::new(), problem, options);

    match solver.solve() {
        Ok(solution) => {
            let export = solution.to_export();
            println!("{}", export.to_json().expect("schedule export is always valid JSON"));
        }
        Err(e) => {
            eprintln!("solve failed: {e}");
            std::process::exit(1);
        }
    }
}
