use clap::{Parser, Subcommand};
use fsi_coupling::{CouplingError, CouplingOrchestrator, ProgressRecord};
use fsi_project::ProjectError;
use fsi_solvers::{TimeSeriesCsv, builtin_registry};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uom::si::time::second;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Case error: {0}")]
    Project(#[from] ProjectError),

    #[error("Coupling error: {0}")]
    Coupling(#[from] CouplingError),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "fsi-cli")]
#[command(about = "Time-domain fluid-structure coupling driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate case file syntax and structure
    Validate {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
    },
    /// Run a coupled simulation
    Run {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
        /// Override the number of outer time steps
        #[arg(long)]
        n_time_steps: Option<usize>,
        /// Suppress the residual table
        #[arg(long)]
        quiet: bool,
        /// Also write a per-step CSV time series to this path
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// List the built-in solver and postprocessor identifiers
    Solvers,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { case_path } => cmd_validate(&case_path),
        Commands::Run {
            case_path,
            n_time_steps,
            quiet,
            csv,
        } => cmd_run(&case_path, n_time_steps, quiet, csv.as_deref()),
        Commands::Solvers => {
            cmd_solvers();
            Ok(())
        }
    }
}

fn load_case(path: &Path) -> CliResult<fsi_project::CaseDef> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let case = if is_json {
        fsi_project::load_json(path)?
    } else {
        fsi_project::load_yaml(path)?
    };
    Ok(case)
}

fn cmd_validate(case_path: &Path) -> CliResult<()> {
    println!("Validating case: {}", case_path.display());
    let case = load_case(case_path)?;
    println!("✓ Case is valid");
    println!("  Name: {}", case.name);
    println!(
        "  Structure: {} nodes, solver {}",
        case.model.nodes.len(),
        case.coupling.structural_solver
    );
    println!(
        "  Aero: {} vertices, solver {}",
        case.model.vertices.len(),
        case.coupling.aero_solver
    );
    Ok(())
}

fn cmd_solvers() {
    let listing = builtin_registry().identifiers();
    for (kind, ids) in [
        ("Structural solvers", &listing.structural),
        ("Aero solvers", &listing.aero),
        ("Postprocessors", &listing.postprocessors),
    ] {
        println!("{kind}:");
        for id in ids {
            println!("  {id}");
        }
    }
}

fn cmd_run(
    case_path: &Path,
    n_time_steps: Option<usize>,
    quiet: bool,
    csv: Option<&Path>,
) -> CliResult<()> {
    let mut case = load_case(case_path)?;
    if let Some(n) = n_time_steps {
        case.coupling.n_time_steps = n;
    }
    if quiet {
        case.coupling.print_info = false;
    }
    if let Some(path) = csv {
        let id = TimeSeriesCsv::ID.to_string();
        if !case.coupling.postprocessors.contains(&id) {
            case.coupling.postprocessors.push(id.clone());
        }
        case.coupling
            .postprocessors_settings
            .insert(id, serde_json::json!({ "path": path }));
    }

    println!("Running case: {}", case.name);
    println!(
        "  dt = {:.3} s, steps = {}, substep budget = {}",
        case.coupling.dt, case.coupling.n_time_steps, case.coupling.fsi_substeps
    );

    let mut state = fsi_project::build_state(&case.model)?;
    tracing::info!(
        nodes = state.structure.num_node(),
        vertices = state.aero.struct2aero.len(),
        "simulation state built"
    );
    let registry = builtin_registry();
    let n_total = case.coupling.n_time_steps;
    let mut orch = CouplingOrchestrator::initialise(case.coupling, &registry, &mut state)?;

    let start = Instant::now();
    let mut last_emit = Instant::now();
    let mut done = 0usize;
    let summary = orch.run_with_progress(
        &mut state,
        Some(&mut |record: &ProgressRecord| {
            done += 1;
            if quiet && (done == n_total || last_emit.elapsed().as_millis() >= 100) {
                render_progress(record, done, n_total);
                last_emit = Instant::now();
            }
        }),
    )?;
    if quiet {
        clear_progress_line();
    }

    println!("✓ Simulation completed in {:.2} s", start.elapsed().as_secs_f64());
    println!("  Steps: {}", summary.steps.len());
    println!("  Non-converged steps: {}", summary.non_converged());
    if let Some(last) = summary.steps.last() {
        println!(
            "  Final time: {:.3} s ({} substeps at the last step)",
            last.time.get::<second>(),
            last.substeps
        );
    }
    if let Some(path) = csv {
        println!("  Time series written to {}", path.display());
    }
    Ok(())
}

fn render_progress(record: &ProgressRecord, done: usize, total: usize) {
    let fraction = if total == 0 {
        1.0
    } else {
        done as f64 / total as f64
    };
    print!(
        "\r  [{:>5.1}%] ts {:>5}  t = {:>8.3} s  substeps {:>3}",
        100.0 * fraction,
        record.ts,
        record.time.get::<second>(),
        record.substeps
    );
    let _ = io::stdout().flush();
}

fn clear_progress_line() {
    print!("\r{:80}\r", "");
    let _ = io::stdout().flush();
}
