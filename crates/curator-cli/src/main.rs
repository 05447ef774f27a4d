use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use curator_core::{
    build_feature_matrix, Constraint, ConstraintSet, Curation, Curator, CuratorOptions, Dataset, FormulationKind,
    Grouping, Summary, Value, DEFAULT_PENALTY,
};
use curator_solver::Algorithm;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "curator")]
#[command(about = "Select a subset of samples that satisfies count constraints on queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Curate a dataset and print the constraint summary
    Run {
        /// JSON array of flat sample objects
        #[arg(short, long)]
        data: PathBuf,
        /// JSON array of constraints
        #[arg(short, long)]
        constraints: PathBuf,
        /// LP encoding of relative bounds (relative, absolute)
        #[arg(long, default_value = "relative")]
        formulation: FormulationKind,
        /// LP method (simplex, interior-point)
        #[arg(short, long, default_value = "simplex")]
        method: Algorithm,
        /// Solve per sample instead of per distinct signature
        #[arg(long)]
        no_dedup: bool,
        /// Treat every constraint as hard; fail when they cannot all be met
        #[arg(long)]
        strict: bool,
        /// Seed for sampling within deduplicated groups
        #[arg(long)]
        seed: Option<u64>,
        /// Write the selected sample indices to this file as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
    /// Print how many samples match each query
    Features {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        constraints: PathBuf,
    },
    /// Validate a constraint file, optionally evaluating its queries on data
    Check {
        #[arg(short, long)]
        constraints: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Summary table
    Pretty,
    /// Selection, summary and solver outcome as JSON
    Json,
}

/// One entry of a constraint file. `index_ref` below zero means absolute bounds.
#[derive(Deserialize)]
struct ConstraintRow {
    query: String,
    min: f64,
    max: f64,
    #[serde(default = "no_reference")]
    index_ref: i64,
    #[serde(default = "default_penalty")]
    penalty_per_violation: f64,
}

fn no_reference() -> i64 {
    -1
}

fn default_penalty() -> f64 {
    DEFAULT_PENALTY
}

impl From<ConstraintRow> for Constraint {
    fn from(row: ConstraintRow) -> Self {
        let constraint = Constraint::new(row.query, row.min, row.max).with_penalty(row.penalty_per_violation);
        match usize::try_from(row.index_ref) {
            Ok(k) => constraint.relative_to(k),
            Err(_) => constraint,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    selected: Vec<usize>,
    summary: &'a Summary,
    theoretical_violation: f64,
    solver_message: &'a str,
    iterations: usize,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            data,
            constraints,
            formulation,
            method,
            no_dedup,
            strict,
            seed,
            output,
            format,
        } => {
            let dataset = or_exit(load_dataset(&data));
            let constraints = or_exit(load_constraints(&constraints));

            let options = CuratorOptions::new()
                .with_dedup(!no_dedup)
                .with_violations(!strict)
                .with_formulation(formulation)
                .with_algorithm(method);

            let curator = match Curator::new(&dataset, constraints, options) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Configuration error: {}", e);
                    std::process::exit(1);
                }
            };

            let result = match seed {
                Some(seed) => curator.run_seeded(seed),
                None => curator.run(&mut StdRng::from_os_rng()),
            };
            let curation = match result {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Curation failed: {}", e);
                    std::process::exit(1);
                }
            };

            if let Some(path) = output {
                let indices = curation.selected_indices();
                let json = or_exit(serde_json::to_string(&indices).map_err(|e| e.to_string()));
                if let Err(e) = std::fs::write(&path, json) {
                    eprintln!("Error writing {}: {}", path.display(), e);
                    std::process::exit(1);
                }
            }

            match format {
                OutputFormat::Json => print_json(&curation),
                OutputFormat::Pretty => print_pretty(&curation, options),
            }
        }
        Commands::Features { data, constraints } => {
            let dataset = or_exit(load_dataset(&data));
            let constraints = or_exit(load_constraints(&constraints));
            let queries: Vec<&str> = constraints.iter().map(|c| c.label.as_str()).collect();

            let matrix = match build_feature_matrix(&dataset, &queries) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            let counts = matrix.column_counts(&vec![true; matrix.n_samples()]);
            let width = queries.iter().map(|q| q.len()).max().unwrap_or(0);
            println!("Samples: {}", matrix.n_samples());
            println!();
            for (query, count) in queries.iter().zip(&counts) {
                println!("  {:width$} {:8}", query, count);
            }
            println!();
            println!("Distinct signatures: {}", Grouping::from_matrix(&matrix).n_groups());
        }
        Commands::Check { constraints, data } => {
            let rows = or_exit(load_constraints(&constraints));
            let mut errors = 0;

            for (i, c) in rows.iter().enumerate() {
                if let Err(e) = curator_lang::Parser::parse(&c.label) {
                    eprintln!("  [{}] '{}': {}", i, c.label, e);
                    errors += 1;
                }
            }

            let count = rows.len();
            if let Err(e) = ConstraintSet::new(rows.clone()) {
                eprintln!("  {}", e);
                errors += 1;
            }

            if let (Some(path), 0) = (data, errors) {
                let dataset = or_exit(load_dataset(&path));
                let queries: Vec<&str> = rows.iter().map(|c| c.label.as_str()).collect();
                if let Err(e) = build_feature_matrix(&dataset, &queries) {
                    eprintln!("  {}", e);
                    errors += 1;
                }
            }

            if errors > 0 {
                eprintln!("Found {} error(s)", errors);
                std::process::exit(1);
            }
            println!("OK: {} constraints", count);
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn or_exit<T>(result: Result<T, String>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn read(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("reading {}: {}", path.display(), e))
}

/// Columns are the sorted union of keys; a key missing from a sample is `Null`.
fn load_dataset(path: &Path) -> Result<Dataset, String> {
    let records: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(&read(path)?).map_err(|e| format!("parsing {}: {}", path.display(), e))?;

    let columns: BTreeSet<&str> = records.iter().flat_map(|r| r.keys().map(String::as_str)).collect();
    let mut dataset = Dataset::new(columns.iter().copied()).map_err(|e| e.to_string())?;

    for (i, record) in records.iter().enumerate() {
        let row = columns
            .iter()
            .map(|&col| match record.get(col) {
                None | Some(serde_json::Value::Null) => Ok(Value::Null),
                Some(serde_json::Value::Bool(b)) => Ok(Value::Bool(*b)),
                Some(serde_json::Value::Number(n)) => n
                    .as_f64()
                    .map(Value::Number)
                    .ok_or_else(|| format!("sample {} field '{}': number out of range", i, col)),
                Some(serde_json::Value::String(s)) => Ok(Value::Str(s.clone())),
                Some(_) => Err(format!("sample {} field '{}': nested values are not supported", i, col)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        dataset.push_row(row).map_err(|e| e.to_string())?;
    }

    tracing::debug!(samples = dataset.len(), columns = columns.len(), "loaded dataset");
    Ok(dataset)
}

fn load_constraints(path: &Path) -> Result<Vec<Constraint>, String> {
    let rows: Vec<ConstraintRow> =
        serde_json::from_str(&read(path)?).map_err(|e| format!("parsing {}: {}", path.display(), e))?;
    Ok(rows.into_iter().map(Constraint::from).collect())
}

fn print_json(curation: &Curation) {
    let report = Report {
        selected: curation.selected_indices(),
        summary: &curation.summary,
        theoretical_violation: curation.theoretical_violation,
        solver_message: &curation.solver_message,
        iterations: curation.iterations,
    };
    println!("{}", or_exit(serde_json::to_string_pretty(&report).map_err(|e| e.to_string())));
}

fn print_pretty(curation: &Curation, options: CuratorOptions) {
    println!("Formulation: {}", options.formulation);
    println!("Method: {}", options.algorithm);
    println!("Solver: {} ({} iterations)", curation.solver_message, curation.iterations);
    println!("Theoretical violation: {:.4}", curation.theoretical_violation);
    println!();
    println!("{}", curation.summary);
}
