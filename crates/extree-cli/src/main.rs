//! extree CLI: inspect execution-tree logs and snapshots offline.

use clap::{Parser, Subcommand, ValueEnum};
use extree_core::TreeConfig;
use extree_export::{normalize_whitespace, to_infix, Snapshot};
use extree_log::{read_log, FsStorage, ReplayedTree};
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "extree")]
#[command(about = "Inspect symbolic-execution tree logs and snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReplayFormat {
    Dot,
    Json,
    Summary,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the tree from its log and print it
    Replay {
        /// Path to the tree log (defaults to the configured output directory)
        #[arg(short, long)]
        log: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "summary")]
        format: ReplayFormat,
    },

    /// Check a tree log's checksums and batch sequence
    Verify {
        /// Path to the tree log (defaults to the configured output directory)
        #[arg(short, long)]
        log: Option<PathBuf>,
    },

    /// Print constraints in infix form (reads stdin lines when none given)
    Infix { exprs: Vec<String> },

    /// Merge two snapshot files by node identity
    Merge {
        #[arg(long)]
        base: PathBuf,

        #[arg(long)]
        incoming: PathBuf,

        #[arg(long)]
        out: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay { log, format } => log_path(log, &TreeConfig::from_env())
            .and_then(|path| replay(&path, format))
            .map(|out| print!("{out}")),
        Commands::Verify { log } => log_path(log, &TreeConfig::from_env())
            .and_then(|path| verify(&path))
            .map(|out| println!("{out}")),
        Commands::Infix { exprs } => infix(exprs).map(|lines| {
            for line in lines {
                println!("{line}");
            }
        }),
        Commands::Merge {
            base,
            incoming,
            out,
        } => merge(&base, &incoming, &out).map(|n| println!("✓ {n} records written to {}", out.display())),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// An explicit path wins; the configured one is used only after the
/// configuration validates.
fn log_path(
    explicit: Option<PathBuf>,
    config: &TreeConfig,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) => Ok(path),
        None => {
            config.validate()?;
            Ok(config.log_path())
        }
    }
}

fn load_tree(path: &Path) -> Result<ReplayedTree, Box<dyn std::error::Error>> {
    let contents = read_log(&FsStorage::new(), &path.to_string_lossy())?;
    tracing::debug!(
        path = %path.display(),
        batches = contents.batches,
        records = contents.records.len(),
        "read tree log"
    );
    Ok(ReplayedTree::from_records(&contents.records)?)
}

fn replay(path: &Path, format: ReplayFormat) -> Result<String, Box<dyn std::error::Error>> {
    let tree = load_tree(path)?;
    Ok(match format {
        ReplayFormat::Dot => tree.to_dot(),
        ReplayFormat::Json => format!("{}\n", serde_json::to_string_pretty(&tree.to_nested_json())?),
        ReplayFormat::Summary => {
            let stats = tree.stats();
            let mut out = format!(
                "nodes: {}\nbranches: {}\nterminated: {}\nopen leaves: {}\nmax depth: {}\n",
                stats.nodes, stats.branches, stats.terminated, stats.open_leaves, stats.max_depth
            );
            for (kind, n) in &stats.terminations_by_kind {
                out.push_str(&format!("  {kind}: {n}\n"));
            }
            out
        }
    })
}

fn verify(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let contents = read_log(&FsStorage::new(), &path.to_string_lossy())?;
    let tree = ReplayedTree::from_records(&contents.records)?;
    tracing::debug!(path = %path.display(), nodes = tree.len(), "log verified");
    let run = contents
        .run
        .map_or_else(|| "-".to_string(), |r| r.to_string());
    Ok(format!(
        "✓ {} batches, {} records (run {})",
        contents.batches,
        contents.records.len(),
        run
    ))
}

fn infix(exprs: Vec<String>) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let exprs = if exprs.is_empty() {
        io::stdin().lock().lines().collect::<Result<Vec<_>, _>>()?
    } else {
        exprs
    };
    Ok(exprs
        .iter()
        .map(|e| to_infix(&normalize_whitespace(e)))
        .collect())
}

fn merge(base: &Path, incoming: &Path, out: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    let mut snapshot = Snapshot::from_json(&fs::read_to_string(base)?)?;
    snapshot.merge(Snapshot::from_json(&fs::read_to_string(incoming)?)?);
    fs::write(out, snapshot.to_json_pretty()?)?;
    Ok(snapshot.len())
}
