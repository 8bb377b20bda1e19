//! pdiff - structural diff for CPEE process models

use std::fs::File;
use std::io::{self, BufWriter, Write};

use clap::{Parser, Subcommand};
use procdiff::{
    diff, match_trees, node, parse_file, DiffConfig, EditScript, MatchMode, Patcher, XmlPrinter,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Structural diff for process trees
#[derive(Parser)]
#[command(name = "pdiff")]
#[command(version)]
#[command(about = "Structural diff for CPEE process models", long_about = None)]
struct Cli {
    /// Log progress and matcher statistics
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the edit script that turns the old model into the new one
    #[command(visible_alias = "d")]
    Diff {
        /// Old process model
        old: String,
        /// New process model
        new: String,
        /// Output file (default: stdout)
        output: Option<String>,

        #[command(flatten)]
        options: MatchOptions,

        /// Align the children of unordered nodes as well
        #[arg(long)]
        exact: bool,
    },

    /// Apply a delta to a process model
    #[command(visible_alias = "p")]
    Patch {
        /// Old process model
        old: String,
        /// Delta file
        delta: String,
        /// Output file (default: stdout)
        output: Option<String>,
    },

    /// Print the matched node pairs as paths
    #[command(visible_alias = "m")]
    Match {
        /// Old process model
        old: String,
        /// New process model
        new: String,

        #[command(flatten)]
        options: MatchOptions,
    },
}

#[derive(clap::Args)]
struct MatchOptions {
    /// Matcher preset: fast, balanced or quality. Also picks the comparison
    /// threshold unless the configuration file sets one
    #[arg(short, long)]
    mode: Option<MatchMode>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
}

impl MatchOptions {
    fn load(&self) -> procdiff::Result<DiffConfig> {
        match &self.config {
            Some(path) => DiffConfig::from_file_with_mode(path, self.mode),
            None => Ok(DiffConfig::for_mode(self.mode.unwrap_or_default())),
        }
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Diff {
            old,
            new,
            output,
            options,
            exact,
        } => run_diff(&old, &new, output.as_deref(), &options, exact),
        Commands::Patch { old, delta, output } => run_patch(&old, &delta, output.as_deref()),
        Commands::Match { old, new, options } => run_match(&old, &new, &options),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

/// Installs the fmt subscriber. `RUST_LOG` wins over the verbosity flag.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_output(path: Option<&str>) -> io::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    })
}

fn run_diff(
    old_path: &str,
    new_path: &str,
    output_path: Option<&str>,
    options: &MatchOptions,
    exact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = options.load()?;
    config.exact_edit_script |= exact;

    info!(path = old_path, "parsing old model");
    let old = parse_file(old_path)?;
    info!(path = new_path, "parsing new model");
    let new = parse_file(new_path)?;

    info!(mode = %config.match_mode, "computing diff");
    let script = diff(&old, &new, &config)?;
    info!(
        operations = script.len(),
        cost = script.cost(),
        insertions = script.insertions(),
        deletions = script.deletions(),
        moves = script.moves(),
        updates = script.updates(),
        "diff complete"
    );

    script.write_xml(open_output(output_path)?)?;
    Ok(())
}

fn run_patch(
    old_path: &str,
    delta_path: &str,
    output_path: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(path = old_path, "parsing old model");
    let old = parse_file(old_path)?;
    info!(path = delta_path, "parsing delta");
    let script = EditScript::from_xml_str(&std::fs::read_to_string(delta_path)?)?;

    let patched = Patcher::new(&old).apply(&script)?;
    XmlPrinter::new(open_output(output_path)?).print(&patched)?;
    info!(operations = script.len(), "patch applied");
    Ok(())
}

fn run_match(
    old_path: &str,
    new_path: &str,
    options: &MatchOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = options.load()?;
    let old = parse_file(old_path)?;
    let new = parse_file(new_path)?;
    let matching = match_trees(&old, &new, &config)?;

    let mut pairs: Vec<(String, String, String)> = matching
        .pairs()
        .map(|(o, n)| (node::path(n), node::path(o), n.borrow().label().to_string()))
        .collect();
    pairs.sort();

    let mut output = io::stdout().lock();
    for (new_node_path, old_node_path, label) in &pairs {
        writeln!(
            output,
            "{:<12} {:>16} <-> {}",
            label,
            display_path(old_node_path),
            display_path(new_node_path)
        )?;
    }
    info!(pairs = pairs.len(), "matching complete");
    Ok(())
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
