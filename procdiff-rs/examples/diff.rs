//! Example: Diff two process models and replay the result
//!
//! Prints the delta document on stdout and a summary of the edit script on
//! stderr. The script is then replayed on the old model as a check.
//!
//! Usage: cargo run --example diff <old.xml> <new.xml> [fast|balanced|quality]

use std::env;
use std::io;

use procdiff::{diff, parse_file, DiffConfig, MatchMode, Patcher};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 || args.len() > 4 {
        eprintln!("Usage: {} <old.xml> <new.xml> [mode]", args[0]);
        std::process::exit(1);
    }

    let mode: MatchMode = match args.get(3) {
        Some(name) => name.parse()?,
        None => MatchMode::default(),
    };

    eprintln!("Parsing old: {}", args[1]);
    let old = parse_file(&args[1])?;

    eprintln!("Parsing new: {}", args[2]);
    let new = parse_file(&args[2])?;

    eprintln!("Computing diff ({} mode)...", mode);
    let script = diff(&old, &new, &DiffConfig::for_mode(mode))?;
    script.write_xml(io::stdout())?;

    for operation in &script {
        eprintln!("  {}", operation);
    }
    eprintln!(
        "{} operations, cost {} ({} inserts, {} deletes, {} moves, {} updates)",
        script.len(),
        script.cost(),
        script.insertions(),
        script.deletions(),
        script.moves(),
        script.updates()
    );

    let patched = Patcher::new(&old).apply(&script)?;
    eprintln!("Replayed script: {} top-level nodes", patched.borrow().child_count());

    Ok(())
}
