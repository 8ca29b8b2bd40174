//! # SiMAL Command Line Interface
//!
//! A thin CLI wrapper around [`simal::pipeline`]: parses a `.simal`/`.siml`
//! file and writes its JSON lowering(s) next to the input. All actual
//! parsing and lowering logic lives in the library crate — this binary only
//! handles argument parsing, file I/O, and exit codes.

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a .simal or .siml file to process
    path: PathBuf,

    /// Emit full (tagged, round-trippable) JSON only
    #[arg(long)]
    json: bool,

    /// Emit simple (flattened) JSON only
    #[arg(long)]
    simple: bool,

    /// Emit max-simple JSON only (methods/endpoints compressed to `def` strings)
    #[arg(long = "max-simple")]
    max_simple: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let selected = [args.json, args.simple, args.max_simple]
        .iter()
        .filter(|b| **b)
        .count();
    if selected > 1 {
        eprintln!("error: at most one of --json, --simple, --max-simple may be given");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(&args.path)?;
    let system = simal::run_all(&source)?;
    let stem = stem_of(&args.path);

    if args.json {
        write_json(&stem.with_extension("json"), &simal::pipeline::full_json(&system))?;
    } else if args.simple {
        write_json(
            &with_suffix(&stem, "_simple"),
            &simal::pipeline::simple_json(&system),
        )?;
    } else if args.max_simple {
        write_json(
            &with_suffix(&stem, "_simple"),
            &simal::pipeline::max_simple_json(&system),
        )?;
    } else {
        write_json(&stem.with_extension("json"), &simal::pipeline::full_json(&system))?;
        write_json(
            &with_suffix(&stem, "_simple"),
            &simal::pipeline::simple_json(&system),
        )?;
    }

    Ok(())
}

fn stem_of(path: &Path) -> PathBuf {
    path.with_extension("")
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name).with_extension("json")
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
    let rendered = serde_json::to_string_pretty(value)?;
    fs::write(path, rendered)?;
    Ok(())
}
