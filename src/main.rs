use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use hdrjson::{ConvertOptions, convert};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hdrjson")]
#[command(version, about = "Describe the declarations of a C/C++ header file as JSON", long_about = None)]
struct Cli {
    /// Header file to describe
    #[arg(value_name = "HEADER")]
    header: PathBuf,

    /// Output file [default: data.json next to the executable]
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Write the JSON on a single line
    #[arg(long)]
    compact: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    init_tracing(cli.verbose);

    let summary = ConvertOptions::new(cli.header.clone(), cli.output, !cli.compact)
        .and_then(|options| convert(&options))
        .with_context(|| format!("Failed to convert {}", cli.header.display()))?;

    println!(
        "{} {} -> {} ({})",
        "✓".green(),
        cli.header.display(),
        summary.output.display().to_string().bold(),
        summary.counts
    );

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
