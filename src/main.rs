//! Sprout CLI
//!
//! Usage:
//!   sprout --source-config <FILE> --output <DIR> [OPTIONS]
//!
//! Options:
//!   --params <FILE>            Parameter document (default: params.yaml)
//!   --digest <FILE>            Digest path relative to the output root
//!   --delete-existing-output   Remove existing output before writing
//!   -v, --verbose              Debug logging

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sprout::{
    format_errors, prepare_params, run_with_params, EngineRegistry, ParamsStatus, SproutOptions,
    DEFAULT_DIGEST_FILE, DEFAULT_PARAMS_FILE,
};

#[derive(Parser)]
#[command(name = "sprout")]
#[command(about = "Generate a project tree from a template directory and a params file")]
struct Cli {
    /// The plan file of the template to sprout (.yaml, .yml, .toml or .json)
    #[arg(long)]
    source_config: PathBuf,

    /// Root directory for the generated output; created if missing
    #[arg(long)]
    output: PathBuf,

    /// Parameter document; seeded from the template's example if missing
    #[arg(long, default_value = DEFAULT_PARAMS_FILE)]
    params: PathBuf,

    /// Record of generated files, relative to the output root
    #[arg(long, default_value = DEFAULT_DIGEST_FILE)]
    digest: PathBuf,

    /// Remove every existing non-hidden file under the output root first
    #[arg(long)]
    delete_existing_output: bool,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = SproutOptions::new(cli.source_config, cli.output)
        .with_params_path(cli.params)
        .with_digest_path(cli.digest)
        .with_purge_existing(cli.delete_existing_output);

    let params = match prepare_params(&options) {
        Ok(ParamsStatus::Loaded(params)) => params,
        Ok(ParamsStatus::Created { to, .. }) => {
            println!(
                "created placeholder params at {}. customize the file, then rerun your previous command.",
                to.display()
            );
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}", format_errors(&[e]));
            return ExitCode::FAILURE;
        }
    };

    match run_with_params(&options, &EngineRegistry::builtin(), &params) {
        Ok(summary) => {
            if !summary.suppressed.is_empty() {
                println!("{} template(s) rendered empty and were skipped", summary.suppressed.len());
            }
            ExitCode::SUCCESS
        }
        Err(errors) => {
            eprintln!("{}", format_errors(&errors));
            ExitCode::FAILURE
        }
    }
}
