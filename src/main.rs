use anyhow::{Context, Result};
use clap::Parser;
use reg_convert::convert::{convert, Format, DEFAULT_ROOT_NAME};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "reg-convert",
    version,
    about = "Convert between registry hives, .reg files and .pol files"
)]
struct Cli {
    /// Input format: hive, reg, reg+ or pol
    #[arg(long, value_parser = parse_format)]
    from: Format,

    /// Output format: reg, reg+ or pol
    #[arg(long, value_parser = parse_format)]
    to: Format,

    /// Name of the root key for hive and .pol input
    #[arg(long, default_value = DEFAULT_ROOT_NAME)]
    root: String,

    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,

    input: PathBuf,

    output: PathBuf,
}

fn parse_format(s: &str) -> std::result::Result<Format, String> {
    s.parse::<Format>().map_err(|e| e.to_string())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    convert(cli.from, &cli.input, cli.to, &cli.output, &cli.root).with_context(|| {
        format!(
            "converting {} ({}) to {} ({})",
            cli.input.display(),
            cli.from,
            cli.output.display(),
            cli.to
        )
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
