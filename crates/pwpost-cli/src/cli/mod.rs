mod commands;
mod helpers;

use clap::Parser;
use pwpost_core::domain::PostError;
use tracing_subscriber::EnvFilter;

const PROGRAM_NAME: &str = "pwpost";

pub fn run_from_env() -> i32 {
    init_logging();
    let remaining: Vec<String> = std::env::args().skip(1).collect();

    match run(remaining) {
        Ok(code) => code,
        Err(error) => {
            let post_error = error.as_post_error();
            eprintln!("{}", post_error.diagnostic_line());
            eprintln!("{}", post_error.fatal_exit_line());
            post_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once(PROGRAM_NAME.to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

/// Events go to stderr so that summaries on stdout stay machine-readable.
/// Verbosity comes from `RUST_LOG`, defaulting to warnings only.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "pwpost",
    version,
    about = "Post-processing for plane-wave electronic-structure output"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Rebuild a real-space charge density and write it as a field dump
    Charge(commands::ChargeArgs),
    /// Parse a pseudopotential file and summarise its sections
    Pseudo(commands::PseudoArgs),
    /// Read a field dump and summarise its header and values
    Dump(commands::DumpArgs),
    /// Read a two-column series and report its minimum
    Series(commands::SeriesArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Charge(args) => commands::run_charge_command(args),
        CliCommand::Pseudo(args) => commands::run_pseudo_command(args),
        CliCommand::Dump(args) => commands::run_dump_command(args),
        CliCommand::Series(args) => commands::run_series_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(#[from] PostError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    pub fn as_post_error(&self) -> PostError {
        match self {
            Self::Usage(message) => PostError::format("USAGE.CLI", message.trim_end().to_string()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => PostError::internal("INTERNAL.CLI", format!("{error:#}")),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.as_post_error().exit_code()
    }
}
