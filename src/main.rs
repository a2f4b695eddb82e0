//! Command line interface for the `sold` linker

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use sold::Config;

#[derive(Debug, Parser)]
#[command(name = "sold", about = "An ELF linker for x86-64", version)]
struct Cli {
    /// Enable verbose diagnostics
    #[arg(short, long, global = true)]
    debug: bool,
    /// Report per-phase timings
    #[arg(short, long, global = true)]
    profile: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Link input files
    Link {
        /// The relocatable object files to link, in link order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// The path the executable is written to
        #[arg(short, long, default_value = "a.out")]
        output: PathBuf,
        /// Treat unsupported and overflowing relocations as errors
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::default().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::WARN.into()))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Link {
            inputs,
            output,
            strict,
        } => {
            let config = Config::builder()
                .output(output)
                .strict(strict)
                .profile(cli.profile)
                .build();
            match sold::link(&inputs, &config) {
                Ok(()) => ExitCode::SUCCESS,
                Err(error) => {
                    eprintln!("sold: {error}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}
