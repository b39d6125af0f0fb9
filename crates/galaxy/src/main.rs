use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use galaxy::{config::DEFAULT_SERVER, RunnerConfig};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "galaxy")]
#[command(about = "Evaluate galaxy scripts and drive the interaction protocol")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    runner: RunnerArgs,

    /// Pretty-print the JSON report
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Args)]
struct RunnerArgs {
    /// Alien server base URL
    #[arg(long, global = true, default_value = DEFAULT_SERVER)]
    server: String,

    /// Player API key appended to each request
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    timeout_secs: u64,

    /// Abort after this many rewrites
    #[arg(long, global = true)]
    step_limit: Option<u64>,

    /// Force every pair component of reported results instead of stopping at WHNF
    #[arg(long, global = true)]
    normalize: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script and report the value of every bare expression
    Eval {
        /// Script file
        file: PathBuf,
    },

    /// Run one interaction per event, threading the state
    Interact {
        /// Script file defining the protocol
        file: PathBuf,

        /// Protocol expression
        #[arg(long, default_value = "galaxy")]
        protocol: String,

        /// Initial state expression
        #[arg(long, default_value = "nil")]
        state: String,

        /// Event expression, e.g. "ap ap vec 0 0"; repeat for several rounds
        #[arg(long = "event", required = true)]
        events: Vec<String>,
    },
}

impl RunnerArgs {
    fn config(&self) -> RunnerConfig {
        RunnerConfig {
            server: self.server.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            step_limit: self.step_limit,
            normalize_results: self.normalize,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_module("ureq", log::LevelFilter::Warn)
        .init();

    let cli = Cli::parse();
    let config = cli.runner.config();
    let mut session = galaxy::session(&config);

    match &cli.command {
        Commands::Eval { file } => {
            let (source, name) = read_script(file)?;
            let report = galaxy::run(&source, &name, &mut session)
                .with_context(|| format!("evaluating {name}"))?;
            print_json(&report, cli.pretty)?;
        }

        Commands::Interact {
            file,
            protocol,
            state,
            events,
        } => {
            let (source, name) = read_script(file)?;
            let report = galaxy::interact(&source, &name, &mut session, protocol, state, events)
                .with_context(|| format!("interacting with {name}"))?;
            print_json(&report, cli.pretty)?;
        }
    }

    Ok(())
}

fn read_script(path: &Path) -> Result<(String, String)> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok((source, path.display().to_string()))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}
