//! pollsafe operator CLI
//!
//! Maintenance commands against a configured data safe.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pollsafe::{DataSafe, Registry, SafeConfig, ServiceConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// pollsafe CLI
#[derive(Parser, Debug)]
#[command(name = "pollsafe")]
#[command(about = "Maintenance tool for the poll data safe")]
#[command(version)]
struct Args {
    /// Service configuration (JSON)
    #[arg(short, long, default_value = "./config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the service and backend configuration
    Check,

    /// Remove deleted and never-created polls from disk
    Gc,

    /// Print everything stored for one poll
    Show {
        /// The poll identifier
        poll: String,
    },
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pollsafe=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> pollsafe::Result<()> {
    let service = ServiceConfig::load(&args.config)?;
    let base = args.config.parent().unwrap_or(Path::new("."));
    let settings = service.read_backend_settings(base)?;

    tracing::info!("pollsafe v{}", pollsafe::VERSION);
    tracing::info!("Data safe: {}", service.data_safe);

    let registry = Registry::with_defaults();

    if let Commands::Check = args.command {
        if !registry.contains(&service.data_safe) {
            return Err(pollsafe::SafeError::UnknownBackend(service.data_safe));
        }
        // Only the built-in backend's settings schema is known here
        if service.data_safe == pollsafe::FileSafe::NAME {
            let config = SafeConfig::from_json(&settings)?;
            println!("{}", String::from_utf8_lossy(&config.to_json()?));
        }
        println!("configuration ok");
        return Ok(());
    }

    let safe = registry.create(&service.data_safe)?;
    safe.load_config(&settings)?;

    let result = execute(&args.command, &service, safe.as_ref());
    safe.flush_and_close();
    result
}

fn execute(command: &Commands, service: &ServiceConfig, safe: &dyn DataSafe) -> pollsafe::Result<()> {
    match command {
        Commands::Check => Ok(()),
        Commands::Gc => {
            let report = safe.run_gc()?;
            println!(
                "removed {} files, skipped {} unreadable files",
                report.removed, report.skipped
            );
            Ok(())
        }
        Commands::Show { poll } => {
            if service.run_gc_on_start {
                safe.run_gc()?;
            }

            let config = safe.get_config(poll)?;
            let creator = safe.get_creator(poll)?;
            let results = safe.get_results(poll)?;

            if config.is_empty() {
                println!("poll {:?} does not exist", poll);
                return Ok(());
            }

            println!("poll:    {}", poll);
            println!("creator: {}", if creator.is_empty() { "-" } else { creator.as_str() });
            println!("config:  {} bytes", config.len());
            println!("answers: {}", results.len());
            let rows = results
                .answer_ids
                .iter()
                .zip(&results.names)
                .zip(&results.comments)
                .zip(&results.results);
            for (i, (((id, name), comment), values)) in rows.enumerate() {
                println!(
                    "  [{}] {:?} name={:?} comment={:?} results={:?}",
                    i, id, name, comment, values
                );
            }
            Ok(())
        }
    }
}
