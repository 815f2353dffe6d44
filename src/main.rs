use buildmeta::health::{periodic_threshold, MetaChecker};
use buildmeta::info::{self, debug_dump_and_exit, Info};
use buildmeta::server::run_meta_server;
use buildmeta::MetaHandler;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Default address for the metadata server
const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Parser)]
#[command(name = "buildmeta", version, about = "Build metadata and health endpoints")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Export the JSON representation of buildmeta for a checkout
    Json {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Print the value to pass as `-ldflags` for a checkout
    Ldflags {
        #[arg(default_value = ".")]
        repo_path: PathBuf,
    },
    /// Print `cargo:rustc-env` directives for use from a build script
    RustcEnv {
        #[arg(default_value = ".")]
        repo_path: PathBuf,
    },
    /// Serve this binary's own metadata and health endpoints
    Serve {
        #[arg(long, default_value = DEFAULT_ADDR)]
        addr: SocketAddr,
        /// Root URL of a downstream buildmeta service to require for readiness
        #[arg(long = "downstream")]
        downstream: Vec<String>,
        /// Seconds between downstream probes
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
        probe_interval: u64,
        /// Consecutive probe failures before a downstream counts as not ready
        #[arg(long, default_value_t = 3)]
        probe_threshold: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Json { path } => {
            let info = info::generate(&path)?;
            let bs = serde_json::to_vec_pretty(&info)?;
            std::io::stdout().write_all(&bs)?;
        }
        Command::Ldflags { repo_path } => {
            let info = info::generate(&repo_path)?;
            print!("{}", info.ldflags());
        }
        Command::RustcEnv { repo_path } => {
            let info = info::generate(&repo_path)?;
            print!("{}", info.rustc_env());
        }
        Command::Serve {
            addr,
            downstream,
            probe_interval,
            probe_threshold,
        } => {
            let current = Info::current_with(buildmeta::build_vars!());
            debug_dump_and_exit(&current);

            let handler = MetaHandler::with_info(current);
            for root in downstream {
                info!(root = %root, "Registering downstream readiness probe");
                handler.ready.register(
                    root.clone(),
                    periodic_threshold(
                        MetaChecker::new(root),
                        Duration::from_secs(probe_interval),
                        probe_threshold,
                    ),
                );
            }

            info!(
                commit = %handler.info.git_commit,
                version = %handler.info.tag_or_commit(),
                "Starting buildmeta server"
            );
            run_meta_server(addr, handler).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
