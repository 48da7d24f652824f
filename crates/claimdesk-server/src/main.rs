#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use claimdesk_core::config::{DeskConfig, load_config};
use claimdesk_core::db;
use claimdesk_server::{AppState, serve};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(
    name = "claimdesk",
    author,
    version,
    about = "claimdesk: home-warranty claims and work orders",
    long_about = None
)]
struct Cli {
    /// Config file to load instead of the default lookup.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve {
        /// Address to bind, overriding `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Create or upgrade the database, then print its schema version.
    Migrate,
    /// Print the effective configuration as TOML.
    Config,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CLAIMDESK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "claimdesk=debug,claimdesk_core=debug,claimdesk_server=debug,info"
        } else {
            "claimdesk=info,claimdesk_core=info,claimdesk_server=info,warn"
        })
    });

    let format = env::var("CLAIMDESK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn run_serve(config: DeskConfig, bind: Option<String>) -> anyhow::Result<()> {
    let conn = db::open_database(&config.storage.database)?;
    std::fs::create_dir_all(&config.storage.upload_dir).with_context(|| {
        format!("create upload directory {}", config.storage.upload_dir.display())
    })?;
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let state = Arc::new(AppState::new(conn, config));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    runtime.block_on(serve(state, &bind))
}

fn run_migrate(config: &DeskConfig) -> anyhow::Result<()> {
    let conn = db::open_database(&config.storage.database)?;
    let version = db::migrations::current_schema_version(&conn)?;
    info!(path = %config.storage.database.display(), version, "database migrated");
    println!(
        "{}: schema version {version}",
        config.storage.database.display()
    );
    Ok(())
}

fn run_config(config: &DeskConfig) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(config).context("render config")?;
    print!("{rendered}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let working_dir = env::current_dir()?;
    let config = load_config(cli.config.as_deref(), &working_dir)?;

    match cli.command {
        Commands::Serve { bind } => run_serve(config, bind),
        Commands::Migrate => run_migrate(&config),
        Commands::Config => run_config(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommands_parse() {
        let cases = [
            vec!["claimdesk", "serve"],
            vec!["claimdesk", "serve", "--bind", "0.0.0.0:8080"],
            vec!["claimdesk", "migrate"],
            vec!["claimdesk", "--config", "desk.toml", "config"],
            vec!["claimdesk", "config", "-c", "desk.toml"],
        ];
        for args in &cases {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn serve_bind_is_optional() {
        let cli = Cli::try_parse_from(["claimdesk", "serve"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { bind: None }));
        assert!(cli.config.is_none());
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["claimdesk", "frobnicate"]).is_err());
    }
}
