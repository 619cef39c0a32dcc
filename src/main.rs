use anyhow::Result;
use clap::{Parser, Subcommand};
use modlog_core::config::AppConfig;
use modlog_core::store::ActionStore;
use modlog_report::ReportService;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "modlog",
    about = "Moderation action log with monthly per-messenger reports",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/modlog/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the action log file
    #[arg(long, global = true)]
    action_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and the monthly report schedule (default)
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,
        /// Bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the current report once
    Report {
        /// Print the structured report as JSON instead of markup
        #[arg(long)]
        json: bool,
    },

    /// Print an Argon2 hash for use in the user file
    HashPassword {
        password: String,
    },

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "modlog=info,warn".into()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path)?;
    config.apply_env();
    if let Some(action_file) = &cli.action_file {
        config.storage.action_file = action_file.clone();
    }
    tracing::debug!("Action log: {}", config.storage.action_file.display());

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(h) = host {
                config.server.host = h;
            }
            if let Some(p) = port {
                config.server.port = p;
            }
            modlog_server::serve(config).await?;
        }
        None => modlog_server::serve(config).await?,
        Some(Commands::Report { json }) => {
            let store = Arc::new(ActionStore::new(config.storage.action_file.clone()));
            let reports = ReportService::new(store);
            if json {
                println!("{}", serde_json::to_string_pretty(&reports.summary().await)?);
            } else {
                println!("{}", reports.render().await);
            }
        }
        Some(Commands::HashPassword { password }) => {
            println!("{}", modlog_server::auth::hash_password(&password)?);
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, &config, &config_path)?;
        }
    }

    Ok(())
}

/// `show` prints the effective configuration (file, environment and flags
/// merged); `init` writes the built-in defaults to the selected config path.
fn handle_config_command(
    action: Option<ConfigAction>,
    config: &AppConfig,
    path: &Path,
) -> Result<()> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => print!("{}", toml::to_string_pretty(config)?),
        ConfigAction::Init => {
            if AppConfig::init_file(path)? {
                println!("Wrote default config to {}", path.display());
            } else {
                println!("Config already exists at {}", path.display());
            }
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}
