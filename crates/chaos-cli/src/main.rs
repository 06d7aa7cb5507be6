use std::path::{Path, PathBuf};

use chaos_config::ChaosConfig;
use clap::{Parser, Subcommand};

mod commands;
mod telemetry;

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "CHAOSLAB_CONFIG";

#[derive(Parser)]
#[command(name = "chaoslab", version, about = "ChaosLab - distributed fault injection")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as newline-delimited JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller API server
    Controller {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run an agent on this host
    Agent {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
        /// Network interface for network faults
        #[arg(short, long)]
        interface: Option<String>,
    },
    /// Submit an experiment definition (JSON file) to the controller
    Start {
        /// Path to the experiment JSON file
        file: PathBuf,
        /// Controller base URL (defaults to http://localhost:<controller.port>)
        #[arg(long)]
        controller: Option<String>,
    },
    /// List experiments the controller has accepted
    Experiments {
        /// Controller base URL
        #[arg(long)]
        controller: Option<String>,
        /// Print the raw JSON array
        #[arg(long)]
        json: bool,
    },
    /// Ask the controller to stop experiments (currently unsupported)
    Stop {
        /// Controller base URL
        #[arg(long)]
        controller: Option<String>,
    },
    /// Show effective configuration
    Config,
}

fn find_config() -> Option<PathBuf> {
    find_config_in(
        std::env::var(CONFIG_ENV).ok(),
        Path::new("."),
        dirs_next::home_dir(),
    )
}

/// Search order: `CHAOSLAB_CONFIG`, `./chaoslab.yaml`, `~/.config/chaoslab/config.yaml`.
fn find_config_in(env_path: Option<String>, cwd: &Path, home: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = env_path.map(PathBuf::from) {
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = cwd.join("chaoslab.yaml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    if let Some(home) = home {
        let home_config = home.join(".config/chaoslab/config.yaml");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

/// Load the config file (or built-in defaults), apply defaults and validate.
fn load_config(path: Option<PathBuf>) -> Result<ChaosConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => ChaosConfig::from_file(&path)?,
        None => ChaosConfig::default(),
    };
    let config = config.effective();

    let errors = config.validate();
    if let Some(first) = errors.first() {
        for err in &errors {
            eprintln!("config error: {}", err);
        }
        return Err(first.to_string().into());
    }
    Ok(config)
}

/// Base URL of the controller for client subcommands.
fn controller_url(flag: Option<String>, config: &ChaosConfig) -> String {
    flag.unwrap_or_else(|| format!("http://localhost:{}", config.controller.port))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.or_else(find_config);
    let mut config = load_config(config_path.clone())?;
    telemetry::init_tracing(cli.log_json || config.log.json, &config.log.level);
    match &config_path {
        Some(path) => tracing::debug!(path = %path.display(), "Loaded configuration"),
        None => tracing::debug!("No configuration file found, using defaults"),
    }

    match cli.command {
        Commands::Controller { host, port } => {
            if let Some(host) = host {
                config.controller.host = host;
            }
            if let Some(port) = port {
                config.controller.port = port;
            }
            commands::controller::run(config.controller).await?;
        }
        Commands::Agent {
            host,
            port,
            interface,
        } => {
            if let Some(host) = host {
                config.agent.host = host;
            }
            if let Some(port) = port {
                config.agent.port = port;
            }
            if let Some(interface) = interface {
                config.agent.interface = interface;
                config.validate_or_err()?;
            }
            commands::agent::run(config.agent).await?;
        }
        Commands::Start { file, controller } => {
            let base = controller_url(controller, &config);
            commands::start::run(&base, &file).await?;
        }
        Commands::Experiments { controller, json } => {
            let base = controller_url(controller, &config);
            commands::experiments::run(&base, json).await?;
        }
        Commands::Stop { controller } => {
            let base = controller_url(controller, &config);
            commands::stop::run(&base).await?;
        }
        Commands::Config => {
            commands::config::run(&config)?;
        }
    }

    Ok(())
}
