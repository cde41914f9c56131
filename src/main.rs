//! hotconf: live configuration watcher.
//!
//! ```text
//! HOTCONF_DIR / --dir
//!     → ConfigManager::load (initial config)
//!     → logging::init (from the config's `logging` section)
//!     → register handlers (log level, reload reporter)
//!     → ConfigManager::start (poll loop)
//!     → wait for SIGINT/SIGTERM → ConfigManager::stop
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use hotconf::config::document::{AI_MODELS_SECTION, PIPELINES_SECTION, SOURCES_SECTION};
use hotconf::config::{FingerprintKind, LoaderSettings, WatchSettings};
use hotconf::lifecycle::signals;
use hotconf::observability::logging::{self, LoggingSettings};
use hotconf::{ConfigDocument, ConfigHandler, ConfigLoader, ConfigManager, HandlerError, ManagerSettings};

/// Working directory used when neither `--dir` nor `HOTCONF_DIR` is set.
const DEFAULT_WORK_DIR: &str = "/workspace";

#[derive(Parser)]
#[command(name = "hotconf")]
#[command(about = "Load, resolve and watch a live configuration directory", long_about = None)]
struct Cli {
    /// Working directory holding the configuration files
    #[arg(short, long, env = "HOTCONF_DIR")]
    dir: Option<PathBuf>,

    /// Primary configuration file name
    #[arg(long, default_value = "config.yaml")]
    config_file: String,

    /// Secrets file name
    #[arg(long, default_value = "secrets.yaml")]
    secrets_file: String,

    /// Section that must define at least one entry (empty to disable)
    #[arg(long, default_value = "pipelines")]
    required_section: String,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 500)]
    poll_interval_ms: u64,

    /// Change detection strategy
    #[arg(long, value_enum, default_value_t = FingerprintKind::Metadata)]
    fingerprint: FingerprintKind,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the configuration once and print a summary
    Check {
        /// Print the fully resolved document (includes secret values)
        #[arg(long)]
        show: bool,
    },
    /// Load the configuration and reload it whenever it changes (default)
    Watch,
}

impl Cli {
    fn settings(&self) -> ManagerSettings {
        ManagerSettings {
            loader: LoaderSettings {
                config_file: self.config_file.clone(),
                secrets_file: self.secrets_file.clone(),
                required_section: self.required_section.clone(),
            },
            watch: WatchSettings {
                poll_interval_ms: self.poll_interval_ms,
                fingerprint: self.fingerprint,
            },
        }
    }
}

/// An empty directory argument counts as unset.
fn work_dir(dir: Option<PathBuf>) -> PathBuf {
    dir.filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR))
}

fn summary(directory: &std::path::Path, config: &ConfigDocument) -> serde_json::Value {
    let sections: Vec<String> = config
        .root()
        .keys()
        .filter_map(|k| k.as_str().map(str::to_string))
        .collect();

    json!({
        "directory": directory.display().to_string(),
        "sections": sections,
        "sources": config.section_len(SOURCES_SECTION),
        "ai_models": config.section_len(AI_MODELS_SECTION),
        "pipelines": config.section_len(PIPELINES_SECTION),
        "data_dir": config.data_dir().map(|d| d.display().to_string()),
    })
}

fn check(directory: PathBuf, settings: ManagerSettings, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    let loader = ConfigLoader::new(settings.loader);
    match loader.try_load(&directory) {
        Ok(config) => {
            if show {
                print!("{}", config.to_yaml_string()?);
            } else {
                println!("{}", serde_json::to_string_pretty(&summary(&directory, &config))?);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("No usable configuration in {}: {}", directory.display(), e);
            std::process::exit(1);
        }
    }
}

async fn watch(directory: PathBuf, settings: ManagerSettings) -> Result<(), Box<dyn std::error::Error>> {
    let manager = ConfigManager::new(settings);
    let initial = manager.load(&directory);

    let logging_settings = initial
        .as_deref()
        .map(LoggingSettings::from_document)
        .unwrap_or_default();
    let logging = logging::init(&logging_settings)?;

    tracing::info!("hotconf v{} starting", env!("CARGO_PKG_VERSION"));
    match &initial {
        Some(config) => tracing::info!(
            directory = %directory.display(),
            sources = config.section_len(SOURCES_SECTION),
            pipelines = config.section_len(PIPELINES_SECTION),
            "Configuration loaded"
        ),
        None => tracing::warn!(
            directory = %directory.display(),
            "No valid configuration yet. Waiting for one to appear."
        ),
    }

    if let Some(handler) = logging.level_handler() {
        manager.register_handler(handler);
    }
    let reporter: Arc<dyn ConfigHandler> = Arc::new(
        |config: &Arc<ConfigDocument>| -> Result<(), HandlerError> {
            tracing::info!(
                sources = config.section_len(SOURCES_SECTION),
                ai_models = config.section_len(AI_MODELS_SECTION),
                pipelines = config.section_len(PIPELINES_SECTION),
                "Active configuration replaced"
            );
            Ok(())
        },
    );
    manager.register_handler(reporter);

    manager.start(&directory);
    signals::wait_for_termination().await;
    manager.stop().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = cli.settings();
    let directory = work_dir(cli.dir);

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Check { show } => check(directory, settings, show),
        Commands::Watch => watch(directory, settings).await,
    }
}
