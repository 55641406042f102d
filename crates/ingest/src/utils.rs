use clap::Parser;
use slog::{o, Drain, Level, Logger};
use std::env;
use std::path::PathBuf;
use wxshim_core::{find_config_file, load_config, ConfigSource, DEFAULT_DATA_DIR};

use crate::DEFAULT_CHUNK_SIZE;

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "wxshim ingest - Splits the raw gazetteer into first-letter shards"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $WXSHIM_INGEST_CONFIG, ./ingest.toml,
    /// $XDG_CONFIG_HOME/wxshim/ingest.toml, /etc/wxshim/ingest.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "WXSHIM_INGEST_LEVEL")]
    pub level: Option<String>,

    /// Raw gazetteer dump (tab separated, e.g. allCountries.txt)
    #[arg(short, long, env = "WXSHIM_INGEST_INPUT")]
    pub input: Option<String>,

    /// Directory the shard set is installed into
    #[arg(short, long, env = "WXSHIM_INGEST_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Rows buffered before each flush to the shard files
    #[arg(short = 's', long, env = "WXSHIM_INGEST_CHUNK_SIZE")]
    pub chunk_size: Option<usize>,

    /// Why the config file was ignored, reported once logging is up
    #[arg(skip)]
    #[serde(skip)]
    pub config_error: Option<String>,
}

impl Cli {
    pub fn input(&self) -> PathBuf {
        PathBuf::from(
            self.input
                .clone()
                .unwrap_or_else(|| "allCountries.txt".to_string()),
        )
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(
            self.data_dir
                .clone()
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        )
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1)
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> Cli {
    let cli_args = Cli::parse();

    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file("WXSHIM_INGEST_CONFIG", "ingest.toml")
    };

    merge_config(cli_args, &source)
}

/// Layers parsed CLI args over the config file at `source`. An unreadable
/// or invalid file is ignored and the reason kept in `config_error`.
pub fn merge_config(cli_args: Cli, source: &ConfigSource) -> Cli {
    let (file_config, config_error) = match load_config::<Cli>(source) {
        Ok(file_config) => (file_config, None),
        Err(e) => {
            let path = source
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            (
                Cli::default(),
                Some(format!("ignoring config file {}: {:#}", path, e)),
            )
        }
    };

    // CLI args override file config (env vars are handled by clap)
    Cli {
        config: cli_args.config,
        level: cli_args.level.or(file_config.level),
        input: cli_args.input.or(file_config.input),
        data_dir: cli_args.data_dir.or(file_config.data_dir),
        chunk_size: cli_args.chunk_size.or(file_config.chunk_size),
        config_error,
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "warn" => Level::Warning,
        "error" => Level::Error,
        _ => Level::Info,
    }
}

pub fn setup_logger(cli: &Cli) -> Logger {
    let level = cli
        .level
        .clone()
        .or_else(|| env::var("RUST_LOG").ok())
        .map(|l| parse_level(&l))
        .unwrap_or(Level::Info);

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(level).fuse();
    slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}
