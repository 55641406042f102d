use clap::Parser;
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};
use log::LevelFilter;
use serde::{Deserialize, Deserializer};
use std::{env, time::Duration};
use time::{format_description::well_known::Iso8601, OffsetDateTime};
use wxshim_core::{
    find_config_file, load_config, ConfigSource, DEFAULT_DATA_DIR, DEFAULT_GATEWAY_PORT,
};

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "wxshim gateway - Serves legacy weather XML queries"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $WXSHIM_GATEWAY_CONFIG, ./gateway.toml,
    /// $XDG_CONFIG_HOME/wxshim/gateway.toml, /etc/wxshim/gateway.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "WXSHIM_GATEWAY_LEVEL")]
    pub level: Option<String>,

    /// Host to listen on (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, env = "WXSHIM_GATEWAY_HOST")]
    #[serde(alias = "host")]
    pub domain: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "WXSHIM_GATEWAY_PORT")]
    #[serde(default, deserialize_with = "port_from_toml")]
    pub port: Option<String>,

    /// Directory holding the gazetteer shard files
    #[arg(short, long, env = "WXSHIM_GATEWAY_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Base URL of the upstream forecast API
    #[arg(short = 'u', long, env = "WXSHIM_GATEWAY_PROVIDER_URL")]
    pub provider_url: Option<String>,

    /// HTTP User-Agent header for upstream requests
    #[arg(short = 'a', long, env = "WXSHIM_GATEWAY_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Seconds a forecast request may take before the gateway gives up
    #[arg(short, long, env = "WXSHIM_GATEWAY_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Retries for transient upstream failures
    #[arg(short, long, env = "WXSHIM_GATEWAY_RETRIES")]
    pub retries: Option<u32>,

    /// Seconds an upstream response is reused for the same coordinates
    #[arg(long, env = "WXSHIM_GATEWAY_CACHE_TTL")]
    pub cache_ttl: Option<u64>,

    /// Why the config file was ignored, reported once logging is up
    #[arg(skip)]
    #[serde(skip)]
    pub config_error: Option<String>,
}

/// Accepts `port = 9000` as well as `port = "9000"`
fn port_from_toml<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    Ok(Option::<Port>::deserialize(deserializer)?.map(|port| match port {
        Port::Number(n) => n.to_string(),
        Port::Text(s) => s,
    }))
}

impl Cli {
    /// Get the effective configuration value with defaults
    pub fn host(&self) -> String {
        self.domain
            .clone()
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }

    pub fn port(&self) -> String {
        self.port
            .clone()
            .unwrap_or_else(|| DEFAULT_GATEWAY_PORT.to_string())
    }

    pub fn data_dir(&self) -> String {
        self.data_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
    }

    pub fn provider_url(&self) -> String {
        self.provider_url
            .clone()
            .unwrap_or_else(|| "https://api.open-meteo.com".to_string())
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("wxshim-gateway/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(15))
    }

    pub fn retries(&self) -> u32 {
        self.retries.unwrap_or(5)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl.unwrap_or(3600))
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> Cli {
    let cli_args = Cli::parse();

    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file("WXSHIM_GATEWAY_CONFIG", "gateway.toml")
    };

    merge_config(cli_args, &source)
}

/// Layers parsed CLI args over the config file at `source`. An unreadable
/// or invalid file is ignored and the reason kept in `config_error`.
pub fn merge_config(cli_args: Cli, source: &ConfigSource) -> Cli {
    if let Some(path) = source.path() {
        log::info!("Loading config from: {}", path.display());
    }

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
        domain: cli_args.domain.or(file_config.domain),
        port: cli_args.port.or(file_config.port),
        data_dir: cli_args.data_dir.or(file_config.data_dir),
        provider_url: cli_args.provider_url.or(file_config.provider_url),
        user_agent: cli_args.user_agent.or(file_config.user_agent),
        timeout: cli_args.timeout.or(file_config.timeout),
        retries: cli_args.retries.or(file_config.retries),
        cache_ttl: cli_args.cache_ttl.or(file_config.cache_ttl),
        config_error,
    }
}

pub fn get_log_level(cli: &Cli) -> LevelFilter {
    let level_str = cli
        .level
        .clone()
        .or_else(|| env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    match level_str.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

pub fn setup_logger() -> Dispatch {
    let colors = ColoredLevelConfig::new()
        .trace(Color::White)
        .debug(Color::Cyan)
        .info(Color::Blue)
        .warn(Color::Yellow)
        .error(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let now = OffsetDateTime::now_utc()
                .format(&Iso8601::DEFAULT)
                .unwrap_or_default();
            out.finish(format_args!(
                "[{} {}] {}: {}",
                now,
                colors.color(record.level()),
                record.target(),
                message
            ));
        })
        .chain(std::io::stdout())
}
