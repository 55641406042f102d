//! wxshim core library
//!
//! Shared pieces of the gateway and the ingest job:
//! - Configuration loading (XDG-compliant)
//! - File system utilities
//! - The on-disk gazetteer shard format

mod config;
pub mod fs;
pub mod shard;

pub use config::{find_config_file, load_config, ConfigSource};
pub use fs::{ensure_dir_exists, replace_dir, sync_dir};
pub use shard::{shard_key, GazetteerRecord, ShardKey, FIELD_COUNT, SHARD_EXTENSION};

/// Application name used for XDG paths
pub const APP_NAME: &str = "wxshim";

/// Default gateway port
pub const DEFAULT_GATEWAY_PORT: u16 = 8000;

/// Default shard directory, shared by the writer and the reader
pub const DEFAULT_DATA_DIR: &str = "./data";
