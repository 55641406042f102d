//! Read side of the gazetteer shards.
//!
//! Name search streams exactly one shard file. Identifier lookups go through
//! an in-memory `id -> (shard, byte offset)` table built when the index is
//! opened, so resolving an id costs one seek and one line read.
//!
//! The ingest job may swap a new shard set in while the gateway runs. Each
//! shard's length and mtime are recorded with the table; a changed shard, or
//! a recorded offset that no longer holds the expected id, rebuilds it.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::RwLock;
use wxshim_core::shard::{self, parse_id, parse_name};
use wxshim_core::{shard_key, GazetteerRecord, ShardKey};

use crate::ResolvedLocation;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("search text is empty")]
    InvalidQuery,
    #[error("No data file for letter '{0}'")]
    ShardNotFound(ShardKey),
    #[error("No matching WOEID {0} found in data files")]
    IdNotFound(i64),
    #[error("failed to read shard {path}: {source}")]
    Storage { path: PathBuf, source: io::Error },
    #[error("corrupt record in {path} at byte {offset}: {source}")]
    Corrupt {
        path: PathBuf,
        offset: u64,
        source: shard::Error,
    },
}

#[async_trait]
pub trait LocationData: Send + Sync {
    /// Records of the shard keyed by `text`'s first character whose name
    /// contains `text`, ignoring case, in shard order.
    async fn search(&self, text: &str) -> Result<Vec<GazetteerRecord>, Error>;
    /// First record carrying `id`, scanning shards `A`..`Z` then `Misc`
    async fn resolve_by_id(&self, id: i64) -> Result<ResolvedLocation, Error>;
}

/// Identity of a shard file as seen when the id table was built
#[derive(Debug, Clone, Copy, PartialEq)]
struct ShardStamp {
    len: u64,
    modified: Option<SystemTime>,
}

#[derive(Debug, Default)]
struct IdTable {
    ids: HashMap<i64, (ShardKey, u64)>,
    stamps: HashMap<ShardKey, ShardStamp>,
}

pub struct LocationIndex {
    data_dir: PathBuf,
    table: RwLock<IdTable>,
}

impl LocationIndex {
    /// Scans every shard once and records where each id first appears
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let data_dir = data_dir.into();
        let table = build_table(&data_dir).await?;
        info!(
            "location index ready: {} ids from {}",
            table.ids.len(),
            data_dir.display()
        );
        Ok(Self {
            data_dir,
            table: RwLock::new(table),
        })
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.ids.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.ids.is_empty()
    }

    fn shard_path(&self, key: ShardKey) -> PathBuf {
        self.data_dir.join(key.file_name())
    }

    /// Rebuilds the id table from the shard files currently on disk
    async fn reload(&self) -> Result<(), Error> {
        let table = build_table(&self.data_dir).await?;
        info!(
            "shards changed, location index rebuilt: {} ids",
            table.ids.len()
        );
        *self.table.write().await = table;
        Ok(())
    }

    async fn shards_changed(&self) -> Result<bool, Error> {
        let table = self.table.read().await;
        for key in ShardKey::all() {
            let current = shard_stamp(&self.shard_path(key)).await?;
            if current.as_ref() != table.stamps.get(&key) {
                debug!("shard {} changed since the id table was built", key);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn locate(&self, id: i64) -> Result<(ShardKey, u64), Error> {
        self.table
            .read()
            .await
            .ids
            .get(&id)
            .copied()
            .ok_or(Error::IdNotFound(id))
    }

    async fn record_at(&self, key: ShardKey, offset: u64) -> Result<GazetteerRecord, Error> {
        let path = self.shard_path(key);
        let storage_err = |source| Error::Storage {
            path: path.clone(),
            source,
        };

        let mut file = File::open(&path).await.map_err(storage_err)?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(storage_err)?;
        let mut line = Vec::new();
        BufReader::new(file)
            .read_until(b'\n', &mut line)
            .await
            .map_err(storage_err)?;

        String::from_utf8_lossy(&line)
            .parse()
            .map_err(|source| Error::Corrupt {
                path: path.clone(),
                offset,
                source,
            })
    }
}

async fn shard_stamp(path: &Path) -> Result<Option<ShardStamp>, Error> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Some(ShardStamp {
            len: meta.len(),
            modified: meta.modified().ok(),
        })),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::Storage {
            path: path.to_path_buf(),
            source,
        }),
    }
}

async fn build_table(data_dir: &Path) -> Result<IdTable, Error> {
    if !data_dir.is_dir() {
        return Err(Error::Storage {
            path: data_dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "shard directory missing"),
        });
    }

    let mut table = IdTable::default();
    for key in ShardKey::all() {
        let path = data_dir.join(key.file_name());
        let Some(stamp) = shard_stamp(&path).await? else {
            debug!("no shard for {}", key);
            continue;
        };
        let rows = index_shard(&path, key, &mut table.ids).await?;
        debug!("indexed {} rows from {}", rows, path.display());
        table.stamps.insert(key, stamp);
    }
    Ok(table)
}

async fn index_shard(
    path: &Path,
    key: ShardKey,
    ids: &mut HashMap<i64, (ShardKey, u64)>,
) -> Result<u64, Error> {
    let storage_err = |source| Error::Storage {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = BufReader::new(File::open(path).await.map_err(storage_err)?);
    let mut line = Vec::new();
    let mut offset = 0u64;
    let mut rows = 0u64;

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(storage_err)?;
        if read == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end();
        if !text.is_empty() {
            match parse_id(text) {
                Ok(id) => {
                    ids.entry(id).or_insert((key, offset));
                    rows += 1;
                }
                Err(e) => warn!("skipping row at {}:{}: {}", path.display(), offset, e),
            }
        }
        offset += read as u64;
    }
    Ok(rows)
}

#[async_trait]
impl LocationData for LocationIndex {
    async fn search(&self, text: &str) -> Result<Vec<GazetteerRecord>, Error> {
        if text.trim().is_empty() {
            return Err(Error::InvalidQuery);
        }
        let key = shard_key(Some(text));
        let path = self.shard_path(key);
        let file = File::open(&path).await.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                Error::ShardNotFound(key)
            } else {
                Error::Storage {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        let needle = text.to_lowercase();
        let mut reader = BufReader::new(file);
        let mut line = Vec::new();
        let mut offset = 0u64;
        let mut found = Vec::new();

        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .await
                .map_err(|source| Error::Storage {
                    path: path.clone(),
                    source,
                })?;
            if read == 0 {
                break;
            }
            let row = String::from_utf8_lossy(&line);
            let matches = parse_name(row.trim_end())
                .map(|name| name.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if matches {
                let record = row.parse().map_err(|source| Error::Corrupt {
                    path: path.clone(),
                    offset,
                    source,
                })?;
                found.push(record);
            }
            offset += read as u64;
        }

        debug!("search {:?} in shard {}: {} hits", text, key, found.len());
        Ok(found)
    }

    async fn resolve_by_id(&self, id: i64) -> Result<ResolvedLocation, Error> {
        if self.shards_changed().await? {
            self.reload().await?;
        }

        let (key, offset) = self.locate(id).await?;
        match self.record_at(key, offset).await {
            Ok(record) if record.id == id => return Ok(record.into()),
            // a swap that kept length and mtime, or one racing this request
            Ok(_) | Err(Error::Corrupt { .. } | Error::Storage { .. }) => {
                warn!("stale offset for id {} in shard {}, rebuilding", id, key)
            }
            Err(e) => return Err(e),
        }

        self.reload().await?;
        let (key, offset) = self.locate(id).await?;
        let record = self.record_at(key, offset).await?;
        if record.id != id {
            return Err(Error::IdNotFound(id));
        }
        Ok(record.into())
    }
}

impl From<GazetteerRecord> for ResolvedLocation {
    fn from(record: GazetteerRecord) -> Self {
        ResolvedLocation {
            id: record.id,
            name: record.name.unwrap_or_default(),
            latitude: record.latitude,
            longitude: record.longitude,
        }
    }
}
