use slog::{debug, info, warn, Logger};
use std::collections::{hash_map::Entry, BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use wxshim_core::{ensure_dir_exists, replace_dir, sync_dir, GazetteerRecord, ShardKey};

/// Rows buffered per chunk before they are appended to the shard files
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read gazetteer {path}: {source}")]
    Input { path: PathBuf, source: io::Error },
    #[error("failed to write shards in {path}: {source}")]
    Output { path: PathBuf, source: io::Error },
}

/// Summary of a finished ingestion run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestReport {
    pub rows_read: u64,
    pub rows_skipped: u64,
    pub rows_per_shard: BTreeMap<ShardKey, u64>,
}

impl IngestReport {
    pub fn rows_written(&self) -> u64 {
        self.rows_per_shard.values().sum()
    }
}

pub struct Ingestor {
    logger: Logger,
    chunk_size: usize,
}

impl Ingestor {
    pub fn new(logger: Logger, chunk_size: usize) -> Self {
        Self {
            logger,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Splits `input` into a fresh shard set and installs it at `data_dir`.
    ///
    /// Shards are built in a sibling staging directory and swapped in only
    /// after every file has been synced, so a gateway restarted mid-run keeps
    /// reading the previous complete set.
    pub fn run(&self, input: &Path, data_dir: &Path) -> Result<IngestReport, Error> {
        let staging = staging_path(data_dir);
        let output_err = |source| Error::Output {
            path: staging.clone(),
            source,
        };

        if staging.exists() {
            warn!(self.logger, "removing stale staging directory"; "path" => %staging.display());
            fs::remove_dir_all(&staging).map_err(output_err)?;
        }
        ensure_dir_exists(&staging).map_err(output_err)?;

        let total_rows = count_rows(input)?;
        info!(self.logger, "counted gazetteer rows"; "total" => total_rows);

        let report = self.split_into(input, &staging, total_rows)?;

        sync_dir(&staging).map_err(output_err)?;
        replace_dir(&staging, data_dir).map_err(|source| Error::Output {
            path: data_dir.to_path_buf(),
            source,
        })?;

        info!(
            self.logger,
            "shards installed";
            "dir" => %data_dir.display(),
            "written" => report.rows_written(),
            "skipped" => report.rows_skipped
        );
        Ok(report)
    }

    fn split_into(
        &self,
        input: &Path,
        out_dir: &Path,
        total_rows: u64,
    ) -> Result<IngestReport, Error> {
        let input_err = |source| Error::Input {
            path: input.to_path_buf(),
            source,
        };
        let reader = BufReader::new(File::open(input).map_err(input_err)?);
        let mut writers = ShardWriters::new(out_dir);
        let mut report = IngestReport::default();
        let mut chunk: Vec<(ShardKey, String)> = Vec::with_capacity(self.chunk_size);

        for raw in reader.split(b'\n') {
            let raw = raw.map_err(input_err)?;
            if raw.is_empty() || raw == b"\r" {
                continue;
            }
            report.rows_read += 1;

            let Ok(line) = String::from_utf8(raw) else {
                debug!(self.logger, "skipping row with invalid utf-8"; "row" => report.rows_read);
                report.rows_skipped += 1;
                continue;
            };
            let line = line.trim_end_matches('\r');

            // only rows the gateway can decode in full reach a shard
            match line.parse::<GazetteerRecord>() {
                Ok(record) => chunk.push((record.shard_key(), line.to_string())),
                Err(e) => {
                    debug!(self.logger, "skipping malformed row"; "row" => report.rows_read, "error" => %e);
                    report.rows_skipped += 1;
                }
            }

            if chunk.len() >= self.chunk_size {
                writers.write_chunk(&mut chunk, &mut report)?;
                self.log_progress(&report, total_rows);
            }
        }

        writers.write_chunk(&mut chunk, &mut report)?;
        self.log_progress(&report, total_rows);
        writers.finish()?;
        Ok(report)
    }

    fn log_progress(&self, report: &IngestReport, total_rows: u64) {
        info!(
            self.logger,
            "processing";
            "rows" => report.rows_read,
            "total" => total_rows
        );
    }
}

/// Append handles for every shard touched so far
struct ShardWriters {
    dir: PathBuf,
    files: HashMap<ShardKey, BufWriter<File>>,
}

impl ShardWriters {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            files: HashMap::new(),
        }
    }

    /// Groups the chunk by shard, keeping input order inside each shard
    fn write_chunk(
        &mut self,
        chunk: &mut Vec<(ShardKey, String)>,
        report: &mut IngestReport,
    ) -> Result<(), Error> {
        let mut buckets: BTreeMap<ShardKey, Vec<String>> = BTreeMap::new();
        for (key, line) in chunk.drain(..) {
            buckets.entry(key).or_default().push(line);
        }

        for (key, rows) in buckets {
            let path = self.dir.join(key.file_name());
            let writer = self.writer(key)?;
            for row in &rows {
                writeln!(writer, "{}", row).map_err(|source| Error::Output {
                    path: path.clone(),
                    source,
                })?;
            }
            *report.rows_per_shard.entry(key).or_default() += rows.len() as u64;
        }
        Ok(())
    }

    fn writer(&mut self, key: ShardKey) -> Result<&mut BufWriter<File>, Error> {
        match self.files.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = self.dir.join(key.file_name());
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|source| Error::Output { path, source })?;
                Ok(entry.insert(BufWriter::new(file)))
            }
        }
    }

    fn finish(self) -> Result<(), Error> {
        for (key, writer) in self.files {
            let path = self.dir.join(key.file_name());
            let file = writer.into_inner().map_err(|e| Error::Output {
                path: path.clone(),
                source: e.into_error(),
            })?;
            file.sync_all()
                .map_err(|source| Error::Output { path, source })?;
        }
        Ok(())
    }
}

fn count_rows(input: &Path) -> Result<u64, Error> {
    let input_err = |source| Error::Input {
        path: input.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(input).map_err(input_err)?);
    let mut total = 0;
    for row in reader.split(b'\n') {
        if !row.map_err(input_err)?.is_empty() {
            total += 1;
        }
    }
    Ok(total)
}

fn staging_path(data_dir: &Path) -> PathBuf {
    let mut name = data_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "data".into());
    name.push(".staging");
    data_dir.with_file_name(name)
}
