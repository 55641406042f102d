use ingest::{get_config_info, setup_logger, Ingestor};
use slog::{error, info, warn};

fn main() -> Result<(), anyhow::Error> {
    let cli = get_config_info();
    let logger = setup_logger(&cli);
    if let Some(err) = &cli.config_error {
        warn!(logger, "{}, using defaults", err);
    }

    let input = cli.input();
    let data_dir = cli.data_dir();

    info!(logger, "wxshim ingest starting...");
    info!(logger, "  Input: {}", input.display());
    info!(logger, "  Data dir: {}", data_dir.display());
    info!(logger, "  Chunk size: {}", cli.chunk_size());

    let ingestor = Ingestor::new(logger.clone(), cli.chunk_size());
    match ingestor.run(&input, &data_dir) {
        Ok(report) => {
            for (key, rows) in &report.rows_per_shard {
                info!(logger, "shard {}: {} rows", key, rows);
            }
            info!(
                logger,
                "Finished: {} rows written, {} skipped",
                report.rows_written(),
                report.rows_skipped
            );
            Ok(())
        }
        Err(err) => {
            error!(logger, "Ingestion failed: {}", err);
            Err(err.into())
        }
    }
}
