//! Orchestration: read both sources, build the five tables and write them.
//!
//! Tables are written in dependency order (songs, artists, users, time,
//! songplays). A failure stops the run; tables already written stay written.

use std::time::Instant;

use tracing::info;

use tempo_core::emit;
use tempo_core::metrics::events::StageCompleted;

use crate::config::{Config, TransformConfig};
use crate::error::PipelineError;
use crate::sink::{ParquetSink, TableSink, TableWriteStats};
use crate::source::{JsonSource, RecordSource};
use crate::transform::{
    SongplayStats, Table, TimestampConverter, build_songplays, extract_artists, extract_songs,
    extract_time, extract_users, filter_events,
};

/// Statistics for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Song metadata records read.
    pub song_records: usize,
    /// Event log records read.
    pub log_records: usize,
    /// Song-play events after filtering and deduplication.
    pub song_plays: usize,
    /// Per-table write results in write order.
    pub tables: Vec<(&'static str, TableWriteStats)>,
    pub songplays: SongplayStats,
}

impl PipelineStats {
    /// Rows written for `table`, if it was written.
    pub fn rows(&self, table: &str) -> Option<usize> {
        self.tables
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, stats)| stats.rows)
    }
}

/// Run the pipeline described by `config`.
pub async fn run_pipeline(config: &Config) -> Result<PipelineStats, PipelineError> {
    let converter = TimestampConverter::from_config(&config.transform)?;

    let (song_source, log_source) = tokio::try_join!(
        JsonSource::open("song_data", &config.source.song_data, &config.source),
        JsonSource::open("log_data", &config.source.log_data, &config.source),
    )?;
    let sink = ParquetSink::open(&config.sink).await?;

    info!(
        song_data = %config.source.song_data,
        log_data = %config.source.log_data,
        output = %config.sink.output_uri,
        "Starting tempo"
    );

    run_with(&song_source, &log_source, &sink, &config.transform, &converter).await
}

/// Run the pipeline over arbitrary sources and sink.
pub async fn run_with(
    song_source: &dyn RecordSource,
    log_source: &dyn RecordSource,
    sink: &dyn TableSink,
    transform: &TransformConfig,
    converter: &TimestampConverter,
) -> Result<PipelineStats, PipelineError> {
    let run_start = Instant::now();
    let mut stats = PipelineStats::default();

    let start = Instant::now();
    let (song_df, log_df) = tokio::try_join!(song_source.read(), log_source.read())?;
    stats.song_records = song_df.num_rows();
    stats.log_records = log_df.num_rows();
    info!(
        song_source = song_source.describe(),
        log_source = log_source.describe(),
        song_records = stats.song_records,
        log_records = stats.log_records,
        "Read sources"
    );
    emit!(StageCompleted {
        stage: "read",
        duration: start.elapsed(),
    });

    let start = Instant::now();
    let songs = Table::songs(extract_songs(&song_df)?);
    write(sink, &songs, &mut stats).await?;
    let artists = Table::artists(extract_artists(&song_df, transform.artists_duplicates)?);
    write(sink, &artists, &mut stats).await?;
    emit!(StageCompleted {
        stage: "song_tables",
        duration: start.elapsed(),
    });

    let start = Instant::now();
    let filtered = filter_events(&log_df)?;
    stats.song_plays = filtered.num_rows();
    let users = Table::users(extract_users(&filtered, transform.users_duplicates)?);
    write(sink, &users, &mut stats).await?;
    let time = Table::time(extract_time(&filtered, converter)?);
    write(sink, &time, &mut stats).await?;
    emit!(StageCompleted {
        stage: "event_tables",
        duration: start.elapsed(),
    });

    let start = Instant::now();
    let songplays = build_songplays(&filtered, &song_df, &artists.frame, &time.frame, converter)?;
    stats.songplays = songplays.stats;
    write(sink, &Table::songplays(songplays.table), &mut stats).await?;
    emit!(StageCompleted {
        stage: "songplays",
        duration: start.elapsed(),
    });

    info!(
        song_records = stats.song_records,
        log_records = stats.log_records,
        song_plays = stats.song_plays,
        songplays = stats.rows("songplays").unwrap_or_default(),
        elapsed_ms = run_start.elapsed().as_millis() as u64,
        "Pipeline complete"
    );
    Ok(stats)
}

async fn write(
    sink: &dyn TableSink,
    table: &Table,
    stats: &mut PipelineStats,
) -> Result<(), PipelineError> {
    let written = sink
        .write_table(table.name, &table.frame, table.partition_by)
        .await?;
    stats.tables.push((table.name, written));
    Ok(())
}
