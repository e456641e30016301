//! Attaches the embedding and derived metadata to a record

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{IngestError, IngestResult};
use crate::models::{INGEST_SOURCE, IngestRecord, Metadata};

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`, sub-millisecond digits truncated
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Set `vector` (when one was produced) and `metadata` on the record.
///
/// Any vector the event arrived with is discarded, so the record only ever
/// carries the embedding produced here. `metadata.title` mirrors the
/// record's `title`, which must be a string.
pub fn enrich(
    mut record: IngestRecord,
    vector: Option<Vec<f32>>,
    now: DateTime<Utc>,
) -> IngestResult<IngestRecord> {
    let title = record.title().ok_or(IngestError::MissingTitle)?.to_string();

    let timestamp = format_timestamp(now);
    let date = timestamp[..10].to_string();

    record.clear_vector();
    if let Some(vector) = vector {
        record.set_vector(vector);
    }

    record.set_metadata(Metadata {
        source: INGEST_SOURCE.to_string(),
        title,
        date,
        timestamp,
    });

    Ok(record)
}
