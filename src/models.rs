//! Core data models for streaming dataset generation.
//!
//! Tracks come from the catalog, records are produced by the simulator and
//! the summary is computed after the dataset is written.

use chrono::NaiveDate;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::sync::Arc;

// ============================================================================
// Catalog Models
// ============================================================================

/// One catalog entry. Strings are reference counted so that every generated
/// record can denormalize the track without copying its text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub track_id: Arc<str>,
    pub track_name: Arc<str>,
    pub artists: Arc<str>,
    pub popularity: u8, // 0-100
}

impl Track {
    pub fn new(track_id: &str, track_name: &str, artists: &str, popularity: u8) -> Self {
        Self {
            track_id: Arc::from(track_id),
            track_name: Arc::from(track_name),
            artists: Arc::from(artists),
            popularity,
        }
    }
}

// ============================================================================
// Output Models
// ============================================================================

/// One (day, track, region) row of the generated dataset.
///
/// Field order matches the CSV column order:
/// `date, track_id, track_name, artists, streams, region, playlist_adds, popularity`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StreamingRecord {
    pub date: NaiveDate, // serialized as YYYY-MM-DD
    pub track_id: Arc<str>,
    pub track_name: Arc<str>,
    pub artists: Arc<str>,
    pub streams: u64,
    pub region: Arc<str>,
    pub playlist_adds: u64,
    pub popularity: u8,
}

impl StreamingRecord {
    pub fn new(
        date: NaiveDate,
        track: &Track,
        region: &Arc<str>,
        streams: u64,
        playlist_adds: u64,
    ) -> Self {
        Self {
            date,
            track_id: Arc::clone(&track.track_id),
            track_name: Arc::clone(&track.track_name),
            artists: Arc::clone(&track.artists),
            streams,
            region: Arc::clone(region),
            playlist_adds,
            popularity: track.popularity,
        }
    }
}

// ============================================================================
// Summary (Instrumentation)
// ============================================================================

/// Informational summary of a generated dataset. Not used for correctness.
#[derive(Default, Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub total_records: usize,
    pub unique_tracks: usize,
    pub regions: Vec<String>, // first-seen order
    pub total_streams: u64,
    pub avg_streams: f64, // mean streams per record
    pub total_playlist_adds: u64,
}

impl DatasetSummary {
    pub fn from_records(records: &[StreamingRecord]) -> Self {
        let mut summary = Self {
            total_records: records.len(),
            ..Self::default()
        };
        let mut tracks: FxHashSet<&str> = FxHashSet::default();
        let mut regions: FxHashSet<&str> = FxHashSet::default();

        for record in records {
            summary.first_date = Some(match summary.first_date {
                Some(d) => d.min(record.date),
                None => record.date,
            });
            summary.last_date = Some(match summary.last_date {
                Some(d) => d.max(record.date),
                None => record.date,
            });
            tracks.insert(&record.track_id);
            if regions.insert(&record.region) {
                summary.regions.push(record.region.to_string());
            }
            // Stream counts saturate at u64::MAX under extreme multipliers
            summary.total_streams = summary.total_streams.saturating_add(record.streams);
            summary.total_playlist_adds =
                summary.total_playlist_adds.saturating_add(record.playlist_adds);
        }

        summary.unique_tracks = tracks.len();
        if !records.is_empty() {
            summary.avg_streams = summary.total_streams as f64 / records.len() as f64;
        }
        summary
    }

    /// Log the summary block at info level.
    pub fn log_summary(&self) {
        let fmt_date = |d: Option<NaiveDate>| {
            d.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
        };
        tracing::info!("=== Data Summary ===");
        tracing::info!(
            "Date range: {} to {}",
            fmt_date(self.first_date),
            fmt_date(self.last_date)
        );
        tracing::info!("Total records: {}", self.total_records);
        tracing::info!("Unique tracks: {}", self.unique_tracks);
        tracing::info!("Regions: {:?}", self.regions);
        tracing::info!("Total streams: {}", self.total_streams);
        tracing::info!("Avg daily streams per track: {:.0}", self.avg_streams);
        tracing::info!("Total playlist adds: {}", self.total_playlist_adds);
    }

    /// Write the summary to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| crate::Error::write(path, e))?;
        std::fs::write(path, json).map_err(|e| crate::Error::write(path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, track: &Track, region: &str, streams: u64, adds: u64) -> StreamingRecord {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        StreamingRecord::new(date, track, &Arc::from(region), streams, adds)
    }

    #[test]
    fn test_record_denormalizes_track() {
        let track = Track::new("t1", "Song", "Artist", 42);
        let rec = record("2023-06-01", &track, "US", 100, 3);
        assert_eq!(&*rec.track_id, "t1");
        assert_eq!(&*rec.track_name, "Song");
        assert_eq!(&*rec.artists, "Artist");
        assert_eq!(rec.popularity, 42);
        assert_eq!(&*rec.region, "US");
    }

    #[test]
    fn test_summary_totals() {
        let a = Track::new("a", "A", "X", 10);
        let b = Track::new("b", "B", "Y", 20);
        let records = vec![
            record("2023-01-02", &a, "US", 10, 1),
            record("2023-01-02", &a, "UK", 20, 0),
            record("2023-01-01", &b, "US", 30, 2),
            record("2023-01-03", &b, "UK", 40, 4),
        ];
        let summary = DatasetSummary::from_records(&records);
        assert_eq!(summary.total_records, 4);
        assert_eq!(summary.unique_tracks, 2);
        assert_eq!(summary.regions, vec!["US".to_string(), "UK".to_string()]);
        assert_eq!(summary.total_streams, 100);
        assert_eq!(summary.total_playlist_adds, 7);
        assert_eq!(summary.avg_streams, 25.0);
        assert_eq!(summary.first_date.unwrap().to_string(), "2023-01-01");
        assert_eq!(summary.last_date.unwrap().to_string(), "2023-01-03");
    }

    #[test]
    fn test_summary_totals_saturate() {
        let a = Track::new("a", "A", "X", 100);
        let records = vec![
            record("2023-01-01", &a, "US", u64::MAX, u64::MAX / 2 + 1),
            record("2023-01-02", &a, "US", u64::MAX, u64::MAX / 2 + 1),
        ];
        let summary = DatasetSummary::from_records(&records);
        assert_eq!(summary.total_streams, u64::MAX);
        assert_eq!(summary.total_playlist_adds, u64::MAX);
        assert!(summary.avg_streams.is_finite());
    }

    #[test]
    fn test_summary_empty() {
        let summary = DatasetSummary::from_records(&[]);
        assert_eq!(summary.total_records, 0);
        assert!(summary.first_date.is_none());
        assert_eq!(summary.avg_streams, 0.0);
    }

    #[test]
    fn test_summary_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let track = Track::new("a", "A", "X", 10);
        let summary = DatasetSummary::from_records(&[record("2023-01-01", &track, "US", 5, 0)]);
        summary.write_to_file(&path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["total_streams"], 5);
        assert_eq!(json["first_date"], "2023-01-01");
    }
}
