//! Dataset sink: writes generated records as CSV.

use crate::models::StreamingRecord;
use crate::progress::create_progress_bar;
use crate::{Error, Result};
use std::fs::File;
use std::path::Path;

const WRITE_BATCH_SIZE: usize = 10_000;

/// Output columns, in order.
pub const OUTPUT_COLUMNS: [&str; 8] = [
    "date",
    "track_id",
    "track_name",
    "artists",
    "streams",
    "region",
    "playlist_adds",
    "popularity",
];

/// Write records to `path` in the order given, creating parent directories.
///
/// An interrupted write leaves the file in an unspecified state; callers
/// treat anything but `Ok` as a failed run.
pub fn write_records(records: &[StreamingRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::write(parent, e))?;
    }

    tracing::info!("Saving streaming data to {}", path.display());
    let file = File::create(path).map_err(|e| Error::write(path, e))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer
        .write_record(OUTPUT_COLUMNS)
        .map_err(|e| Error::write(path, e))?;

    let pb = create_progress_bar(records.len() as u64, "Writing records");
    for chunk in records.chunks(WRITE_BATCH_SIZE) {
        for record in chunk {
            writer.serialize(record).map_err(|e| Error::write(path, e))?;
        }
        pb.inc(chunk.len() as u64);
    }
    writer.flush().map_err(|e| Error::write(path, e))?;
    pb.finish_with_message(format!("Wrote {} records", records.len()));

    tracing::info!("Successfully saved {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Track;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn records() -> Vec<StreamingRecord> {
        let date = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap();
        let a = Track::new("abc", "Hello, World", "Artist \"Q\"", 61);
        let b = Track::new("def", "Plain", "Other", 0);
        vec![
            StreamingRecord::new(date, &a, &Arc::from("US"), 1234, 25),
            StreamingRecord::new(date, &b, &Arc::from("US"), 0, 0),
        ]
    }

    #[test]
    fn test_write_creates_parents_and_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/streaming_data.csv");
        write_records(&records(), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines[0],
            "date,track_id,track_name,artists,streams,region,playlist_adds,popularity"
        );
        assert_eq!(lines[1], "2023-07-01,abc,\"Hello, World\",\"Artist \"\"Q\"\"\",1234,US,25,61");
        assert_eq!(lines[2], "2023-07-01,def,Plain,Other,0,US,0,0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_write_empty_has_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_records(&[], &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn test_write_through_file_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "x").unwrap();
        let err = write_records(&records(), &blocker.join("out.csv")).unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }

    #[test]
    fn test_same_seed_gives_identical_files() {
        use crate::config::{SimulationConfig, StreamModel};
        use crate::rng::create_rng;
        use crate::simulate::Simulator;

        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("tracks.csv");
        std::fs::write(
            &catalog,
            "track_id,track_name,artists,popularity\nx1,One,A,50\nx2,Two,B,0\nx3,Three,C,99\n",
        )
        .unwrap();
        let tracks = crate::catalog::load_catalog(&catalog).unwrap();
        let config = SimulationConfig::new(
            45,
            NaiveDate::from_ymd_opt(2023, 7, 20).unwrap(),
            vec!["US".to_string(), "BR".to_string()],
            StreamModel::default(),
        )
        .unwrap();
        let sim = Simulator::new(&tracks, &config);

        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        write_records(&sim.run(&mut create_rng(42)), &first).unwrap();
        write_records(&sim.run(&mut create_rng(42)), &second).unwrap();
        let bytes = std::fs::read(&first).unwrap();
        assert_eq!(bytes, std::fs::read(&second).unwrap());
        // header + 45 days * 3 tracks * 2 regions
        assert_eq!(String::from_utf8(bytes).unwrap().lines().count(), 1 + 270);

        let par_a = dir.path().join("par_a.csv");
        let par_b = dir.path().join("par_b.csv");
        write_records(&sim.run_parallel(42), &par_a).unwrap();
        write_records(&sim.run_parallel(42), &par_b).unwrap();
        assert_eq!(std::fs::read(&par_a).unwrap(), std::fs::read(&par_b).unwrap());
    }

    #[test]
    fn test_output_readable_as_catalog() {
        // Generated datasets carry the catalog columns and can be reloaded
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streams.csv");
        write_records(&records(), &path).unwrap();
        let tracks = crate::catalog::load_catalog(&path).unwrap();
        assert_eq!(tracks[0], Track::new("abc", "Hello, World", "Artist \"Q\"", 61));
    }
}
