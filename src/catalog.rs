//! Track catalog loading and sampling.
//!
//! The catalog is a delimited file with at least the columns
//! `track_id, track_name, artists, popularity`. Extra columns are ignored.

use crate::models::Track;
use crate::progress::create_spinner;
use crate::rng::create_rng;
use crate::{Error, Result};
use rand::seq::index;
use std::fs::File;
use std::path::Path;

/// Columns every catalog must carry, in reporting order.
pub const REQUIRED_COLUMNS: [&str; 4] = ["track_id", "track_name", "artists", "popularity"];

/// Positions of the required columns in a catalog header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    track_id: usize,
    track_name: usize,
    artists: usize,
    popularity: usize,
}

impl ColumnMap {
    /// Resolve the required columns, reporting every missing one at once.
    fn from_header(header: &csv::StringRecord, path: &Path) -> Result<Self> {
        let names: Vec<&str> = header
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();
        let find = |col: &str| names.iter().position(|n| *n == col);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| find(**col).is_none())
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::Schema {
                path: path.to_path_buf(),
                missing,
            });
        }

        Ok(Self {
            track_id: find("track_id").unwrap_or_default(),
            track_name: find("track_name").unwrap_or_default(),
            artists: find("artists").unwrap_or_default(),
            popularity: find("popularity").unwrap_or_default(),
        })
    }
}

/// Parse a popularity cell. Integral floats such as `57.0` are accepted.
fn parse_popularity(raw: &str) -> std::result::Result<u8, String> {
    let raw = raw.trim();
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("popularity '{}' is not a number", raw))?;
    if value.fract() != 0.0 || !(0.0..=100.0).contains(&value) {
        return Err(format!("popularity '{}' is not an integer in [0, 100]", raw));
    }
    Ok(value as u8)
}

/// Iterator over the tracks of an opened catalog, in file order.
pub struct CatalogReader<R: std::io::Read> {
    records: csv::StringRecordsIntoIter<R>,
    columns: ColumnMap,
    path: std::path::PathBuf,
}

impl CatalogReader<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::DataSource {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_reader(file, path)
    }
}

impl<R: std::io::Read> CatalogReader<R> {
    /// `path` is only used for error context.
    pub fn from_reader(reader: R, path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let header = reader.headers().map_err(|e| Error::DataSource {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let columns = ColumnMap::from_header(header, path)?;

        Ok(Self {
            records: reader.into_records(),
            columns,
            path: path.to_path_buf(),
        })
    }

    fn parse_row(&self, row: &csv::StringRecord) -> Result<Track> {
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let field = |idx: usize, name: &str| {
            row.get(idx).ok_or_else(|| Error::InvalidRow {
                path: self.path.clone(),
                line,
                reason: format!("missing value for '{}'", name),
            })
        };

        let track_id = field(self.columns.track_id, "track_id")?;
        let track_name = field(self.columns.track_name, "track_name")?;
        let artists = field(self.columns.artists, "artists")?;
        let popularity =
            parse_popularity(field(self.columns.popularity, "popularity")?).map_err(|reason| {
                Error::InvalidRow {
                    path: self.path.clone(),
                    line,
                    reason,
                }
            })?;

        Ok(Track::new(track_id, track_name, artists, popularity))
    }
}

impl<R: std::io::Read> Iterator for CatalogReader<R> {
    type Item = Result<Track>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.records.next()?;
        Some(match row {
            Ok(row) => self.parse_row(&row),
            Err(e) => Err(Error::DataSource {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
        })
    }
}

/// Load every track of the catalog, preserving file order.
pub fn load_catalog(path: &Path) -> Result<Vec<Track>> {
    tracing::info!("Loading track catalog from {}", path.display());
    let spinner = create_spinner("Reading catalog");
    let tracks = CatalogReader::open(path)?.collect::<Result<Vec<_>>>()?;
    spinner.finish_with_message(format!("Read {} tracks", tracks.len()));
    tracing::info!("Loaded {} tracks from catalog", tracks.len());
    Ok(tracks)
}

/// Downsample to `sample_size` tracks without replacement.
///
/// The same seed, catalog and size always select the same tracks in the same
/// order. Catalogs not larger than `sample_size` are returned unchanged.
pub fn sample_tracks(tracks: Vec<Track>, sample_size: usize, seed: u64) -> Vec<Track> {
    if tracks.len() <= sample_size {
        tracing::debug!(
            "Catalog has {} tracks, not above sample size {}; keeping all",
            tracks.len(),
            sample_size
        );
        return tracks;
    }

    tracing::info!("Sampling {} tracks from {} total tracks", sample_size, tracks.len());
    let mut rng = create_rng(seed);
    index::sample(&mut rng, tracks.len(), sample_size)
        .into_iter()
        .map(|i| tracks[i].clone())
        .collect()
}
