//! Layered streaming model and the (day x track x region) simulation walk.
//!
//! Each triple runs the same fixed sequence of layers on a running estimate:
//!
//! 1. base: `popularity * U(base_mult_min, base_mult_max)`
//! 2. weekend (Friday/Saturday, Monday=0 indices 4 and 5): `* (1 + U(weekend_boost))`
//! 3. viral spike with probability `viral_spike_probability`: `* U(viral_mult)`
//! 4. summer (June, July, August): `* (1 + summer_boost)`
//! 5. truncate to an integer
//!
//! Playlist adds follow as `trunc(streams / divisor * U(0.8, 1.2))`.
//!
//! The draw sequence per triple is positional: base, [weekend], viral test,
//! [viral multiplier], playlist variance. Reordering layers changes output
//! under a fixed seed.

use crate::config::{SimulationConfig, StreamModel};
use crate::models::{StreamingRecord, Track};
use crate::progress::{create_progress_bar, log_progress};
use crate::rng::{triple_rng, uniform};
use chrono::{Datelike, NaiveDate};
use rand::Rng;
use rayon::prelude::*;
use std::sync::Arc;

/// Days between progress log lines
pub const PROGRESS_INTERVAL_DAYS: u64 = 30;

const PLAYLIST_VARIANCE_MIN: f64 = 0.8;
const PLAYLIST_VARIANCE_MAX: f64 = 1.2;

/// Friday and Saturday under a Monday=0 week.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday().num_days_from_monday(), 4 | 5)
}

pub fn is_summer_month(date: NaiveDate) -> bool {
    matches!(date.month(), 6..=8)
}

/// Apply the weekend, viral and summer layers to a base estimate and
/// truncate. Consumes the weekend draw (weekends only), the viral test draw
/// and the viral multiplier draw (spikes only).
pub fn calculate_streams<R: Rng>(
    model: &StreamModel,
    date: NaiveDate,
    base_streams: f64,
    rng: &mut R,
) -> u64 {
    let mut streams = base_streams;

    if is_weekend(date) {
        streams *= 1.0 + uniform(rng, model.weekend_boost_min, model.weekend_boost_max);
    }

    if rng.gen::<f64>() < model.viral_spike_probability {
        streams *= uniform(rng, model.viral_mult_min, model.viral_mult_max);
    }

    if is_summer_month(date) {
        streams *= 1.0 + model.summer_boost;
    }

    streams as u64
}

pub fn calculate_playlist_adds<R: Rng>(model: &StreamModel, streams: u64, rng: &mut R) -> u64 {
    let base_adds = streams as f64 / model.playlist_adds_divisor;
    let variance = uniform(rng, PLAYLIST_VARIANCE_MIN, PLAYLIST_VARIANCE_MAX);
    (base_adds * variance) as u64
}

/// Run the full layered model for one triple, returning
/// `(streams, playlist_adds)`.
pub fn simulate_triple<R: Rng>(
    model: &StreamModel,
    popularity: u8,
    date: NaiveDate,
    rng: &mut R,
) -> (u64, u64) {
    let base_streams = popularity as f64 * uniform(rng, model.base_mult_min, model.base_mult_max);
    let streams = calculate_streams(model, date, base_streams, rng);
    let playlist_adds = calculate_playlist_adds(model, streams, rng);
    (streams, playlist_adds)
}

/// Position of one triple in the simulation walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triple {
    pub day_offset: u32,
    pub track_index: usize,
    pub region_index: usize,
}

/// Simulator over a fixed track set and validated configuration.
pub struct Simulator<'a> {
    tracks: &'a [Track],
    config: &'a SimulationConfig,
    regions: Vec<Arc<str>>,
    dates: Vec<NaiveDate>,
}

impl<'a> Simulator<'a> {
    pub fn new(tracks: &'a [Track], config: &'a SimulationConfig) -> Self {
        let regions = config.regions().iter().map(|r| Arc::from(r.as_str())).collect();
        let dates = (0..config.num_days()).map(|d| config.date_at(d)).collect();
        Self {
            tracks,
            config,
            regions,
            dates,
        }
    }

    /// Number of records a run produces: `days * tracks * regions`.
    pub fn record_count(&self) -> usize {
        self.dates.len() * self.tracks.len() * self.regions.len()
    }

    /// Triple at a flat position of the walk (day-major, then track, then
    /// region).
    fn triple_at(&self, index: usize) -> Triple {
        let per_day = self.tracks.len() * self.regions.len();
        let regions = self.regions.len();
        Triple {
            day_offset: (index / per_day) as u32,
            track_index: (index % per_day) / regions,
            region_index: index % regions,
        }
    }

    /// Flattened walk over every triple in output order.
    pub fn triples(&self) -> impl ExactSizeIterator<Item = Triple> + '_ {
        (0..self.record_count()).map(move |i| self.triple_at(i))
    }

    fn build_record(&self, triple: Triple, streams: u64, playlist_adds: u64) -> StreamingRecord {
        StreamingRecord::new(
            self.dates[triple.day_offset as usize],
            &self.tracks[triple.track_index],
            &self.regions[triple.region_index],
            streams,
            playlist_adds,
        )
    }

    fn log_start(&self, mode: &str) {
        tracing::info!(
            "Generating {} days of streaming data ({} to {}) for {} tracks across {} regions ({})",
            self.dates.len(),
            self.config.start_date(),
            self.config.end_date(),
            self.tracks.len(),
            self.regions.len(),
            mode
        );
    }

    /// Serial run drawing every variate from one injected generator, in
    /// output order.
    pub fn run<R: Rng>(&self, rng: &mut R) -> Vec<StreamingRecord> {
        self.log_start("serial");
        let total_days = self.dates.len() as u64;
        let per_day = self.tracks.len() * self.regions.len();
        let pb = create_progress_bar(total_days, "Simulating days");

        let mut records = Vec::with_capacity(self.record_count());
        for triple in self.triples() {
            let date = self.dates[triple.day_offset as usize];
            let popularity = self.tracks[triple.track_index].popularity;
            let (streams, adds) = simulate_triple(self.config.model(), popularity, date, rng);
            records.push(self.build_record(triple, streams, adds));

            if records.len() % per_day == 0 {
                let completed = triple.day_offset as u64 + 1;
                pb.inc(1);
                log_progress("simulate", completed, total_days, PROGRESS_INTERVAL_DAYS);
            }
        }

        pb.finish_with_message(format!("Simulated {} records", records.len()));
        tracing::info!("Generated {} streaming records", records.len());
        records
    }

    /// Parallel run. Each triple draws from its own sub-stream derived from
    /// `(seed, date, track_id, region)`, so output is identical for any
    /// thread count and matches across runs with the same seed.
    pub fn run_parallel(&self, seed: u64) -> Vec<StreamingRecord> {
        self.log_start("parallel");
        let total_days = self.dates.len() as u64;
        let pb = create_progress_bar(total_days, "Simulating days");
        let model = self.config.model();

        let mut records = Vec::with_capacity(self.record_count());
        // Day by day keeps progress reporting in step with the serial walk
        for (day_offset, &date) in self.dates.iter().enumerate() {
            let per_day = self.tracks.len() * self.regions.len();
            let start = day_offset * per_day;
            let day_records: Vec<StreamingRecord> = (start..start + per_day)
                .into_par_iter()
                .map(|i| {
                    let triple = self.triple_at(i);
                    let track = &self.tracks[triple.track_index];
                    let region = &self.regions[triple.region_index];
                    let mut rng = triple_rng(seed, date, &track.track_id, region);
                    let (streams, adds) = simulate_triple(model, track.popularity, date, &mut rng);
                    self.build_record(triple, streams, adds)
                })
                .collect();
            records.extend(day_records);

            pb.inc(1);
            log_progress("simulate", day_offset as u64 + 1, total_days, PROGRESS_INTERVAL_DAYS);
        }

        pb.finish_with_message(format!("Simulated {} records", records.len()));
        tracing::info!("Generated {} streaming records", records.len());
        records
    }
}
