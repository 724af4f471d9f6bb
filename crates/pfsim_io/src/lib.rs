//! CSV export of per-tick host readouts. Ambient tabular-export concern,
//! separate from `pfsim_core`'s no-I/O simulation state machine — mirrors
//! the teacher's own `DataExporter`/`csv_exporter` split.

mod csv_exporter;

pub use csv_exporter::*;

use std::path::{Path, PathBuf};
use thiserror::Error;

use pfsim_core::HostSnapshot;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("empty buffer: {0}")]
    EmptyBuffer(&'static str),
}

pub type IoResult<T> = Result<T, IoError>;

/// One exportable row: a [`HostSnapshot`] flattened with the run-local
/// bookkeeping (host id, tick, elapsed time) the core itself doesn't track.
#[derive(Debug, Clone)]
pub struct HostSnapshotRow {
    pub host_id: u64,
    pub step: u64,
    pub time: f64,
    pub age_days: f64,
    pub n_infections: usize,
    pub parasite_density: f64,
    pub gametocyte_density: f64,
    pub fever_celsius: f64,
    pub infectiousness: f64,
    pub rbc_availability: f64,
}

impl HostSnapshotRow {
    pub fn from_snapshot(host_id: u64, step: u64, time: f64, snapshot: &HostSnapshot) -> Self {
        Self {
            host_id,
            step,
            time,
            age_days: snapshot.age_days,
            n_infections: snapshot.n_infections,
            parasite_density: snapshot.parasite_density,
            gametocyte_density: snapshot.gametocyte_density,
            fever_celsius: snapshot.fever_celsius,
            infectiousness: snapshot.infectiousness,
            rbc_availability: snapshot.rbc_availability,
        }
    }

    pub fn csv_headers() -> Vec<String> {
        vec![
            "host_id".to_string(),
            "step".to_string(),
            "time".to_string(),
            "age_days".to_string(),
            "n_infections".to_string(),
            "parasite_density".to_string(),
            "gametocyte_density".to_string(),
            "fever_celsius".to_string(),
            "infectiousness".to_string(),
            "rbc_availability".to_string(),
        ]
    }

    pub fn to_csv_record(&self) -> Vec<String> {
        vec![
            self.host_id.to_string(),
            self.step.to_string(),
            format!("{:.6}", self.time),
            format!("{:.6}", self.age_days),
            self.n_infections.to_string(),
            format!("{:.6}", self.parasite_density),
            format!("{:.6}", self.gametocyte_density),
            format!("{:.6}", self.fever_celsius),
            format!("{:.6}", self.infectiousness),
            format!("{:.6}", self.rbc_availability),
        ]
    }
}

/// Buffers [`HostSnapshotRow`]s across ticks and flushes them to a numbered
/// CSV file per snapshot, exactly as the teacher's `DataExporter` does for
/// cell-component rows.
pub struct DataExporter {
    output_dir: PathBuf,
    prefix: String,
    buffer: Vec<HostSnapshotRow>,
}

impl DataExporter {
    pub fn new(output_dir: impl AsRef<Path>, prefix: &str) -> Self {
        let output_dir = output_dir.as_ref().to_path_buf();
        let _ = std::fs::create_dir_all(&output_dir);

        Self {
            output_dir,
            prefix: prefix.to_string(),
            buffer: Vec::new(),
        }
    }

    pub fn collect(&mut self, host_id: u64, step: u64, time: f64, snapshot: &HostSnapshot) {
        self.buffer.push(HostSnapshotRow::from_snapshot(host_id, step, time, snapshot));
    }

    pub fn save_snapshot(&mut self, step: u64) -> IoResult<PathBuf> {
        if self.buffer.is_empty() {
            return Err(IoError::EmptyBuffer("no data collected for this snapshot"));
        }

        let csv_path = self.output_dir.join(format!("{}_step_{:06}.csv", self.prefix, step));
        csv_exporter::write_csv(&csv_path, &self.buffer)?;
        self.buffer.clear();

        Ok(csv_path)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
