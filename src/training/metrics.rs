//! Training metrics for monitoring GAN progress
//!
//! Scalar losses are streamed to a `step,tag,value` CSV file; step counters
//! and a smoothing tracker feed the console and progress bars.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Number of batches and optimizer steps taken so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCounts {
    /// Real batches fed to the discriminator
    pub real_batches: usize,
    /// Fake batches fed to the discriminator during its own updates
    pub fake_batches: usize,
    /// Discriminator optimizer steps
    pub disc_steps: usize,
    /// Generator optimizer steps
    pub gen_steps: usize,
}

/// One row of the scalar stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    /// Global step (batch index or iteration)
    pub step: usize,
    /// Scalar name, e.g. `errD`
    pub tag: String,
    /// Value at that step
    pub value: f64,
}

/// Append-only scalar log written as CSV
pub struct ScalarLog {
    writer: csv::Writer<File>,
}

impl ScalarLog {
    /// Create (or truncate) the CSV file at `path`
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }

    /// Record `value` under `tag` at `step`
    pub fn log(&mut self, step: usize, tag: &str, value: f64) -> Result<()> {
        self.writer.serialize(ScalarRecord {
            step,
            tag: tag.to_string(),
            value,
        })?;
        Ok(())
    }

    /// Flush buffered rows to disk
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Load every row of a scalar file
    pub fn load(path: &Path) -> Result<Vec<ScalarRecord>> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut records = Vec::new();
        for result in reader.deserialize() {
            records.push(result?);
        }
        Ok(records)
    }
}

/// Warn when a loss is NaN or infinite
///
/// Returns whether the value is finite. Training continues either way.
pub fn check_finite(step: usize, tag: &str, value: f64) -> bool {
    if value.is_finite() {
        return true;
    }
    warn!("Non-finite {} at step {}: {}", tag, step, value);
    false
}

/// Exponential moving average tracker
#[derive(Debug)]
pub struct EmaTracker {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl EmaTracker {
    /// Create new EMA tracker
    ///
    /// # Arguments
    ///
    /// * `alpha` - Smoothing factor (0 < alpha <= 1). Higher = more weight on recent
    pub fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha: alpha.clamp(0.001, 1.0),
            initialized: false,
        }
    }

    /// Update with new value, non-finite values are skipped
    pub fn update(&mut self, new_value: f64) {
        if !new_value.is_finite() {
            return;
        }
        if !self.initialized {
            self.value = new_value;
            self.initialized = true;
        } else {
            self.value = self.alpha * new_value + (1.0 - self.alpha) * self.value;
        }
    }

    /// Get current EMA value
    pub fn value(&self) -> f64 {
        self.value
    }
}
