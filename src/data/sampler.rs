//! Endless random batches for iteration-based training
//!
//! Each batch draws `batch_size` distinct indices uniformly without
//! replacement; the population is reset for every draw.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use tch::{Device, Tensor};

use super::Dataset;
use crate::error::{GanError, Result};

/// Unbounded iterator of independently sampled batches
pub struct RandomSampler<D: Dataset> {
    dataset: D,
    batch_size: usize,
    rng: StdRng,
    device: Device,
}

impl<D: Dataset> RandomSampler<D> {
    /// Create a sampler
    ///
    /// Fails when the dataset holds fewer images than one batch.
    pub fn new(dataset: D, batch_size: usize, seed: u64, device: Device) -> Result<Self> {
        if batch_size == 0 || dataset.len() < batch_size {
            return Err(GanError::config(format!(
                "cannot draw {} distinct images from a dataset of {}",
                batch_size,
                dataset.len()
            )));
        }

        Ok(Self {
            dataset,
            batch_size,
            rng: StdRng::seed_from_u64(seed),
            device,
        })
    }

    /// Draw the indices of the next batch
    pub fn next_indices(&mut self) -> Vec<usize> {
        index::sample(&mut self.rng, self.dataset.len(), self.batch_size).into_vec()
    }
}

impl<D: Dataset> Iterator for RandomSampler<D> {
    type Item = Result<Tensor>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.next_indices();
        Some(self.dataset.get_batch(&indices, self.device))
    }
}
