//! DataLoader for epoch-based training
//!
//! Provides batching for LSGAN training with support for:
//! - Reshuffling every epoch from a seeded generator
//! - A short final batch when the dataset size is not a multiple of the batch size
//! - Iteration over batches

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tch::{Device, Tensor};

use super::Dataset;
use crate::error::Result;

/// Sequential batches over a dataset, one full pass per epoch
pub struct EpochLoader<D: Dataset> {
    dataset: D,
    /// Batch size
    batch_size: usize,
    /// Whether to shuffle data each epoch
    shuffle: bool,
    /// Current indices for iteration
    indices: Vec<usize>,
    /// Current position in iteration
    current_idx: usize,
    rng: StdRng,
    device: Device,
}

impl<D: Dataset> EpochLoader<D> {
    /// Create a new loader
    ///
    /// # Arguments
    ///
    /// * `dataset` - Images to iterate over
    /// * `batch_size` - Number of images per batch
    /// * `shuffle` - Whether to shuffle data each epoch
    /// * `seed` - Seed of the shuffling generator
    /// * `device` - Device receiving the batches
    pub fn new(dataset: D, batch_size: usize, shuffle: bool, seed: u64, device: Device) -> Self {
        let indices: Vec<usize> = (0..dataset.len()).collect();

        let mut loader = Self {
            dataset,
            batch_size: batch_size.max(1),
            shuffle,
            indices,
            current_idx: 0,
            rng: StdRng::seed_from_u64(seed),
            device,
        };

        if shuffle {
            loader.shuffle_indices();
        }

        loader
    }

    /// Get the number of batches per epoch, including a short final batch
    pub fn num_batches(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }

    /// Get total number of samples
    pub fn num_samples(&self) -> usize {
        self.indices.len()
    }

    /// Shuffle indices for a new epoch
    fn shuffle_indices(&mut self) {
        self.indices.shuffle(&mut self.rng);
    }

    /// Reset for new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;
        if self.shuffle {
            self.shuffle_indices();
        }
    }

    /// Indices of the next batch, `None` when the epoch is complete
    pub fn next_indices(&mut self) -> Option<Vec<usize>> {
        let start = self.current_idx;
        if start >= self.indices.len() {
            return None;
        }

        let end = (start + self.batch_size).min(self.indices.len());
        self.current_idx = end;
        Some(self.indices[start..end].to_vec())
    }

    /// Get next batch
    ///
    /// Returns None when epoch is complete
    pub fn next_batch(&mut self) -> Option<Result<Tensor>> {
        let indices = self.next_indices()?;
        Some(self.dataset.get_batch(&indices, self.device))
    }

    /// Start a new epoch and iterate over its batches
    pub fn epoch(&mut self) -> EpochIter<'_, D> {
        self.reset();
        EpochIter { loader: self }
    }
}

/// Iterator adapter over the batches of one epoch
pub struct EpochIter<'a, D: Dataset> {
    loader: &'a mut EpochLoader<D>,
}

impl<D: Dataset> Iterator for EpochIter<'_, D> {
    type Item = Result<Tensor>;

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TensorDataset;
    use tch::Kind;

    fn dataset(n: i64) -> TensorDataset {
        let images = Tensor::arange(n, (Kind::Float, Device::Cpu)).view([n, 1, 1, 1]);
        TensorDataset::new(images).unwrap()
    }

    #[test]
    fn test_short_final_batch() {
        let mut loader = EpochLoader::new(dataset(10), 3, false, 0, Device::Cpu);

        assert_eq!(loader.num_batches(), 4); // ceil(10/3) = 4
        assert_eq!(loader.num_samples(), 10);

        let sizes: Vec<i64> = loader.epoch().map(|b| b.unwrap().size()[0]).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
    }

    #[test]
    fn test_epoch_covers_every_sample_once() {
        let mut loader = EpochLoader::new(dataset(10), 4, true, 7, Device::Cpu);

        for _ in 0..3 {
            let mut seen: Vec<i64> = loader
                .epoch()
                .flat_map(|b| Vec::<f32>::try_from(&b.unwrap().view([-1])).unwrap())
                .map(|v| v as i64)
                .collect();
            seen.sort();
            assert_eq!(seen, (0..10).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_reshuffles_every_epoch() {
        let mut loader = EpochLoader::new(dataset(50), 50, true, 3, Device::Cpu);

        let first = loader.next_indices().unwrap();
        loader.reset();
        let second = loader.next_indices().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_same_seed_same_order() {
        let mut a = EpochLoader::new(dataset(20), 5, true, 11, Device::Cpu);
        let mut b = EpochLoader::new(dataset(20), 5, true, 11, Device::Cpu);
        assert_eq!(a.next_indices(), b.next_indices());
    }
}
