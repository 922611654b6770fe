//! Data module providing real image batches
//!
//! This module provides:
//! - `ImageFolder` dataset decoding a class-per-folder image tree
//! - `EpochLoader` for shuffled sequential epochs (LSGAN)
//! - `RandomSampler` for endless without-replacement batches (WGAN-GP)

mod image_folder;
mod loader;
mod sampler;

pub use image_folder::{ImageFolder, IMAGE_EXTENSIONS};
pub use loader::EpochLoader;
pub use sampler::RandomSampler;

use tch::{Device, Kind, Tensor};

use crate::error::{GanError, Result};

/// Indexed collection of images that can be gathered into batches
pub trait Dataset {
    /// Number of images
    fn len(&self) -> usize;

    /// Check if empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gather `indices` into a (batch, channels, height, width) tensor on `device`
    fn get_batch(&self, indices: &[usize], device: Device) -> Result<Tensor>;
}

/// Dataset held in memory as one (N, C, H, W) tensor
#[derive(Debug)]
pub struct TensorDataset {
    images: Tensor,
}

impl TensorDataset {
    /// Wrap a (N, C, H, W) tensor
    pub fn new(images: Tensor) -> Result<Self> {
        if images.dim() != 4 {
            return Err(GanError::dataset(format!(
                "expected a (N, C, H, W) tensor, got shape {:?}",
                images.size()
            )));
        }
        Ok(Self { images })
    }
}

impl Dataset for TensorDataset {
    fn len(&self) -> usize {
        self.images.size()[0] as usize
    }

    fn get_batch(&self, indices: &[usize], device: Device) -> Result<Tensor> {
        let index: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
        let index = Tensor::from_slice(&index).to_kind(Kind::Int64).to_device(self.images.device());
        Ok(self.images.f_index_select(0, &index)?.to_device(device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_dataset_batch() {
        let images = Tensor::arange(6, (Kind::Float, Device::Cpu)).view([6, 1, 1, 1]);
        let data = TensorDataset::new(images).unwrap();
        assert_eq!(data.len(), 6);

        let batch = data.get_batch(&[5, 1], Device::Cpu).unwrap();
        assert_eq!(batch.size(), vec![2, 1, 1, 1]);
        assert_eq!(batch.view([-1]).double_value(&[0]), 5.0);
        assert_eq!(batch.view([-1]).double_value(&[1]), 1.0);
    }

    #[test]
    fn test_tensor_dataset_rejects_flat_tensor() {
        let images = Tensor::zeros([4, 8], (Kind::Float, Device::Cpu));
        assert!(TensorDataset::new(images).is_err());
    }

    #[test]
    fn test_out_of_range_index_is_error() {
        let images = Tensor::zeros([2, 1, 4, 4], (Kind::Float, Device::Cpu));
        let data = TensorDataset::new(images).unwrap();
        assert!(data.get_batch(&[3], Device::Cpu).is_err());
    }
}
