//! Generator network for DCGAN
//!
//! The Generator transforms latent noise vectors into images.
//! Architecture uses transposed 2D convolutions to upsample from a 4x4 map.

use tch::{nn, nn::ModuleT, Device, Kind, Tensor};

use super::stages::{plan_generator, StageDescriptor};
use super::sequential::build_sequential;
use crate::utils::config::ModelConfig;

/// Generator network
///
/// Architecture:
/// 1. ConvTranspose2d from `(z_size, 1, 1)` to a 4x4 feature map
/// 2. Series of ConvTranspose2d layers, each doubling the resolution
/// 3. Final ConvTranspose2d to `n_colors` channels with Tanh activation
#[derive(Debug)]
pub struct Generator {
    z_size: i64,
    stages: Vec<StageDescriptor>,
    net: nn::SequentialT,
}

impl Generator {
    /// Create a new Generator network
    pub fn new(vs: &nn::Path, config: ModelConfig) -> Self {
        let stages = plan_generator(&config);
        let net = build_sequential(vs, &stages);

        Self {
            z_size: config.z_size,
            stages,
            net,
        }
    }

    /// Generate images from latent vectors
    ///
    /// # Arguments
    ///
    /// * `latent` - Tensor of shape (batch_size, z_size, 1, 1)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, n_colors, image_size, image_size) in [-1, 1]
    pub fn forward_t(&self, latent: &Tensor, train: bool) -> Tensor {
        self.net.forward_t(latent, train)
    }

    /// Sample a latent batch of shape (batch_size, z_size, 1, 1) from N(0, 1)
    pub fn sample_latent(&self, batch_size: i64, device: Device) -> Tensor {
        Tensor::randn([batch_size, self.z_size, 1, 1], (Kind::Float, device))
    }

    /// Stage plan this network was built from
    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }
}

impl ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Generator::forward_t(self, xs, train)
    }
}
