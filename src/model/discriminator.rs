//! Discriminator network for DCGAN
//!
//! The Discriminator (critic for WGAN-GP) scores images for realness.
//! Architecture uses strided 2D convolutions to downsample to a 4x4 map.

use tch::{nn, nn::ModuleT, Tensor};

use super::stages::{plan_discriminator, StageDescriptor};
use super::sequential::build_sequential;
use crate::utils::config::ModelConfig;

/// Discriminator network
///
/// Architecture:
/// 1. Conv2d halving the resolution, without normalization
/// 2. Series of Conv2d layers until the feature map is 4x4
/// 3. 4x4 Conv2d to a single unbounded score (no sigmoid)
#[derive(Debug)]
pub struct Discriminator {
    stages: Vec<StageDescriptor>,
    net: nn::SequentialT,
}

impl Discriminator {
    /// Create a new Discriminator network
    ///
    /// `batch_norm` enables BatchNorm in the middle stages. The gradient
    /// penalty needs per-sample gradients, so the WGAN-GP critic is built
    /// without it.
    pub fn new(vs: &nn::Path, config: ModelConfig, batch_norm: bool) -> Self {
        let stages = plan_discriminator(&config, batch_norm);
        let net = build_sequential(vs, &stages);

        Self { stages, net }
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `input` - Tensor of shape (batch_size, n_colors, image_size, image_size)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size,) with unbounded scores
    pub fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        self.net.forward_t(input, train).view([-1])
    }

    /// Stage plan this network was built from
    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }
}

impl ModuleT for Discriminator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Discriminator::forward_t(self, xs, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device, Kind};

    fn config(image_size: i64) -> ModelConfig {
        ModelConfig {
            image_size,
            n_colors: 1,
            z_size: 16,
            g_h_size: 8,
            d_h_size: 8,
            selu: false,
        }
    }

    #[test]
    fn test_discriminator_output_shape() {
        for image_size in [8, 16, 32, 64] {
            for batch_norm in [true, false] {
                let vs = VarStore::new(Device::Cpu);
                let disc = Discriminator::new(&vs.root(), config(image_size), batch_norm);

                let input = Tensor::randn([4, 1, image_size, image_size], (Kind::Float, Device::Cpu));
                let output = disc.forward_t(&input, true);

                assert_eq!(output.size(), vec![4]);
            }
        }
    }

    #[test]
    fn test_critic_has_no_batch_norm() {
        let vs = VarStore::new(Device::Cpu);
        let _disc = Discriminator::new(&vs.root(), config(32), false);

        assert!(vs.variables().keys().all(|name| !name.contains("_bn")));
    }
}
