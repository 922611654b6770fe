//! DCGAN weight initialization
//!
//! Convolution weights ~ N(0, 0.02), BatchNorm weights ~ N(1, 0.02),
//! BatchNorm biases = 0.

use tch::nn::{Init, VarStore};

use super::stages::StageDescriptor;

/// Standard deviation used for every random init
pub const INIT_STD: f64 = 0.02;

/// Apply the DCGAN init policy to the layers of `stages` stored in `vs`
///
/// Must run before loading a checkpoint so that loaded layers win.
/// Running statistics of batch norms are left alone.
pub fn init_weights(vs: &VarStore, stages: &[StageDescriptor]) {
    let variables = vs.variables();

    tch::no_grad(|| {
        for stage in stages {
            if let Some(weight) = variables.get(&format!("{}.weight", stage.conv_name())) {
                let mut weight = weight.shallow_clone();
                Init::Randn { mean: 0.0, stdev: INIT_STD }.set(&mut weight);
            }

            let Some(norm) = stage.norm_name() else { continue };
            if let Some(weight) = variables.get(&format!("{norm}.weight")) {
                let mut weight = weight.shallow_clone();
                Init::Randn { mean: 1.0, stdev: INIT_STD }.set(&mut weight);
            }
            if let Some(bias) = variables.get(&format!("{norm}.bias")) {
                let mut bias = bias.shallow_clone();
                Init::Const(0.0).set(&mut bias);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Discriminator, Generator};
    use crate::utils::config::ModelConfig;
    use tch::{Device, Kind};

    fn config() -> ModelConfig {
        ModelConfig {
            image_size: 16,
            n_colors: 3,
            z_size: 100,
            g_h_size: 64,
            d_h_size: 64,
            selu: false,
        }
    }

    #[test]
    fn test_conv_init_statistics() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), config());
        init_weights(&vs, gen.stages());

        // 100 x 128 x 4 x 4 = 204800 elements
        let weight = &vs.variables()["start_conv.weight"];
        assert!(weight.numel() >= 10_000);
        let mean = weight.mean(Kind::Float).double_value(&[]);
        let std = weight.std(true).double_value(&[]);
        assert!(mean.abs() < 1e-3, "mean {mean}");
        assert!((std - INIT_STD).abs() < 1e-3, "std {std}");
        assert!(weight.requires_grad());
    }

    #[test]
    fn test_batch_norm_init() {
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), config(), true);
        init_weights(&vs, disc.stages());

        let variables = vs.variables();
        let weight = &variables["middle_0_bn.weight"];
        let bias = &variables["middle_0_bn.bias"];
        let mean = weight.mean(Kind::Float).double_value(&[]);
        assert!((mean - 1.0).abs() < 0.02, "mean {mean}");
        assert_eq!(bias.abs().max().double_value(&[]), 0.0);

        // running statistics keep their defaults
        let running_var = &variables["middle_0_bn.running_var"];
        assert_eq!(running_var.mean(Kind::Float).double_value(&[]), 1.0);
    }
}
