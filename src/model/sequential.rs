//! Materialize stage descriptors into a `tch` sequential stack

use tch::{nn, Tensor};

use super::stages::{Activation, ConvKind, Norm, StageDescriptor};

/// Build the layers of every stage under `path`
///
/// Convolutions are bias-free; their variables live under
/// `{stage}_conv`, batch norms under `{stage}_bn`.
pub(crate) fn build_sequential(path: &nn::Path, stages: &[StageDescriptor]) -> nn::SequentialT {
    let mut seq = nn::seq_t();

    for stage in stages {
        let conv_path = path / stage.conv_name();
        seq = match stage.kind {
            ConvKind::Conv => seq.add(nn::conv2d(
                conv_path,
                stage.in_channels,
                stage.out_channels,
                stage.kernel,
                nn::ConvConfig {
                    stride: stage.stride,
                    padding: stage.padding,
                    bias: false,
                    ..Default::default()
                },
            )),
            ConvKind::ConvTranspose => seq.add(nn::conv_transpose2d(
                conv_path,
                stage.in_channels,
                stage.out_channels,
                stage.kernel,
                nn::ConvTransposeConfig {
                    stride: stage.stride,
                    padding: stage.padding,
                    bias: false,
                    ..Default::default()
                },
            )),
        };

        if let (Norm::BatchNorm, Some(name)) = (stage.norm, stage.norm_name()) {
            seq = seq.add(nn::batch_norm2d(path / name, stage.out_channels, Default::default()));
        }

        seq = match stage.activation {
            Activation::Identity => seq,
            Activation::Relu => seq.add_fn(|xs| xs.relu()),
            Activation::LeakyRelu(slope) => seq.add_fn(move |xs| leaky_relu(xs, slope)),
            Activation::Selu => seq.add_fn(|xs| xs.selu()),
            Activation::Tanh => seq.add_fn(|xs| xs.tanh()),
        };
    }

    seq
}

/// LeakyReLU with an explicit negative slope (< 1)
pub(crate) fn leaky_relu(xs: &Tensor, slope: f64) -> Tensor {
    xs.maximum(&(xs * slope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn test_leaky_relu_slope() {
        let xs = Tensor::from_slice(&[-1.0f32, 0.0, 2.0]);
        let ys = leaky_relu(&xs, 0.2);
        let values: Vec<f32> = Vec::<f32>::try_from(&ys).unwrap();
        assert!((values[0] + 0.2).abs() < 1e-6);
        assert_eq!(values[1], 0.0);
        assert_eq!(values[2], 2.0);
        assert_eq!(ys.kind(), Kind::Float);
        assert_eq!(ys.device(), Device::Cpu);
    }
}
