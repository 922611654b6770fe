//! Stage planning for the DCGAN generator and discriminator
//!
//! The depth of both networks follows from the image size. Planning is a pure
//! function producing a list of stage descriptors; the networks materialize
//! the list into a fixed sequence of layers.

use serde::Serialize;

use crate::utils::config::ModelConfig;

/// Kind of convolution used by a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConvKind {
    /// Downsampling convolution (discriminator)
    Conv,
    /// Upsampling transposed convolution (generator)
    ConvTranspose,
}

/// Normalization applied after the convolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Norm {
    None,
    BatchNorm,
}

/// Activation applied at the end of a stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Activation {
    Identity,
    Relu,
    LeakyRelu(f64),
    Selu,
    Tanh,
}

/// One convolution stage of a network
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageDescriptor {
    /// Variable-store prefix of the stage (`start`, `middle_1`, `end`, ...)
    pub name: String,
    pub kind: ConvKind,
    pub in_channels: i64,
    pub out_channels: i64,
    pub kernel: i64,
    pub stride: i64,
    pub padding: i64,
    pub norm: Norm,
    pub activation: Activation,
}

impl StageDescriptor {
    /// Variable-store name of the convolution
    pub fn conv_name(&self) -> String {
        format!("{}_conv", self.name)
    }

    /// Variable-store name of the batch norm, if any
    pub fn norm_name(&self) -> Option<String> {
        match self.norm {
            Norm::BatchNorm => Some(format!("{}_bn", self.name)),
            Norm::None => None,
        }
    }
}

impl std::fmt::Display for StageDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<10} {:?}({} -> {}, k={}, s={}, p={}) {:?} {:?}",
            self.name,
            self.kind,
            self.in_channels,
            self.out_channels,
            self.kernel,
            self.stride,
            self.padding,
            self.norm,
            self.activation
        )
    }
}

/// Number of stages of either network: `log2(image_size) - 1`
pub fn num_stages(image_size: i64) -> usize {
    if image_size < 2 {
        return 0;
    }
    (63 - image_size.leading_zeros() as usize).saturating_sub(1)
}

fn hidden_norm_and_activation(selu: bool, batch_norm: bool, activation: Activation) -> (Norm, Activation) {
    if selu {
        (Norm::None, Activation::Selu)
    } else if batch_norm {
        (Norm::BatchNorm, activation)
    } else {
        (Norm::None, activation)
    }
}

/// Plan the generator: latent `(z_size, 1, 1)` to `(n_colors, image_size, image_size)`
///
/// The hidden multiplier starts at `image_size / 8` and halves at every middle
/// stage; the last stage maps `g_h_size` channels to `n_colors` with tanh.
pub fn plan_generator(config: &ModelConfig) -> Vec<StageDescriptor> {
    let (norm, activation) = hidden_norm_and_activation(config.selu, true, Activation::Relu);
    let mut mult = config.image_size / 8;
    let mut stages = Vec::with_capacity(num_stages(config.image_size));

    // Size = (g_h_size * mult) x 4 x 4
    stages.push(StageDescriptor {
        name: "start".to_string(),
        kind: ConvKind::ConvTranspose,
        in_channels: config.z_size,
        out_channels: config.g_h_size * mult,
        kernel: 4,
        stride: 1,
        padding: 0,
        norm,
        activation,
    });

    let mut i = 1;
    while mult > 1 {
        stages.push(StageDescriptor {
            name: format!("middle_{i}"),
            kind: ConvKind::ConvTranspose,
            in_channels: config.g_h_size * mult,
            out_channels: config.g_h_size * (mult / 2),
            kernel: 4,
            stride: 2,
            padding: 1,
            norm,
            activation,
        });
        mult /= 2;
        i += 1;
    }

    // Size = g_h_size x image_size/2 x image_size/2
    stages.push(StageDescriptor {
        name: "end".to_string(),
        kind: ConvKind::ConvTranspose,
        in_channels: config.g_h_size,
        out_channels: config.n_colors,
        kernel: 4,
        stride: 2,
        padding: 1,
        norm: Norm::None,
        activation: Activation::Tanh,
    });

    stages
}

/// Plan the discriminator: `(n_colors, image_size, image_size)` to one score
///
/// Mirrors the generator: the hidden multiplier doubles until the feature map
/// is 4x4, then a 4x4 convolution produces the unbounded score.
/// `batch_norm` controls the middle stages only; the start stage never
/// normalizes.
pub fn plan_discriminator(config: &ModelConfig, batch_norm: bool) -> Vec<StageDescriptor> {
    let leaky = Activation::LeakyRelu(0.2);
    let start_activation = if config.selu { Activation::Selu } else { leaky };
    let (norm, activation) = hidden_norm_and_activation(config.selu, batch_norm, leaky);
    let mut stages = Vec::with_capacity(num_stages(config.image_size));

    stages.push(StageDescriptor {
        name: "start".to_string(),
        kind: ConvKind::Conv,
        in_channels: config.n_colors,
        out_channels: config.d_h_size,
        kernel: 4,
        stride: 2,
        padding: 1,
        norm: Norm::None,
        activation: start_activation,
    });

    let mut size = config.image_size / 2;
    let mut mult = 1;
    let mut i = 0;
    while size > 4 {
        stages.push(StageDescriptor {
            name: format!("middle_{i}"),
            kind: ConvKind::Conv,
            in_channels: config.d_h_size * mult,
            out_channels: config.d_h_size * 2 * mult,
            kernel: 4,
            stride: 2,
            padding: 1,
            norm,
            activation,
        });
        size /= 2;
        mult *= 2;
        i += 1;
    }

    // Size = (d_h_size * mult) x 4 x 4
    stages.push(StageDescriptor {
        name: "end".to_string(),
        kind: ConvKind::Conv,
        in_channels: config.d_h_size * mult,
        out_channels: 1,
        kernel: 4,
        stride: 1,
        padding: 0,
        norm: Norm::None,
        activation: Activation::Identity,
    });

    stages
}
