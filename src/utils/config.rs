//! Configuration management
//!
//! One immutable record holds every hyperparameter of a run. It is built from
//! defaults, an optional TOML/JSON file and command line overrides, validated
//! once and then only read.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GanError, Result};

/// GAN variant being trained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Least-squares GAN
    Lsgan,
    /// Wasserstein GAN with gradient penalty
    WganGp,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Lsgan => write!(f, "LSGAN"),
            Variant::WganGp => write!(f, "WGAN-GP"),
        }
    }
}

impl std::str::FromStr for Variant {
    type Err = GanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "lsgan" => Ok(Variant::Lsgan),
            "wgan-gp" | "wgan_gp" | "wgangp" => Ok(Variant::WganGp),
            other => Err(GanError::config(format!("unknown variant '{other}'"))),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Network architecture
    pub model: ModelConfig,
    /// Dataset and batching
    pub data: DataConfig,
    /// Adam settings for both networks
    pub optim: OptimConfig,
    /// LSGAN schedule and target labels
    pub lsgan: LsganConfig,
    /// WGAN-GP schedule and penalty
    pub wgan_gp: WganGpConfig,
    /// Seed, folders, checkpoints and device
    pub run: RunConfig,
}

/// Architecture of the generator and discriminator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Side of the square images, a power of two >= 8
    pub image_size: i64,
    /// Number of image channels (1 or 3)
    pub n_colors: i64,
    /// Length of the latent vector
    pub z_size: i64,
    /// Hidden width of the generator
    pub g_h_size: i64,
    /// Hidden width of the discriminator
    pub d_h_size: i64,
    /// Use SELU instead of BatchNorm + ReLU/LeakyReLU
    pub selu: bool,
}

/// Data-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Folder with one subfolder per class
    pub input_folder: String,
    /// Batch size
    pub batch_size: usize,
    /// Threads used to decode images
    pub n_workers: usize,
}

/// Optimizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimConfig {
    /// Discriminator learning rate
    pub lr_d: f64,
    /// Generator learning rate
    pub lr_g: f64,
    /// Adam beta1
    pub beta1: f64,
    /// Adam beta2
    pub beta2: f64,
    /// L2 regularization weight
    pub weight_decay: f64,
}

/// LSGAN-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LsganConfig {
    /// Number of epochs
    pub n_epoch: usize,
    /// Target label for fakes in the discriminator loss
    pub a: f64,
    /// Target label for reals in the discriminator loss
    pub b: f64,
    /// Target label for fakes in the generator loss
    pub c: f64,
    /// Save models every N epochs
    pub checkpoint_every: usize,
    /// Print losses every N batches
    pub log_every: usize,
}

/// WGAN-GP-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WganGpConfig {
    /// Number of generator iterations
    pub n_iter: usize,
    /// Critic updates per generator update
    pub n_critic: usize,
    /// Gradient penalty coefficient
    pub penalty: f64,
    /// Save sample images every N iterations
    pub image_every: usize,
    /// Save models every N iterations
    pub checkpoint_every: usize,
    /// Print losses every N iterations
    pub log_every: usize,
}

/// Run-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Random seed, drawn at start when absent
    pub seed: Option<u64>,
    /// Parent folder of the `run-N` directories
    pub output_folder: String,
    /// Generator checkpoint to load
    pub g_load: Option<String>,
    /// Discriminator checkpoint to load
    pub d_load: Option<String>,
    /// Train on CUDA when available
    pub cuda: bool,
    /// Number of GPUs requested
    pub n_gpu: usize,
    /// Extra sample grids saved with each sample image
    pub gen_extra_images: usize,
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            image_size: 64,
            n_colors: 3,
            z_size: 100,
            g_h_size: 128,
            d_h_size: 128,
            selu: false,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input_folder: "./images".to_string(),
            batch_size: 64,
            n_workers: 2,
        }
    }
}

impl OptimConfig {
    /// Adam settings for LSGAN (DCGAN betas)
    pub fn lsgan() -> Self {
        Self {
            lr_d: 1e-4,
            lr_g: 1e-4,
            beta1: 0.5,
            beta2: 0.999,
            weight_decay: 0.0,
        }
    }

    /// Adam settings for WGAN-GP
    pub fn wgan_gp() -> Self {
        Self {
            lr_d: 1e-4,
            lr_g: 1e-4,
            beta1: 0.0,
            beta2: 0.9,
            weight_decay: 0.0,
        }
    }
}

impl Default for LsganConfig {
    fn default() -> Self {
        Self {
            n_epoch: 1000,
            a: 0.0,
            b: 1.0,
            c: 1.0,
            checkpoint_every: 25,
            log_every: 50,
        }
    }
}

impl Default for WganGpConfig {
    fn default() -> Self {
        Self {
            n_iter: 100_000,
            n_critic: 5,
            penalty: 10.0,
            image_every: 50,
            checkpoint_every: 500,
            log_every: 50,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            output_folder: "./output".to_string(),
            g_load: None,
            d_load: None,
            cuda: true,
            n_gpu: 1,
            gen_extra_images: 0,
            log_level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::for_variant(Variant::Lsgan)
    }
}

impl Config {
    /// Default configuration for a variant
    pub fn for_variant(variant: Variant) -> Self {
        let optim = match variant {
            Variant::Lsgan => OptimConfig::lsgan(),
            Variant::WganGp => OptimConfig::wgan_gp(),
        };

        Self {
            model: ModelConfig::default(),
            data: DataConfig::default(),
            optim,
            lsgan: LsganConfig::default(),
            wgan_gp: WganGpConfig::default(),
            run: RunConfig::default(),
        }
    }

    /// Load configuration from TOML file
    pub fn from_toml(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_toml(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from a `.toml` or `.json` file, or fall back to the variant defaults
    pub fn load_or_default(path: Option<&str>, variant: Variant) -> Result<Self> {
        match path {
            Some(path) if Path::new(path).exists() => {
                if path.ends_with(".toml") {
                    Self::from_toml(path)
                } else {
                    Self::from_json(path)
                }
            }
            Some(path) => Err(GanError::config(format!("config file {path} not found"))),
            None => Ok(Self::for_variant(variant)),
        }
    }

    /// Save to `.toml` or `.json` depending on the extension
    pub fn save(&self, path: &str) -> Result<()> {
        if path.ends_with(".toml") {
            self.save_toml(path)
        } else {
            self.save_json(path)
        }
    }

    /// Get device from configuration
    pub fn get_device(&self) -> tch::Device {
        if !self.run.cuda {
            return tch::Device::Cpu;
        }
        if !tch::Cuda::is_available() {
            tracing::warn!("CUDA requested but not available, falling back to CPU");
            return tch::Device::Cpu;
        }

        let available = tch::Cuda::device_count() as usize;
        if self.run.n_gpu > 1 {
            tracing::warn!(
                "{} GPUs requested ({} available): data parallelism is not supported, training on cuda:0",
                self.run.n_gpu,
                available
            );
        }
        tch::Cuda::cudnn_set_benchmark(true);
        tch::Device::Cuda(0)
    }

    /// Validate configuration
    pub fn validate(&self, variant: Variant) -> Result<()> {
        validate_image_size(self.model.image_size)?;
        if !(self.model.n_colors == 1 || self.model.n_colors == 3) {
            return Err(GanError::config(format!(
                "n_colors must be 1 or 3, got {}",
                self.model.n_colors
            )));
        }
        if self.model.z_size <= 0 {
            return Err(GanError::config("z_size must be > 0"));
        }
        if self.model.g_h_size <= 0 || self.model.d_h_size <= 0 {
            return Err(GanError::config("hidden sizes must be > 0"));
        }
        if self.data.batch_size == 0 {
            return Err(GanError::config("batch_size must be > 0"));
        }
        if self.data.n_workers == 0 {
            return Err(GanError::config("n_workers must be > 0"));
        }
        if self.optim.lr_d <= 0.0 || self.optim.lr_g <= 0.0 {
            return Err(GanError::config("learning rates must be > 0"));
        }
        if !(0.0..1.0).contains(&self.optim.beta1) || !(0.0..1.0).contains(&self.optim.beta2) {
            return Err(GanError::config("Adam betas must be in [0, 1)"));
        }

        match variant {
            Variant::Lsgan => {
                if self.lsgan.n_epoch == 0 {
                    return Err(GanError::config("n_epoch must be > 0"));
                }
                if self.lsgan.checkpoint_every == 0 || self.lsgan.log_every == 0 {
                    return Err(GanError::config("LSGAN intervals must be > 0"));
                }
            }
            Variant::WganGp => {
                if self.wgan_gp.n_iter == 0 {
                    return Err(GanError::config("n_iter must be > 0"));
                }
                if self.wgan_gp.n_critic == 0 {
                    return Err(GanError::config("n_critic must be > 0"));
                }
                if self.wgan_gp.penalty < 0.0 {
                    return Err(GanError::config("penalty must be >= 0"));
                }
                if self.wgan_gp.image_every == 0
                    || self.wgan_gp.checkpoint_every == 0
                    || self.wgan_gp.log_every == 0
                {
                    return Err(GanError::config("WGAN-GP intervals must be > 0"));
                }
            }
        }
        Ok(())
    }
}

/// Check that `image_size` is a power of two of at least 8
///
/// Smaller or non power-of-two sizes give degenerate layer counts.
pub fn validate_image_size(image_size: i64) -> Result<()> {
    if image_size < 8 || (image_size & (image_size - 1)) != 0 {
        return Err(GanError::config(format!(
            "image_size must be a power of two >= 8, got {image_size}"
        )));
    }
    Ok(())
}
