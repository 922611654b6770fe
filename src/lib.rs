//! # LSGAN and WGAN-GP on image folders
//!
//! This crate trains a DCGAN-style generator/discriminator pair on a folder
//! of images with one of two recipes: least-squares GAN (epoch-based) or
//! Wasserstein GAN with gradient penalty (iteration-based).
//!
//! ## Modules
//!
//! - `data`: Image folder dataset, epoch loader and random batch sampler
//! - `model`: Stage plans, Generator, Discriminator and the freeze policy
//! - `training`: Loss functions and the two training loops
//! - `utils`: Configuration, run directory, checkpoints, logging and sample grids

pub mod data;
pub mod error;
pub mod model;
pub mod training;
pub mod utils;

pub use data::{Dataset, EpochLoader, ImageFolder, RandomSampler, TensorDataset};
pub use error::{GanError, Result};
pub use model::{Discriminator, GanPair, Generator, Phase};
pub use training::{LsganTrainer, StepCounts, WganGpTrainer};
pub use utils::{Config, RunDirectory, Variant};
