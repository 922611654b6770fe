//! Model module containing GAN architecture components
//!
//! This module provides:
//! - Stage plans derived from the image size
//! - Generator network mapping latent vectors to images
//! - Discriminator (critic) network scoring images
//! - `GanPair` owning both networks, building their optimizers and enforcing
//!   the freeze policy

mod discriminator;
mod gan;
mod generator;
mod init;
mod sequential;
mod stages;

pub use discriminator::Discriminator;
pub use gan::{GanPair, LoadReport, Phase};
pub use generator::Generator;
pub use init::{init_weights, INIT_STD};
pub use stages::{
    num_stages, plan_discriminator, plan_generator, Activation, ConvKind, Norm, StageDescriptor,
};
