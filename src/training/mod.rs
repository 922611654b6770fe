//! Training module for LSGAN and WGAN-GP
//!
//! This module provides:
//! - Loss functions (least squares, Wasserstein, gradient penalty)
//! - The two training loops with their update steps
//! - Scalar logging and step counters

mod losses;
mod lsgan;
mod metrics;
mod samples;
mod wgan_gp;

pub use losses::{
    critic_score, gradient_penalty, lsgan_discriminator_loss, lsgan_generator_loss, lsgan_loss,
    wasserstein_distance,
};
pub use lsgan::{LsganLosses, LsganTrainer};
pub use metrics::{check_finite, EmaTracker, ScalarLog, ScalarRecord, StepCounts};
pub use samples::save_samples;
pub use wgan_gp::{CriticLosses, WganGpLosses, WganGpTrainer};
