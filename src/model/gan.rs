//! GAN wrapper combining Generator and Discriminator
//!
//! Owns both variable stores and enforces that only one network is trainable
//! at a time.

use std::collections::HashMap;
use std::path::Path;

use tch::{nn, nn::OptimizerConfig, nn::VarStore, Device, Tensor};
use tracing::{info, warn};

use super::discriminator::Discriminator;
use super::generator::Generator;
use super::init::init_weights;
use crate::error::{GanError, Result};
use crate::utils::config::{ModelConfig, OptimConfig};

/// Which network the next update is allowed to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Discriminator trainable, generator frozen
    Discriminator,
    /// Generator trainable, discriminator frozen
    Generator,
}

/// Outcome of copying a checkpoint into a variable store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Variables of the network absent from the file, left at their current values
    pub missing: Vec<String>,
    /// Variables of the file the network does not have, ignored
    pub unused: Vec<String>,
}

impl LoadReport {
    /// Every variable on both sides was matched
    pub fn is_exact(&self) -> bool {
        self.missing.is_empty() && self.unused.is_empty()
    }
}

/// Generator/discriminator pair with their variable stores
pub struct GanPair {
    /// Generator network
    pub generator: Generator,
    /// Discriminator network
    pub discriminator: Discriminator,
    /// Variable store for generator
    pub gen_vs: VarStore,
    /// Variable store for discriminator
    pub disc_vs: VarStore,
    /// Device (CPU/GPU)
    pub device: Device,
}

impl GanPair {
    /// Build both networks and apply the DCGAN weight init
    ///
    /// # Arguments
    ///
    /// * `config` - Architecture shared by both networks
    /// * `disc_batch_norm` - BatchNorm in the discriminator middle stages
    /// * `device` - Device to create model on
    pub fn new(config: &ModelConfig, disc_batch_norm: bool, device: Device) -> Self {
        let gen_vs = VarStore::new(device);
        let disc_vs = VarStore::new(device);

        let generator = Generator::new(&gen_vs.root(), config.clone());
        let discriminator = Discriminator::new(&disc_vs.root(), config.clone(), disc_batch_norm);

        init_weights(&gen_vs, generator.stages());
        init_weights(&disc_vs, discriminator.stages());

        Self {
            generator,
            discriminator,
            gen_vs,
            disc_vs,
            device,
        }
    }

    /// Adam optimizer over the generator parameters
    pub fn gen_optimizer(&self, optim: &OptimConfig) -> Result<nn::Optimizer> {
        Ok(adam(optim).build(&self.gen_vs, optim.lr_g)?)
    }

    /// Adam optimizer over the discriminator parameters
    pub fn disc_optimizer(&self, optim: &OptimConfig) -> Result<nn::Optimizer> {
        Ok(adam(optim).build(&self.disc_vs, optim.lr_d)?)
    }

    /// Make exactly one network trainable
    pub fn enter(&mut self, phase: Phase) {
        match phase {
            Phase::Discriminator => {
                self.gen_vs.freeze();
                self.disc_vs.unfreeze();
            }
            Phase::Generator => {
                self.disc_vs.freeze();
                self.gen_vs.unfreeze();
            }
        }
    }

    /// Whether every generator parameter requires gradients
    pub fn generator_trainable(&self) -> bool {
        all_trainable(&self.gen_vs)
    }

    /// Whether every discriminator parameter requires gradients
    pub fn discriminator_trainable(&self) -> bool {
        all_trainable(&self.disc_vs)
    }

    /// Generate images without tracking gradients
    pub fn generate(&self, latent: &Tensor) -> Tensor {
        tch::no_grad(|| self.generator.forward_t(latent, true))
    }

    /// Save model checkpoints
    pub fn save(&self, gen_path: &Path, disc_path: &Path) -> Result<()> {
        self.gen_vs.save(gen_path)?;
        self.disc_vs.save(disc_path)?;
        Ok(())
    }

    /// Load generator weights, keeping initialized values for absent layers
    pub fn load_generator(&mut self, path: &Path) -> Result<LoadReport> {
        load_partial(&mut self.gen_vs, path, "generator")
    }

    /// Load discriminator weights, keeping initialized values for absent layers
    pub fn load_discriminator(&mut self, path: &Path) -> Result<LoadReport> {
        load_partial(&mut self.disc_vs, path, "discriminator")
    }

    /// Log the stage plan of both networks
    pub fn log_architecture(&self) {
        info!("Generator ({} stages):", self.generator.stages().len());
        for stage in self.generator.stages() {
            info!("  {}", stage);
        }
        info!("Discriminator ({} stages):", self.discriminator.stages().len());
        for stage in self.discriminator.stages() {
            info!("  {}", stage);
        }
    }
}

fn adam(optim: &OptimConfig) -> nn::Adam {
    nn::Adam {
        beta1: optim.beta1,
        beta2: optim.beta2,
        wd: optim.weight_decay,
        ..Default::default()
    }
}

fn all_trainable(vs: &VarStore) -> bool {
    vs.trainable_variables().iter().all(|t| t.requires_grad())
}

/// Copy every variable found in `path` into `vs`
///
/// Variables absent from the file keep their current values, variables
/// only present in the file are skipped. Both lists are reported. A
/// variable present with a different shape is an error.
fn load_partial(vs: &mut VarStore, path: &Path, network: &str) -> Result<LoadReport> {
    let mut stored: HashMap<String, Tensor> = Tensor::load_multi(path)?.into_iter().collect();
    let mut missing = Vec::new();

    for (name, mut var) in vs.variables() {
        let Some(src) = stored.remove(&name) else {
            missing.push(name);
            continue;
        };
        if src.size() != var.size() {
            return Err(GanError::config(format!(
                "{} checkpoint {}: {} has shape {:?}, expected {:?}",
                network,
                path.display(),
                name,
                src.size(),
                var.size()
            )));
        }
        tch::no_grad(|| var.f_copy_(&src))?;
    }
    missing.sort();
    let mut unused: Vec<String> = stored.into_keys().collect();
    unused.sort();

    if !missing.is_empty() {
        warn!(
            "Loaded {} from {}, {} variables kept their initial values: {:?}",
            network,
            path.display(),
            missing.len(),
            missing
        );
    }
    if !unused.is_empty() {
        warn!(
            "{} variables in {} have no counterpart in the {} and were skipped: {:?}",
            unused.len(),
            path.display(),
            network,
            unused
        );
    }
    if missing.is_empty() && unused.is_empty() {
        info!("Loaded {} from {}", network, path.display());
    }
    Ok(LoadReport { missing, unused })
}
