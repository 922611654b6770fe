//! Least-squares GAN training
//!
//! Epoch-based loop with one discriminator update followed by one generator
//! update per real batch. The generator runs once per batch and both updates
//! score the same fakes.

use std::path::Path;

use tch::{nn, Device, Tensor};
use tracing::info;

use super::losses::{lsgan_discriminator_loss, lsgan_generator_loss};
use super::metrics::{check_finite, EmaTracker, ScalarLog, StepCounts};
use super::samples::{progress_bar, save_samples};
use crate::data::{Dataset, EpochLoader};
use crate::error::Result;
use crate::model::{GanPair, Phase};
use crate::utils::checkpoint::{save_checkpoint, CheckpointMeta};
use crate::utils::config::{Config, Variant};
use crate::utils::run_dir::RunDirectory;

/// Losses of one LSGAN step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LsganLosses {
    /// Discriminator loss (real + fake)
    pub err_d: f64,
    /// Generator loss
    pub err_g: f64,
}

/// LSGAN trainer owning the networks, optimizers and fixed latent
pub struct LsganTrainer {
    config: Config,
    gan: GanPair,
    gen_opt: nn::Optimizer,
    disc_opt: nn::Optimizer,
    /// Latent batch reused for every sample grid
    fixed_latent: Tensor,
    counts: StepCounts,
}

impl LsganTrainer {
    /// Build networks and optimizers, loading `g_load`/`d_load` when set
    pub fn new(config: Config, device: Device) -> Result<Self> {
        let mut gan = GanPair::new(&config.model, true, device);

        if let Some(path) = &config.run.g_load {
            gan.load_generator(Path::new(path))?;
        }
        if let Some(path) = &config.run.d_load {
            gan.load_discriminator(Path::new(path))?;
        }

        let gen_opt = gan.gen_optimizer(&config.optim)?;
        let disc_opt = gan.disc_optimizer(&config.optim)?;
        let fixed_latent = gan.generator.sample_latent(config.data.batch_size as i64, device);

        Ok(Self {
            config,
            gan,
            gen_opt,
            disc_opt,
            fixed_latent,
            counts: StepCounts::default(),
        })
    }

    /// Fakes for `latent`, keeping the graph back into the generator
    pub fn generate_fakes(&mut self, latent: &Tensor) -> Tensor {
        self.gan.enter(Phase::Generator);
        self.gan.generator.forward_t(latent, true)
    }

    /// One discriminator update
    ///
    /// Real scores are pulled towards `b`, fake scores towards `a`. The fakes
    /// are detached so nothing flows back into the generator.
    pub fn discriminator_step(&mut self, real: &Tensor, fake: &Tensor) -> f64 {
        self.gan.enter(Phase::Discriminator);

        let real_output = self.gan.discriminator.forward_t(real, true);
        let fake_output = self.gan.discriminator.forward_t(&fake.detach(), true);

        let err_d = lsgan_discriminator_loss(&real_output, &fake_output, self.config.lsgan.a, self.config.lsgan.b);

        self.disc_opt.zero_grad();
        err_d.backward();
        self.disc_opt.step();

        self.counts.real_batches += 1;
        self.counts.fake_batches += 1;
        self.counts.disc_steps += 1;

        err_d.double_value(&[])
    }

    /// One generator update
    ///
    /// `fake` must come from [`generate_fakes`](Self::generate_fakes) with
    /// the generator unchanged since; its scores are pulled towards `c`.
    pub fn generator_step(&mut self, fake: &Tensor) -> f64 {
        self.gan.enter(Phase::Generator);

        let fake_output = self.gan.discriminator.forward_t(fake, true);
        let err_g = lsgan_generator_loss(&fake_output, self.config.lsgan.c);

        self.gen_opt.zero_grad();
        err_g.backward();
        self.gen_opt.step();

        self.counts.gen_steps += 1;

        err_g.double_value(&[])
    }

    /// Discriminator then generator update on one real batch
    pub fn step(&mut self, real: &Tensor) -> LsganLosses {
        let latent = self.gan.generator.sample_latent(real.size()[0], self.gan.device);
        self.step_with_latent(real, &latent)
    }

    /// [`step`](Self::step) with a given latent batch
    pub fn step_with_latent(&mut self, real: &Tensor, latent: &Tensor) -> LsganLosses {
        let real = real.to_device(self.gan.device);
        let fake = self.generate_fakes(&latent.to_device(self.gan.device));

        let err_d = self.discriminator_step(&real, &fake);
        let err_g = self.generator_step(&fake);

        LsganLosses { err_d, err_g }
    }

    /// Train for `n_epoch` epochs
    ///
    /// Every epoch starts with the sample grids, then steps through all
    /// batches. Checkpoints are written after epochs divisible by
    /// `checkpoint_every`, epoch 0 included.
    pub fn run<D: Dataset>(&mut self, loader: &mut EpochLoader<D>, run_dir: &RunDirectory) -> Result<StepCounts> {
        let cfg = self.config.lsgan.clone();
        let batches_per_epoch = loader.num_batches();
        let mut scalars = ScalarLog::create(&run_dir.scalars_file())?;
        let mut ema_d = EmaTracker::new(0.1);
        let mut ema_g = EmaTracker::new(0.1);

        info!(
            "Starting LSGAN training for {} epochs, {} images in {} batches per epoch",
            cfg.n_epoch,
            loader.num_samples(),
            batches_per_epoch
        );

        for epoch in 0..cfg.n_epoch {
            save_samples(
                &self.gan,
                &self.fixed_latent,
                run_dir,
                &format!("fake_samples_epoch{epoch:03}"),
                self.config.run.gen_extra_images,
            )?;

            let pb = progress_bar(batches_per_epoch as u64, format!("epoch {}/{}", epoch + 1, cfg.n_epoch));
            let mut last = LsganLosses { err_d: f64::NAN, err_g: f64::NAN };

            for (i, batch) in loader.epoch().enumerate() {
                let real = batch?;
                let losses = self.step(&real);
                let step = i + epoch * batches_per_epoch;

                scalars.log(step, "errD", losses.err_d)?;
                scalars.log(step, "errG", losses.err_g)?;
                check_finite(step, "errD", losses.err_d);
                check_finite(step, "errG", losses.err_g);

                if i % cfg.log_every == 0 {
                    info!(
                        "[{}/{}][{}/{}] Loss_D: {:.4} Loss_G: {:.4}",
                        epoch, cfg.n_epoch, i, batches_per_epoch, losses.err_d, losses.err_g
                    );
                }

                ema_d.update(losses.err_d);
                ema_g.update(losses.err_g);
                pb.set_message(format!("D: {:.4}, G: {:.4}", ema_d.value(), ema_g.value()));
                pb.inc(1);
                last = losses;
            }
            pb.finish_and_clear();
            scalars.flush()?;

            if epoch % cfg.checkpoint_every == 0 {
                let meta = CheckpointMeta::new(Variant::Lsgan, epoch, &[("errD", last.err_d), ("errG", last.err_g)]);
                save_checkpoint(&self.gan, &run_dir.models, &format!("epoch_{epoch}"), &meta)?;
            }
        }

        info!("LSGAN training finished: {:?}", self.counts);
        Ok(self.counts)
    }

    /// Networks being trained
    pub fn gan(&self) -> &GanPair {
        &self.gan
    }

    /// Batches and optimizer steps so far
    pub fn counts(&self) -> StepCounts {
        self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TensorDataset;
    use crate::utils::config::ModelConfig;
    use tch::Kind;
    use tempfile::tempdir;

    fn tiny_config() -> Config {
        let mut config = Config::for_variant(Variant::Lsgan);
        config.model = ModelConfig {
            image_size: 8,
            n_colors: 1,
            z_size: 4,
            g_h_size: 4,
            d_h_size: 4,
            selu: false,
        };
        config.data.batch_size = 4;
        config.run.cuda = false;
        config
    }

    #[test]
    fn test_step_counts() {
        let mut trainer = LsganTrainer::new(tiny_config(), Device::Cpu).unwrap();
        let real = Tensor::zeros([4, 1, 8, 8], (Kind::Float, Device::Cpu));

        let losses = trainer.step(&real);
        assert!(losses.err_d >= 0.0);
        assert!(losses.err_g >= 0.0);

        let counts = trainer.counts();
        assert_eq!(counts.real_batches, 1);
        assert_eq!(counts.fake_batches, 1);
        assert_eq!(counts.disc_steps, 1);
        assert_eq!(counts.gen_steps, 1);
    }

    #[test]
    fn test_run_writes_outputs() {
        let dir = tempdir().unwrap();
        let mut config = tiny_config();
        config.lsgan.n_epoch = 2;
        config.lsgan.checkpoint_every = 1;
        config.run.gen_extra_images = 1;

        let images = Tensor::rand([6, 1, 8, 8], (Kind::Float, Device::Cpu)) * 2.0 - 1.0;
        let mut loader = EpochLoader::new(TensorDataset::new(images).unwrap(), 4, true, 1, Device::Cpu);
        let run_dir = RunDirectory::create(dir.path(), true).unwrap();

        let mut trainer = LsganTrainer::new(config, Device::Cpu).unwrap();
        let counts = trainer.run(&mut loader, &run_dir).unwrap();

        // 6 images in batches of 4: 2 batches per epoch
        assert_eq!(counts.disc_steps, 4);
        assert_eq!(counts.gen_steps, 4);

        assert!(run_dir.images.join("fake_samples_epoch000.png").exists());
        assert!(run_dir.images.join("fake_samples_epoch001.png").exists());
        assert!(run_dir.extra.join("fake_samples_epoch001_extra0.png").exists());
        assert!(run_dir.models.join("G_epoch_0.pt").exists());
        assert!(run_dir.models.join("D_epoch_1.pt").exists());
        assert!(run_dir.models.join("checkpoint_epoch_1.json").exists());

        let scalars = ScalarLog::load(&run_dir.scalars_file()).unwrap();
        assert_eq!(scalars.len(), 8);
        assert_eq!(scalars.last().unwrap().step, 3);
    }
}
