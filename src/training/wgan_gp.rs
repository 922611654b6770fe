//! Wasserstein GAN with gradient penalty
//!
//! Iteration-based loop: `n_critic` critic updates, each on a freshly sampled
//! real batch, then one generator update.

use std::path::Path;

use tch::{nn, Device, Kind, Tensor};
use tracing::info;

use super::losses::{critic_score, gradient_penalty, wasserstein_distance};
use super::metrics::{check_finite, EmaTracker, ScalarLog, StepCounts};
use super::samples::{progress_bar, save_samples};
use crate::error::{GanError, Result};
use crate::model::{GanPair, Phase};
use crate::utils::checkpoint::{save_checkpoint, CheckpointMeta};
use crate::utils::config::{Config, Variant};
use crate::utils::run_dir::RunDirectory;

/// Losses reported by one critic update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticLosses {
    /// E[D(fake)] - E[D(real)]
    pub err_d: f64,
    /// `err_d` plus the gradient penalty
    pub err_d_penalty: f64,
}

/// Losses of one WGAN-GP iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WganGpLosses {
    /// Critic losses of the last critic update
    pub critic: CriticLosses,
    /// Mean critic score of the generator's fakes
    pub err_g: f64,
}

/// WGAN-GP trainer owning the networks, optimizers and fixed latent
pub struct WganGpTrainer {
    config: Config,
    gan: GanPair,
    gen_opt: nn::Optimizer,
    disc_opt: nn::Optimizer,
    /// Latent batch reused for every sample grid
    fixed_latent: Tensor,
    counts: StepCounts,
}

impl WganGpTrainer {
    /// Build networks and optimizers, loading `g_load`/`d_load` when set
    ///
    /// The critic has no batch norm so the penalty sees per-sample gradients.
    pub fn new(config: Config, device: Device) -> Result<Self> {
        let mut gan = GanPair::new(&config.model, false, device);

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

    /// One critic update on a real batch
    ///
    /// Real score is maximized, fake score minimized, and the gradient
    /// penalty is taken at random interpolates between the two batches.
    pub fn critic_step(&mut self, real: &Tensor) -> CriticLosses {
        self.gan.enter(Phase::Discriminator);
        self.disc_opt.zero_grad();

        let device = self.gan.device;
        let real = real.to_device(device);
        let batch_size = real.size()[0];
        let critic = &self.gan.discriminator;

        let real_output = critic.forward_t(&real, true);
        (-critic_score(&real_output)).backward();

        let latent = self.gan.generator.sample_latent(batch_size, device);
        let fake = self.gan.generate(&latent);
        let fake_output = critic.forward_t(&fake, true);
        critic_score(&fake_output).backward();

        let u = Tensor::rand([batch_size, 1, 1, 1], (Kind::Float, device));
        let penalty = gradient_penalty(
            |x| critic.forward_t(x, true),
            &real,
            &fake,
            &u,
            self.config.wgan_gp.penalty,
        );
        penalty.backward();

        self.disc_opt.step();

        self.counts.real_batches += 1;
        self.counts.fake_batches += 1;
        self.counts.disc_steps += 1;

        let err_d = tch::no_grad(|| wasserstein_distance(&real_output, &fake_output)).double_value(&[]);
        CriticLosses {
            err_d,
            err_d_penalty: err_d + penalty.double_value(&[]),
        }
    }

    /// One generator update on a fresh latent batch
    ///
    /// Returns the mean critic score of the fakes, which the update raises.
    pub fn generator_step(&mut self) -> f64 {
        self.gan.enter(Phase::Generator);

        let device = self.gan.device;
        let latent = self
            .gan
            .generator
            .sample_latent(self.config.data.batch_size as i64, device);
        let fake = self.gan.generator.forward_t(&latent, true);
        let score = critic_score(&self.gan.discriminator.forward_t(&fake, true));

        self.gen_opt.zero_grad();
        (-&score).backward();
        self.gen_opt.step();

        self.counts.gen_steps += 1;

        score.double_value(&[])
    }

    /// `n_critic` critic updates, each on the next real batch, then one generator update
    ///
    /// Reported critic losses come from the last critic update.
    pub fn iteration<I>(&mut self, batches: &mut I) -> Result<WganGpLosses>
    where
        I: Iterator<Item = Result<Tensor>>,
    {
        let mut critic = None;
        for _ in 0..self.config.wgan_gp.n_critic {
            let real = batches
                .next()
                .ok_or_else(|| GanError::dataset("real batch provider is exhausted"))??;
            critic = Some(self.critic_step(&real));
        }
        let critic = critic.ok_or_else(|| GanError::config("n_critic must be > 0"))?;

        let err_g = self.generator_step();
        Ok(WganGpLosses { critic, err_g })
    }

    /// Train for `n_iter` iterations
    ///
    /// Sample grids are saved before iterations divisible by `image_every`,
    /// checkpoints after iterations divisible by `checkpoint_every`.
    pub fn run<I>(&mut self, batches: &mut I, run_dir: &RunDirectory) -> Result<StepCounts>
    where
        I: Iterator<Item = Result<Tensor>>,
    {
        let cfg = self.config.wgan_gp.clone();
        let mut scalars = ScalarLog::create(&run_dir.scalars_file())?;
        let mut ema_d = EmaTracker::new(0.1);
        let mut ema_g = EmaTracker::new(0.1);

        info!(
            "Starting WGAN-GP training for {} iterations, {} critic updates each",
            cfg.n_iter, cfg.n_critic
        );
        let pb = progress_bar(cfg.n_iter as u64, "iter".to_string());

        for i in 0..cfg.n_iter {
            if i % cfg.image_every == 0 {
                save_samples(
                    &self.gan,
                    &self.fixed_latent,
                    run_dir,
                    &format!("fake_samples_iter{:03}", i / cfg.image_every),
                    self.config.run.gen_extra_images,
                )?;
            }

            let losses = self.iteration(batches)?;
            let CriticLosses { err_d, err_d_penalty } = losses.critic;

            scalars.log(i, "errD", err_d)?;
            scalars.log(i, "errD_penalty", err_d_penalty)?;
            scalars.log(i, "errG", losses.err_g)?;
            check_finite(i, "errD", err_d);
            check_finite(i, "errD_penalty", err_d_penalty);
            check_finite(i, "errG", losses.err_g);

            if i % cfg.log_every == 0 {
                info!(
                    "[{}] W_distance: {:.4} W_distance_penalty: {:.4} Loss_G: {:.4}",
                    i, err_d, err_d_penalty, losses.err_g
                );
                scalars.flush()?;
            }

            if i % cfg.checkpoint_every == 0 {
                let meta = CheckpointMeta::new(
                    Variant::WganGp,
                    i,
                    &[("errD", err_d), ("errD_penalty", err_d_penalty), ("errG", losses.err_g)],
                );
                save_checkpoint(&self.gan, &run_dir.models, &i.to_string(), &meta)?;
            }

            ema_d.update(err_d);
            ema_g.update(losses.err_g);
            pb.set_message(format!("D: {:.4}, G: {:.4}", ema_d.value(), ema_g.value()));
            pb.inc(1);
        }
        pb.finish_and_clear();
        scalars.flush()?;

        info!("WGAN-GP training finished: {:?}", self.counts);
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
    use crate::data::{RandomSampler, TensorDataset};
    use crate::utils::config::ModelConfig;
    use tempfile::tempdir;

    fn tiny_config() -> Config {
        let mut config = Config::for_variant(Variant::WganGp);
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
    fn test_critic_step_reports_penalty() {
        let mut trainer = WganGpTrainer::new(tiny_config(), Device::Cpu).unwrap();
        let real = Tensor::randn([4, 1, 8, 8], (Kind::Float, Device::Cpu));

        let losses = trainer.critic_step(&real);
        assert!(losses.err_d.is_finite());
        // penalty is a mean of squares
        assert!(losses.err_d_penalty >= losses.err_d);
    }

    #[test]
    fn test_exhausted_provider_is_error() {
        let mut trainer = WganGpTrainer::new(tiny_config(), Device::Cpu).unwrap();
        let mut batches = std::iter::repeat_with(|| Ok::<_, GanError>(Tensor::zeros([4, 1, 8, 8], (Kind::Float, Device::Cpu))))
            .take(3);

        assert!(trainer.iteration(&mut batches).is_err());
    }

    #[test]
    fn test_run_writes_outputs() {
        let dir = tempdir().unwrap();
        let mut config = tiny_config();
        config.wgan_gp.n_iter = 3;
        config.wgan_gp.n_critic = 2;
        config.wgan_gp.image_every = 2;
        config.wgan_gp.checkpoint_every = 2;

        let images = Tensor::rand([6, 1, 8, 8], (Kind::Float, Device::Cpu)) * 2.0 - 1.0;
        let mut sampler = RandomSampler::new(TensorDataset::new(images).unwrap(), 4, 1, Device::Cpu).unwrap();
        let run_dir = RunDirectory::create(dir.path(), false).unwrap();

        let mut trainer = WganGpTrainer::new(config, Device::Cpu).unwrap();
        let counts = trainer.run(&mut sampler, &run_dir).unwrap();

        assert_eq!(counts.disc_steps, 6);
        assert_eq!(counts.gen_steps, 3);

        assert!(run_dir.images.join("fake_samples_iter000.png").exists());
        assert!(run_dir.images.join("fake_samples_iter001.png").exists());
        assert!(run_dir.models.join("G_0.pt").exists());
        assert!(run_dir.models.join("D_2.pt").exists());
        assert!(!run_dir.models.join("G_1.pt").exists());

        let scalars = ScalarLog::load(&run_dir.scalars_file()).unwrap();
        assert_eq!(scalars.len(), 9);
        assert!(scalars.iter().any(|r| r.tag == "errD_penalty"));
    }
}
