//! Integration tests for the LSGAN and WGAN-GP update steps
//!
//! libtorch has a single global random generator, so every test in this
//! file holds `TORCH_LOCK` while it seeds and trains.

use std::sync::Mutex;

use rust_gan_images::data::{RandomSampler, TensorDataset};
use rust_gan_images::training::StepCounts;
use rust_gan_images::utils::config::ModelConfig;
use rust_gan_images::{Config, LsganTrainer, Variant, WganGpTrainer};
use tch::{Device, Kind, Tensor};

static TORCH_LOCK: Mutex<()> = Mutex::new(());

fn tiny_config(variant: Variant) -> Config {
    let mut config = Config::for_variant(variant);
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

fn variable(vs: &tch::nn::VarStore, name: &str) -> Tensor {
    vs.variables()[name].copy()
}

fn lsgan_losses(seed: i64) -> (f64, f64) {
    tch::manual_seed(seed);
    let mut trainer = LsganTrainer::new(tiny_config(Variant::Lsgan), Device::Cpu).unwrap();
    let real = Tensor::zeros([4, 1, 8, 8], (Kind::Float, Device::Cpu));

    let losses = trainer.step(&real);
    (losses.err_d, losses.err_g)
}

#[test]
fn test_lsgan_step_is_deterministic_and_finite() {
    let _guard = TORCH_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    let (d1, g1) = lsgan_losses(1234);
    let (d2, g2) = lsgan_losses(1234);

    assert!(d1.is_finite() && g1.is_finite());
    assert!(d1 >= 0.0 && g1 >= 0.0);
    assert!((d1 - d2).abs() < 1e-6, "errD {d1} vs {d2}");
    assert!((g1 - g2).abs() < 1e-6, "errG {g1} vs {g2}");
}

#[test]
fn test_lsgan_updates_only_the_trainable_network() {
    let _guard = TORCH_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    tch::manual_seed(7);

    let mut trainer = LsganTrainer::new(tiny_config(Variant::Lsgan), Device::Cpu).unwrap();
    let real = Tensor::randn([4, 1, 8, 8], (Kind::Float, Device::Cpu));
    let latent = trainer.gan().generator.sample_latent(4, Device::Cpu);

    let g_before = variable(&trainer.gan().gen_vs, "start_conv.weight");
    let d_before = variable(&trainer.gan().disc_vs, "start_conv.weight");

    let fake = trainer.generate_fakes(&latent);
    trainer.discriminator_step(&real, &fake);
    assert!(trainer.gan().discriminator_trainable());
    assert!(!trainer.gan().generator_trainable());

    let g_after_d = variable(&trainer.gan().gen_vs, "start_conv.weight");
    let d_after_d = variable(&trainer.gan().disc_vs, "start_conv.weight");
    assert!(g_after_d.equal(&g_before), "generator changed during discriminator update");
    assert!(!d_after_d.equal(&d_before), "discriminator did not change");

    trainer.generator_step(&fake);
    assert!(trainer.gan().generator_trainable());
    assert!(!trainer.gan().discriminator_trainable());

    let g_after_g = variable(&trainer.gan().gen_vs, "start_conv.weight");
    let d_after_g = variable(&trainer.gan().disc_vs, "start_conv.weight");
    assert!(d_after_g.equal(&d_after_d), "discriminator changed during generator update");
    assert!(!g_after_g.equal(&g_after_d), "generator did not change");
}

#[test]
fn test_lsgan_step_runs_the_generator_once() {
    let _guard = TORCH_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let config = tiny_config(Variant::Lsgan);

    tch::manual_seed(21);
    let mut trainer = LsganTrainer::new(config.clone(), Device::Cpu).unwrap();
    tch::manual_seed(21);
    let twin = LsganTrainer::new(config, Device::Cpu).unwrap();

    let latent = Tensor::randn([4, 4, 1, 1], (Kind::Float, Device::Cpu));
    let real = Tensor::randn([4, 1, 8, 8], (Kind::Float, Device::Cpu));
    let initial = variable(&trainer.gan().gen_vs, "start_bn.running_mean");

    trainer.step_with_latent(&real, &latent);
    // exactly one training-mode forward on the same latent batch
    let _ = twin.gan().generate(&latent);

    let stepped = variable(&trainer.gan().gen_vs, "start_bn.running_mean");
    let expected = variable(&twin.gan().gen_vs, "start_bn.running_mean");
    assert!(!stepped.equal(&initial), "batch statistics were not tracked");
    assert!(
        stepped.allclose(&expected, 1e-6, 1e-7, false),
        "running mean {stepped:?} vs {expected:?}"
    );
}

#[test]
fn test_wgan_gp_iteration_counts() {
    let _guard = TORCH_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    tch::manual_seed(42);

    let mut config = tiny_config(Variant::WganGp);
    config.wgan_gp.n_critic = 5;

    let images = Tensor::rand([10, 1, 8, 8], (Kind::Float, Device::Cpu)) * 2.0 - 1.0;
    let sampler = RandomSampler::new(TensorDataset::new(images).unwrap(), 4, 3, Device::Cpu).unwrap();
    let mut drawn = 0;
    let mut batches = sampler.inspect(|_| drawn += 1);

    let mut trainer = WganGpTrainer::new(config, Device::Cpu).unwrap();
    let losses = trainer.iteration(&mut batches).unwrap();
    drop(batches);

    assert_eq!(drawn, 5);
    assert_eq!(
        trainer.counts(),
        StepCounts {
            real_batches: 5,
            fake_batches: 5,
            disc_steps: 5,
            gen_steps: 1,
        }
    );
    assert!(losses.critic.err_d.is_finite());
    assert!(losses.critic.err_d_penalty >= losses.critic.err_d);
    assert!(losses.err_g.is_finite());
}

#[test]
fn test_wgan_gp_generator_step_leaves_critic_unchanged() {
    let _guard = TORCH_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    tch::manual_seed(11);

    let mut trainer = WganGpTrainer::new(tiny_config(Variant::WganGp), Device::Cpu).unwrap();
    let real = Tensor::randn([4, 1, 8, 8], (Kind::Float, Device::Cpu));

    trainer.critic_step(&real);
    let d_before = variable(&trainer.gan().disc_vs, "end_conv.weight");
    let g_before = variable(&trainer.gan().gen_vs, "end_conv.weight");

    trainer.generator_step();

    assert!(variable(&trainer.gan().disc_vs, "end_conv.weight").equal(&d_before));
    assert!(!variable(&trainer.gan().gen_vs, "end_conv.weight").equal(&g_before));
}
