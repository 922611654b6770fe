//! LSGAN / WGAN-GP image GAN trainer
//!
//! Main entry point providing CLI interface for:
//! - Training with the LSGAN or WGAN-GP recipe
//! - Generating a sample grid from a generator checkpoint
//! - Writing a default configuration file

use std::path::Path;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use rand::Rng;
use tracing::info;

use rust_gan_images::{
    data::{Dataset, EpochLoader, ImageFolder, RandomSampler},
    model::GanPair,
    training::{LsganTrainer, WganGpTrainer},
    utils::{config::validate_image_size, save_grid, setup_logging, Config, RunDirectory, Variant},
};

/// Train LSGAN or WGAN-GP on a folder of images
#[derive(Parser)]
#[command(name = "gan_images")]
#[command(version = "0.1.0")]
#[command(about = "Train DCGAN-style GANs (LSGAN, WGAN-GP) on image folders")]
struct Cli {
    /// Path to a TOML or JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbosity level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    verbosity: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train with the least-squares GAN recipe
    Lsgan {
        #[command(flatten)]
        args: TrainArgs,

        /// Number of epochs
        #[arg(long)]
        n_epoch: Option<usize>,
    },

    /// Train with the Wasserstein GAN gradient penalty recipe
    WganGp {
        #[command(flatten)]
        args: TrainArgs,

        /// Number of generator iterations
        #[arg(long)]
        n_iter: Option<usize>,

        /// Critic updates per generator update
        #[arg(long)]
        n_critic: Option<usize>,
    },

    /// Write a sample grid from a generator checkpoint
    Generate {
        /// Generator checkpoint (.pt)
        #[arg(short = 'm', long)]
        checkpoint: String,

        /// Number of images in the grid
        #[arg(short, long, default_value = "64")]
        num_samples: i64,

        /// Output PNG path
        #[arg(short, long, default_value = "samples.png")]
        output: String,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Force CPU
        #[arg(long)]
        cpu: bool,
    },

    /// Initialize default configuration file
    Init {
        /// Variant whose defaults are written (lsgan, wgan-gp)
        #[arg(long, default_value = "lsgan")]
        variant: String,

        /// Output configuration file path (.toml or .json)
        #[arg(short, long, default_value = "config.toml")]
        output: String,
    },
}

/// Overrides shared by both training recipes
#[derive(Args)]
struct TrainArgs {
    /// Folder with one subfolder per class
    #[arg(short, long)]
    input_folder: Option<String>,

    /// Parent folder of the run-N directories
    #[arg(short, long)]
    output_folder: Option<String>,

    /// Side of the square images (power of two >= 8)
    #[arg(long)]
    image_size: Option<i64>,

    /// Number of image channels (1 or 3)
    #[arg(long)]
    n_colors: Option<i64>,

    /// Batch size
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Generator checkpoint to start from
    #[arg(long)]
    g_load: Option<String>,

    /// Discriminator checkpoint to start from
    #[arg(long)]
    d_load: Option<String>,

    /// Force CPU
    #[arg(long)]
    cpu: bool,
}

impl TrainArgs {
    fn apply(self, config: &mut Config) {
        if let Some(v) = self.input_folder {
            config.data.input_folder = v;
        }
        if let Some(v) = self.output_folder {
            config.run.output_folder = v;
        }
        if let Some(v) = self.image_size {
            config.model.image_size = v;
        }
        if let Some(v) = self.n_colors {
            config.model.n_colors = v;
        }
        if let Some(v) = self.batch_size {
            config.data.batch_size = v;
        }
        if self.seed.is_some() {
            config.run.seed = self.seed;
        }
        if self.g_load.is_some() {
            config.run.g_load = self.g_load;
        }
        if self.d_load.is_some() {
            config.run.d_load = self.d_load;
        }
        if self.cpu {
            config.run.cuda = false;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Lsgan { args, n_epoch } => {
            let mut config = Config::load_or_default(config_path, Variant::Lsgan)?;
            args.apply(&mut config);
            if let Some(v) = n_epoch {
                config.lsgan.n_epoch = v;
            }
            train(Variant::Lsgan, config, cli.verbosity)?;
        }

        Commands::WganGp { args, n_iter, n_critic } => {
            let mut config = Config::load_or_default(config_path, Variant::WganGp)?;
            args.apply(&mut config);
            if let Some(v) = n_iter {
                config.wgan_gp.n_iter = v;
            }
            if let Some(v) = n_critic {
                config.wgan_gp.n_critic = v;
            }
            train(Variant::WganGp, config, cli.verbosity)?;
        }

        Commands::Generate {
            checkpoint,
            num_samples,
            output,
            seed,
            cpu,
        } => {
            let mut config = Config::load_or_default(config_path, Variant::Lsgan)?;
            if cpu {
                config.run.cuda = false;
            }
            let level = cli.verbosity.unwrap_or_else(|| config.run.log_level.clone());
            setup_logging(&level, None)?;
            generate(&config, &checkpoint, num_samples, &output, seed)?;
        }

        Commands::Init { variant, output } => {
            let variant: Variant = variant.parse()?;
            Config::for_variant(variant).save(&output)?;
            println!("Wrote default {} configuration to {}", variant, output);
        }
    }

    Ok(())
}

/// Set up the run directory and logging, then train `variant`
fn train(variant: Variant, mut config: Config, verbosity: Option<String>) -> Result<()> {
    if let Some(level) = verbosity {
        config.run.log_level = level;
    }
    config.validate(variant)?;

    let seed = *config
        .run
        .seed
        .get_or_insert_with(|| rand::thread_rng().gen_range(1..=10_000));

    let run_dir = RunDirectory::create(&config.run.output_folder, config.run.gen_extra_images > 0)?;
    setup_logging(&config.run.log_level, Some(&run_dir.log_file()))?;

    info!("{} run {} in {}", variant, run_dir.run, run_dir.root.display());
    info!("Random seed: {}", seed);
    tch::manual_seed(seed as i64);

    config.save_json(&run_dir.config_file().to_string_lossy())?;
    info!("Configuration:\n{}", serde_json::to_string_pretty(&config)?);

    let device = config.get_device();
    info!("Using device: {:?}", device);

    let dataset = ImageFolder::open(
        &config.data.input_folder,
        config.model.image_size,
        config.model.n_colors,
        config.data.n_workers,
    )?;
    info!("Found {} images in {}", dataset.len(), dataset.root().display());

    let counts = match variant {
        Variant::Lsgan => {
            let mut trainer = LsganTrainer::new(config.clone(), device)?;
            trainer.gan().log_architecture();
            let mut loader = EpochLoader::new(dataset, config.data.batch_size, true, seed, device);
            trainer.run(&mut loader, &run_dir)?
        }
        Variant::WganGp => {
            let mut trainer = WganGpTrainer::new(config.clone(), device)?;
            trainer.gan().log_architecture();
            let mut sampler = RandomSampler::new(dataset, config.data.batch_size, seed, device)?;
            trainer.run(&mut sampler, &run_dir)?
        }
    };

    info!(
        "Done: {} discriminator steps, {} generator steps, outputs in {}",
        counts.disc_steps,
        counts.gen_steps,
        run_dir.root.display()
    );
    Ok(())
}

/// Load a generator checkpoint and write one sample grid
fn generate(config: &Config, checkpoint: &str, num_samples: i64, output: &str, seed: Option<u64>) -> Result<()> {
    validate_image_size(config.model.image_size)?;
    if num_samples <= 0 {
        bail!("num_samples must be > 0, got {}", num_samples);
    }
    if let Some(seed) = seed {
        tch::manual_seed(seed as i64);
    }

    let device = config.get_device();
    let mut gan = GanPair::new(&config.model, !config.model.selu, device);
    let report = gan.load_generator(Path::new(checkpoint))?;
    if !report.missing.is_empty() {
        bail!(
            "{} does not match the configured generator: {} variables missing",
            checkpoint,
            report.missing.len()
        );
    }

    let latent = gan.generator.sample_latent(num_samples, device);
    let images = gan.generate(&latent);
    save_grid(&images, Path::new(output))?;

    info!("Saved {} samples to {}", num_samples, output);
    Ok(())
}
