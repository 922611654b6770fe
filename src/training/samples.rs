//! Sample images written during training

use indicatif::{ProgressBar, ProgressStyle};
use tch::Tensor;

use crate::error::Result;
use crate::model::GanPair;
use crate::utils::run_dir::RunDirectory;
use crate::utils::visualize::save_grid;

/// Save the fixed-latent grid as `images/{stem}.png`
///
/// Also writes `extra` grids from fresh latents of the same batch size to
/// `images/extra/{stem}_extra{n}.png`.
pub fn save_samples(gan: &GanPair, fixed_latent: &Tensor, run_dir: &RunDirectory, stem: &str, extra: usize) -> Result<()> {
    let fake = gan.generate(fixed_latent);
    save_grid(&fake, &run_dir.images.join(format!("{stem}.png")))?;

    let batch_size = fixed_latent.size()[0];
    for n in 0..extra {
        let latent = gan.generator.sample_latent(batch_size, gan.device);
        let fake = gan.generate(&latent);
        save_grid(&fake, &run_dir.extra.join(format!("{stem}_extra{n}.png")))?;
    }
    Ok(())
}

/// Progress bar over `len` steps
pub fn progress_bar(len: u64, prefix: String) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_prefix(prefix);
    pb
}
