//! Checkpoint save/load utilities
//!
//! Saves both networks of a `GanPair` under `models/` together with a JSON
//! metadata sidecar.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::GanPair;
use crate::utils::config::Variant;

/// Checkpoint metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Variant that produced the checkpoint
    pub variant: Variant,
    /// Epoch (LSGAN) or iteration (WGAN-GP)
    pub step: usize,
    /// Last reported losses by tag
    pub losses: BTreeMap<String, f64>,
    /// Timestamp of checkpoint
    pub timestamp: String,
}

impl CheckpointMeta {
    /// Metadata stamped with the current time
    pub fn new(variant: Variant, step: usize, losses: &[(&str, f64)]) -> Self {
        Self {
            variant,
            step,
            losses: losses.iter().map(|(tag, v)| (tag.to_string(), *v)).collect(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Generator and discriminator paths for `tag`
///
/// `tag` is `epoch_{e}` for LSGAN and the iteration for WGAN-GP.
pub fn checkpoint_paths(models_dir: &Path, tag: &str) -> (PathBuf, PathBuf) {
    (
        models_dir.join(format!("G_{tag}.pt")),
        models_dir.join(format!("D_{tag}.pt")),
    )
}

/// Path of the metadata sidecar for `tag`
pub fn meta_path(models_dir: &Path, tag: &str) -> PathBuf {
    models_dir.join(format!("checkpoint_{tag}.json"))
}

/// Save both networks and the metadata sidecar
///
/// # Returns
///
/// Path of the saved generator
pub fn save_checkpoint(gan: &GanPair, models_dir: &Path, tag: &str, meta: &CheckpointMeta) -> Result<PathBuf> {
    std::fs::create_dir_all(models_dir)?;

    let (gen_path, disc_path) = checkpoint_paths(models_dir, tag);
    gan.save(&gen_path, &disc_path)?;

    let meta_json = serde_json::to_string_pretty(meta)?;
    std::fs::write(meta_path(models_dir, tag), meta_json)?;

    tracing::info!("Saved checkpoint {} to {}", tag, models_dir.display());
    Ok(gen_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::ModelConfig;
    use tch::Device;
    use tempfile::tempdir;

    #[test]
    fn test_checkpoint_naming() {
        let (g, d) = checkpoint_paths(Path::new("models"), "epoch_25");
        assert_eq!(g, Path::new("models/G_epoch_25.pt"));
        assert_eq!(d, Path::new("models/D_epoch_25.pt"));

        let (g, _) = checkpoint_paths(Path::new("models"), "500");
        assert_eq!(g, Path::new("models/G_500.pt"));
    }

    #[test]
    fn test_save_checkpoint_with_meta() {
        let dir = tempdir().unwrap();
        let config = ModelConfig {
            image_size: 8,
            n_colors: 1,
            z_size: 4,
            g_h_size: 4,
            d_h_size: 4,
            selu: false,
        };
        let gan = GanPair::new(&config, false, Device::Cpu);

        let meta = CheckpointMeta::new(Variant::WganGp, 500, &[("errD", -0.5), ("errG", 0.25)]);
        let gen_path = save_checkpoint(&gan, dir.path(), "500", &meta).unwrap();

        assert!(gen_path.exists());
        assert!(dir.path().join("D_500.pt").exists());

        let content = std::fs::read_to_string(dir.path().join("checkpoint_500.json")).unwrap();
        let loaded: CheckpointMeta = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded, meta);
        assert_eq!(loaded.losses["errG"], 0.25);
    }
}
