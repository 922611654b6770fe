//! Output directory of one training run
//!
//! Every run gets `output_folder/run-N` with the first N not already taken.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Layout of `output_folder/run-N`
#[derive(Debug, Clone)]
pub struct RunDirectory {
    /// Run number N
    pub run: usize,
    /// `run-N` itself
    pub root: PathBuf,
    /// `logs/`: log.txt, config.json, scalars.csv
    pub logs: PathBuf,
    /// `images/`: sample grids
    pub images: PathBuf,
    /// `images/extra/`: extra sample grids
    pub extra: PathBuf,
    /// `models/`: checkpoints
    pub models: PathBuf,
}

impl RunDirectory {
    /// Create the next free `run-N` below `output_folder`
    ///
    /// `images/extra/` is only created when `with_extra` is set.
    pub fn create(output_folder: impl AsRef<Path>, with_extra: bool) -> Result<Self> {
        let output_folder = output_folder.as_ref();

        let mut run = 0;
        while output_folder.join(format!("run-{run}")).exists() {
            run += 1;
        }

        let root = output_folder.join(format!("run-{run}"));
        let dirs = Self {
            run,
            logs: root.join("logs"),
            images: root.join("images"),
            extra: root.join("images").join("extra"),
            models: root.join("models"),
            root,
        };

        std::fs::create_dir_all(&dirs.logs)?;
        std::fs::create_dir_all(&dirs.images)?;
        std::fs::create_dir_all(&dirs.models)?;
        if with_extra {
            std::fs::create_dir_all(&dirs.extra)?;
        }

        Ok(dirs)
    }

    /// Text log mirroring the console
    pub fn log_file(&self) -> PathBuf {
        self.logs.join("log.txt")
    }

    /// Full configuration of the run
    pub fn config_file(&self) -> PathBuf {
        self.logs.join("config.json")
    }

    /// Scalar stream
    pub fn scalars_file(&self) -> PathBuf {
        self.logs.join("scalars.csv")
    }
}
