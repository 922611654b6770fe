//! Image folder dataset
//!
//! Every immediate subdirectory of the root is a class; the class label is
//! not used. Images are resized to a square, converted to the requested
//! number of channels and normalized to [-1, 1].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;
use rayon::prelude::*;
use rayon::ThreadPool;
use tch::{Device, Kind, Tensor};

use super::Dataset;
use crate::error::{GanError, Result};

/// File extensions recognized as images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "ppm", "pgm", "tif", "tiff", "webp"];

/// Lazily decoded dataset of image files
#[derive(Debug, Clone)]
pub struct ImageFolder {
    root: PathBuf,
    paths: Vec<PathBuf>,
    image_size: u32,
    n_colors: i64,
    /// Decoding threads shared by clones
    pool: Arc<ThreadPool>,
}

impl ImageFolder {
    /// Scan `root` for images
    ///
    /// # Arguments
    ///
    /// * `root` - Folder containing one subfolder per class
    /// * `image_size` - Side of the square output images
    /// * `n_colors` - 1 for grayscale, 3 for RGB
    /// * `n_workers` - Threads decoding the images of a batch
    pub fn open(root: impl AsRef<Path>, image_size: i64, n_colors: i64, n_workers: usize) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(GanError::dataset(format!("{} is not a directory", root.display())));
        }
        if !(n_colors == 1 || n_colors == 3) {
            return Err(GanError::config(format!("n_colors must be 1 or 3, got {n_colors}")));
        }
        let image_size = u32::try_from(image_size)
            .map_err(|_| GanError::config(format!("invalid image_size {image_size}")))?;

        let mut classes: Vec<PathBuf> = std::fs::read_dir(&root)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        classes.sort();

        let mut paths = Vec::new();
        for class in &classes {
            collect_images(class, &mut paths)?;
        }

        if paths.is_empty() {
            return Err(GanError::dataset(format!(
                "no images found in the class folders of {}",
                root.display()
            )));
        }

        Ok(Self {
            root,
            paths,
            image_size,
            n_colors,
            pool: Arc::new(worker_pool(n_workers)?),
        })
    }

    /// Dataset root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decode image `index` into a (n_colors, image_size, image_size) tensor in [-1, 1]
    pub fn load(&self, index: usize) -> Result<Tensor> {
        let path = self
            .paths
            .get(index)
            .ok_or_else(|| GanError::dataset(format!("index {index} out of range ({})", self.len())))?;

        let size = self.image_size;
        let img = image::open(path)?.resize_exact(size, size, FilterType::Triangle);
        let raw = match self.n_colors {
            1 => img.to_luma8().into_raw(),
            _ => img.to_rgb8().into_raw(),
        };

        let side = size as i64;
        let pixels = Tensor::from_slice(&raw)
            .view([side, side, self.n_colors])
            .permute([2, 0, 1])
            .to_kind(Kind::Float)
            / 255.0;

        // [0, 1] -> [-1, 1]: mean 0.5, std 0.5 per channel
        Ok((pixels - 0.5) / 0.5)
    }
}

impl Dataset for ImageFolder {
    fn len(&self) -> usize {
        self.paths.len()
    }

    /// Decode a batch on the worker pool and stack to (batch, n_colors, image_size, image_size)
    fn get_batch(&self, indices: &[usize], device: Device) -> Result<Tensor> {
        let images = self.pool.install(|| {
            indices
                .par_iter()
                .map(|&i| self.load(i))
                .collect::<Result<Vec<Tensor>>>()
        })?;

        Ok(Tensor::stack(&images, 0).to_device(device))
    }
}

fn collect_images(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_images(&path, out)?;
        } else if has_image_extension(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Build the decoding pool with `n_workers` threads
fn worker_pool(n_workers: usize) -> Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_workers.max(1))
        .thread_name(|i| format!("image-loader-{i}"))
        .build()
        .map_err(|e| GanError::config(format!("cannot start {n_workers} data workers: {e}")))
}
