//! Sample grid export
//!
//! A batch of generated images is tiled into one picture, min-max
//! normalized over the whole batch and written as PNG.

use std::path::Path;

use image::{GrayImage, RgbImage};
use tch::{Kind, Tensor};

use crate::error::{GanError, Result};

/// Images per grid row
pub const GRID_PER_ROW: i64 = 8;
/// Pixels between grid cells and around the border
pub const GRID_PADDING: i64 = 2;

/// Tile a (batch, C, H, W) tensor into a (C, H', W') grid in [0, 1]
///
/// Values are min-max normalized over the whole batch; padding is black.
pub fn make_grid(images: &Tensor, per_row: i64, padding: i64) -> Result<Tensor> {
    let size = images.size();
    if size.len() != 4 || size[0] == 0 {
        return Err(GanError::config(format!(
            "expected a non-empty (batch, C, H, W) tensor, got shape {:?}",
            size
        )));
    }
    if per_row <= 0 {
        return Err(GanError::config(format!("per_row must be > 0, got {}", per_row)));
    }
    let (n, c, h, w) = (size[0], size[1], size[2], size[3]);

    let images = images.detach().to_kind(Kind::Float).to_device(tch::Device::Cpu);
    let min = images.min();
    let max = images.max();
    let range = (&max - &min).clamp_min(1e-5);
    let images = (images - min) / range;

    let cols = per_row.min(n);
    let rows = (n + cols - 1) / cols;
    let cell_h = h + padding;
    let cell_w = w + padding;

    let grid = Tensor::zeros(
        [c, rows * cell_h + padding, cols * cell_w + padding],
        (Kind::Float, tch::Device::Cpu),
    );

    tch::no_grad(|| {
        for k in 0..n {
            let (row, col) = (k / cols, k % cols);
            let mut cell = grid
                .narrow(1, row * cell_h + padding, h)
                .narrow(2, col * cell_w + padding, w);
            cell.copy_(&images.get(k));
        }
    });

    Ok(grid)
}

/// Write a (C, H, W) tensor in [0, 1] as an 8-bit PNG
///
/// One channel is written as grayscale, three as RGB.
pub fn save_image(image: &Tensor, path: &Path) -> Result<()> {
    let size = image.size();
    if size.len() != 3 || !(size[0] == 1 || size[0] == 3) {
        return Err(GanError::config(format!(
            "expected a (1|3, H, W) tensor, got shape {:?}",
            size
        )));
    }
    let (height, width) = (size[1] as u32, size[2] as u32);

    let pixels = (image * 255.0 + 0.5)
        .clamp(0.0, 255.0)
        .to_kind(Kind::Uint8)
        .permute([1, 2, 0])
        .contiguous()
        .view([-1]);
    let raw = Vec::<u8>::try_from(&pixels)?;

    if size[0] == 1 {
        let img = GrayImage::from_raw(width, height, raw)
            .ok_or_else(|| GanError::config("grid buffer does not match its size"))?;
        img.save(path)?;
    } else {
        let img = RgbImage::from_raw(width, height, raw)
            .ok_or_else(|| GanError::config("grid buffer does not match its size"))?;
        img.save(path)?;
    }
    Ok(())
}

/// Tile `images` with the default layout and save the grid to `path`
pub fn save_grid(images: &Tensor, path: &Path) -> Result<()> {
    let grid = make_grid(images, GRID_PER_ROW, GRID_PADDING)?;
    save_image(&grid, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;
    use tempfile::tempdir;

    #[test]
    fn test_grid_layout() {
        let images = Tensor::rand([10, 3, 4, 4], (Kind::Float, Device::Cpu));
        let grid = make_grid(&images, 8, 2).unwrap();

        // 8 columns, 2 rows: 8 * (4 + 2) + 2, 2 * (4 + 2) + 2
        assert_eq!(grid.size(), vec![3, 14, 50]);
        assert!(grid.min().double_value(&[]) >= 0.0);
        assert!(grid.max().double_value(&[]) <= 1.0);
    }

    #[test]
    fn test_grid_is_min_max_normalized() {
        let images = Tensor::from_slice(&[-3.0f32, 5.0]).view([2, 1, 1, 1]);
        let grid = make_grid(&images, 8, 0).unwrap();

        assert_eq!(grid.size(), vec![1, 1, 2]);
        assert!((grid.double_value(&[0, 0, 0]) - 0.0).abs() < 1e-6);
        assert!((grid.double_value(&[0, 0, 1]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_save_grid_png() {
        let dir = tempdir().unwrap();

        let rgb = dir.path().join("rgb.png");
        save_grid(&Tensor::randn([5, 3, 8, 8], (Kind::Float, Device::Cpu)), &rgb).unwrap();
        let img = image::open(&rgb).unwrap();
        assert_eq!((img.width(), img.height()), (5 * 10 + 2, 12));

        let gray = dir.path().join("gray.png");
        save_grid(&Tensor::randn([16, 1, 8, 8], (Kind::Float, Device::Cpu)), &gray).unwrap();
        let img = image::open(&gray).unwrap();
        assert_eq!((img.width(), img.height()), (8 * 10 + 2, 2 * 10 + 2));
        assert_eq!(img.color(), image::ColorType::L8);
    }

    #[test]
    fn test_empty_batch_is_error() {
        let images = Tensor::zeros([0, 3, 8, 8], (Kind::Float, Device::Cpu));
        assert!(make_grid(&images, 8, 2).is_err());
    }

    #[test]
    fn test_non_positive_per_row_is_error() {
        let images = Tensor::rand([4, 1, 8, 8], (Kind::Float, Device::Cpu));
        assert!(make_grid(&images, 0, 2).is_err());
        assert!(make_grid(&images, -1, 2).is_err());
    }
}
