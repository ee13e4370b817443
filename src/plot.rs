//! Side by side rendering of input images and their reconstructions.

use crate::error::Result;
use image::{GrayImage, Luma};
use std::path::Path;

/// Pixels between tiles and around the image.
pub const BORDER: u32 = 2;
const BACKGROUND: u8 = 64;

/// Renders originals on the top row and reconstructions below them.
///
/// Each image is a flat `side * side` vector of brightness in `[0, 1]`
/// (out of range values are clamped), enlarged `scale` times.
/// Only as many columns as both rows have are drawn.
pub fn comparison_image(
    originals: &[Vec<f32>],
    reconstructions: &[Vec<f32>],
    side: usize,
    scale: u32,
) -> GrayImage {
    let columns = originals.len().min(reconstructions.len()) as u32;
    let tile = side as u32 * scale;
    let width = BORDER + columns * (tile + BORDER);
    let height = BORDER + 2 * (tile + BORDER);

    let mut canvas = GrayImage::from_pixel(width, height, Luma([BACKGROUND]));
    for (row, images) in [originals, reconstructions].into_iter().enumerate() {
        for (column, pixels) in images.iter().take(columns as usize).enumerate() {
            let x0 = BORDER + column as u32 * (tile + BORDER);
            let y0 = BORDER + row as u32 * (tile + BORDER);
            for y in 0..tile {
                for x in 0..tile {
                    let index = (y / scale) as usize * side + (x / scale) as usize;
                    let value = pixels.get(index).copied().unwrap_or(0.0);
                    canvas.put_pixel(x0 + x, y0 + y, Luma([to_gray(value)]));
                }
            }
        }
    }
    canvas
}

fn to_gray(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Renders the comparison and writes it as a PNG file.
pub fn save_comparison(
    path: &Path,
    originals: &[Vec<f32>],
    reconstructions: &[Vec<f32>],
    side: usize,
    scale: u32,
) -> Result<()> {
    comparison_image(originals, reconstructions, side, scale).save(path)?;
    log::info!("Saved reconstructions to {path:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lays_out_two_rows_of_tiles() {
        let originals = vec![vec![1.0; 4]; 3];
        let reconstructions = vec![vec![0.0; 4]; 3];
        let image = comparison_image(&originals, &reconstructions, 2, 3);
        // 3 tiles of 6px with 2px borders
        assert_eq!(image.dimensions(), (2 + 3 * 8, 2 + 2 * 8));
        assert_eq!(image.get_pixel(0, 0).0, [BACKGROUND]);
        assert_eq!(image.get_pixel(2, 2).0, [255]);
        assert_eq!(image.get_pixel(7, 7).0, [255]);
        assert_eq!(image.get_pixel(2, 10).0, [0]);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let originals = vec![vec![-1.0, 2.0, 0.5, 0.0]];
        let image = comparison_image(&originals, &originals, 2, 1);
        assert_eq!(image.get_pixel(2, 2).0, [0]);
        assert_eq!(image.get_pixel(3, 2).0, [255]);
        assert_eq!(image.get_pixel(2, 3).0, [128]);
    }

    #[test]
    fn draws_only_paired_columns() {
        let originals = vec![vec![0.5; 4]; 5];
        let reconstructions = vec![vec![0.5; 4]; 2];
        let image = comparison_image(&originals, &reconstructions, 2, 1);
        assert_eq!(image.width(), 2 + 2 * 4);
    }

    #[test]
    fn writes_png() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("reconstruction_1.png");
        save_comparison(&path, &[vec![0.2; 4]], &[vec![0.8; 4]], 2, 4).unwrap();
        let decoded = image::open(&path).unwrap().into_luma8();
        assert_eq!(decoded.dimensions(), (2 + 10, 2 + 2 * 10));
    }
}
