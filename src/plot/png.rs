use std::path::PathBuf;

use image::{Rgb, RgbImage};
use tracing::info;

use crate::error::Result;
use crate::metrics::confusion::ConfusionMatrix;
use crate::plot::{check_inputs, ConfusionPlotter};

const CELL: u32 = 64;
const GAP: u32 = 16;
const BORDER: Rgb<u8> = Rgb([40, 40, 40]);
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Renders matrices left to right as 2x2 heat-maps in one PNG.
///
/// Each cell is shaded by its share of the actual-class row, so a perfect
/// classifier shows a dark diagonal. Titles are not drawn.
pub struct PngPlotter {
    pub path: PathBuf,
}

impl PngPlotter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PngPlotter { path: path.into() }
    }

    fn shade(fraction: f64) -> Rgb<u8> {
        // white -> deep blue
        let f = fraction.clamp(0.0, 1.0);
        let lerp = |from: f64, to: f64| (from + (to - from) * f).round() as u8;
        Rgb([lerp(247.0, 8.0), lerp(251.0, 48.0), lerp(255.0, 107.0)])
    }

    pub fn render(matrices: &[ConfusionMatrix]) -> RgbImage {
        let n = matrices.len() as u32;
        let block = 2 * CELL;
        let width = n * block + (n + 1) * GAP;
        let height = block + 2 * GAP;
        let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

        for (m, cm) in matrices.iter().enumerate() {
            let x0 = GAP + m as u32 * (block + GAP);
            let y0 = GAP;
            for actual in 0..2 {
                let row_total: usize = cm.cells[actual].iter().sum();
                for predicted in 0..2 {
                    let fraction = if row_total == 0 {
                        0.0
                    } else {
                        cm.cells[actual][predicted] as f64 / row_total as f64
                    };
                    let color = Self::shade(fraction);
                    let cx = x0 + predicted as u32 * CELL;
                    let cy = y0 + actual as u32 * CELL;
                    for dy in 0..CELL {
                        for dx in 0..CELL {
                            let edge = dx == 0 || dy == 0 || dx == CELL - 1 || dy == CELL - 1;
                            img.put_pixel(cx + dx, cy + dy, if edge { BORDER } else { color });
                        }
                    }
                }
            }
        }
        img
    }
}

impl ConfusionPlotter for PngPlotter {
    fn plot(&mut self, matrices: &[ConfusionMatrix], titles: &[String]) -> Result<()> {
        check_inputs(matrices, titles)?;
        Self::render(matrices).save(&self.path)?;
        info!(path = %self.path.display(), panels = matrices.len(), "confusion matrices rendered");
        Ok(())
    }
}
