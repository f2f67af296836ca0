//! Confusion-matrix rendering.

pub mod png;
pub mod text;

use crate::error::{FraudError, Result};
use crate::metrics::confusion::ConfusionMatrix;

pub use png::PngPlotter;
pub use text::TextPlotter;

/// Renders a run's confusion matrices for human inspection.
pub trait ConfusionPlotter {
    /// `matrices` and `titles` are non-empty and pair up one-to-one.
    fn plot(&mut self, matrices: &[ConfusionMatrix], titles: &[String]) -> Result<()>;
}

pub(crate) fn check_inputs(matrices: &[ConfusionMatrix], titles: &[String]) -> Result<()> {
    if matrices.is_empty() {
        return Err(FraudError::Plot("nothing to plot".into()));
    }
    if matrices.len() != titles.len() {
        return Err(FraudError::Plot(format!(
            "{} matrices but {} titles",
            matrices.len(),
            titles.len()
        )));
    }
    Ok(())
}

/// Fans one plot call out to several plotters.
#[derive(Default)]
pub struct MultiPlotter {
    plotters: Vec<Box<dyn ConfusionPlotter>>,
}

impl MultiPlotter {
    pub fn new() -> Self {
        MultiPlotter::default()
    }

    pub fn with(mut self, plotter: impl ConfusionPlotter + 'static) -> Self {
        self.plotters.push(Box::new(plotter));
        self
    }
}

impl ConfusionPlotter for MultiPlotter {
    fn plot(&mut self, matrices: &[ConfusionMatrix], titles: &[String]) -> Result<()> {
        check_inputs(matrices, titles)?;
        for p in &mut self.plotters {
            p.plot(matrices, titles)?;
        }
        Ok(())
    }
}
