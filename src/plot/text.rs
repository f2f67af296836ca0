use std::io::Write;

use crate::error::Result;
use crate::metrics::confusion::ConfusionMatrix;
use crate::plot::{check_inputs, ConfusionPlotter};

/// Writes each matrix as a titled table with accuracy, precision and recall.
pub struct TextPlotter<W: Write> {
    out: W,
}

impl TextPlotter<std::io::Stdout> {
    pub fn stdout() -> Self {
        TextPlotter { out: std::io::stdout() }
    }
}

impl<W: Write> TextPlotter<W> {
    pub fn new(out: W) -> Self {
        TextPlotter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ConfusionPlotter for TextPlotter<W> {
    fn plot(&mut self, matrices: &[ConfusionMatrix], titles: &[String]) -> Result<()> {
        check_inputs(matrices, titles)?;
        for (cm, title) in matrices.iter().zip(titles) {
            writeln!(self.out, "== {title} ==")?;
            writeln!(self.out, "{cm}")?;
            writeln!(
                self.out,
                "accuracy {:.2}%  precision {:.3}  recall {:.3}  f1 {:.3}\n",
                cm.accuracy() * 100.0,
                cm.precision(),
                cm.recall(),
                cm.f1()
            )?;
        }
        self.out.flush()?;
        Ok(())
    }
}
