use std::fmt;

use serde::{Serialize, Deserialize};

use crate::error::{FraudError, Result};

/// 2x2 table of counts indexed `cells[actual][predicted]`, label 1 = fraud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub cells: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Counts (actual, predicted) pairs. Actual labels >= 0.5 count as positive.
    pub fn from_predictions(actual: &[f64], predicted: &[u8]) -> Result<ConfusionMatrix> {
        if actual.len() != predicted.len() {
            return Err(FraudError::DimensionMismatch { expected: actual.len(), got: predicted.len() });
        }
        let mut cm = ConfusionMatrix::default();
        for (&y, &p) in actual.iter().zip(predicted.iter()) {
            let a = usize::from(y >= 0.5);
            cm.cells[a][usize::from(p != 0)] += 1;
        }
        Ok(cm)
    }

    pub fn true_negatives(&self) -> usize { self.cells[0][0] }
    pub fn false_positives(&self) -> usize { self.cells[0][1] }
    pub fn false_negatives(&self) -> usize { self.cells[1][0] }
    pub fn true_positives(&self) -> usize { self.cells[1][1] }

    pub fn total(&self) -> usize {
        self.cells.iter().flatten().sum()
    }

    /// (tn + tp) / total; 0 for an empty matrix.
    pub fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            n => (self.true_negatives() + self.true_positives()) as f64 / n as f64,
        }
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives(), self.true_positives() + self.false_positives())
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives(), self.true_positives() + self.false_negatives())
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Binary predictions: 1 where the probability reaches `threshold`.
pub fn apply_threshold(probabilities: &[f64], threshold: f64) -> Vec<u8> {
    probabilities.iter().map(|&p| u8::from(p >= threshold)).collect()
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "              pred 0    pred 1")?;
        writeln!(f, "actual 0  {:>9} {:>9}", self.cells[0][0], self.cells[0][1])?;
        write!(f, "actual 1  {:>9} {:>9}", self.cells[1][0], self.cells[1][1])
    }
}
