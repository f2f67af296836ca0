use serde::{Serialize, Deserialize};

use crate::error::{FraudError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerKind {
    #[default]
    Standard,
    MinMax,
}

/// Per-feature scaling fit once on training rows and reused everywhere else.
///
/// Constant features (zero std / zero range) transform to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    Standard { mean: Vec<f64>, std: Vec<f64> },
    MinMax { min: Vec<f64>, max: Vec<f64> },
}

impl Scaler {
    pub fn fit(kind: ScalerKind, rows: &[Vec<f64>]) -> Result<Scaler> {
        let first = rows.first()
            .ok_or_else(|| FraudError::EmptyDataset("cannot fit a scaler on zero rows".into()))?;
        let n_features = first.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != n_features) {
            return Err(FraudError::DimensionMismatch { expected: n_features, got: bad.len() });
        }
        let n = rows.len() as f64;

        let scaler = match kind {
            ScalerKind::Standard => {
                let mean: Vec<f64> = (0..n_features)
                    .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n)
                    .collect();
                let std = (0..n_features)
                    .map(|j| {
                        let var = rows.iter().map(|r| (r[j] - mean[j]).powi(2)).sum::<f64>() / n;
                        var.sqrt()
                    })
                    .collect();
                Scaler::Standard { mean, std }
            }
            ScalerKind::MinMax => {
                let min = (0..n_features)
                    .map(|j| rows.iter().map(|r| r[j]).fold(f64::INFINITY, f64::min))
                    .collect();
                let max = (0..n_features)
                    .map(|j| rows.iter().map(|r| r[j]).fold(f64::NEG_INFINITY, f64::max))
                    .collect();
                Scaler::MinMax { min, max }
            }
        };
        Ok(scaler)
    }

    pub fn kind(&self) -> ScalerKind {
        match self {
            Scaler::Standard { .. } => ScalerKind::Standard,
            Scaler::MinMax { .. } => ScalerKind::MinMax,
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            Scaler::Standard { mean, .. } => mean.len(),
            Scaler::MinMax { min, .. } => min.len(),
        }
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(FraudError::DimensionMismatch { expected: self.n_features(), got: row.len() });
        }
        let out = match self {
            Scaler::Standard { mean, std } => row.iter().enumerate()
                .map(|(j, x)| if std[j] > 0.0 { (x - mean[j]) / std[j] } else { 0.0 })
                .collect(),
            Scaler::MinMax { min, max } => row.iter().enumerate()
                .map(|(j, x)| {
                    let range = max[j] - min[j];
                    if range > 0.0 { (x - min[j]) / range } else { 0.0 }
                })
                .collect(),
        };
        Ok(out)
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Vec<f64>> {
        vec![vec![1.0, 10.0], vec![3.0, 10.0], vec![5.0, 10.0]]
    }

    #[test]
    fn standard_centers_and_scales() {
        let s = Scaler::fit(ScalerKind::Standard, &rows()).unwrap();
        let t = s.transform(&[3.0, 10.0]).unwrap();
        assert!(t[0].abs() < 1e-12);
        // constant column maps to zero
        assert_eq!(t[1], 0.0);
        let hi = s.transform(&[5.0, 10.0]).unwrap();
        assert!((hi[0] - 1.224744871391589).abs() < 1e-9);
    }

    #[test]
    fn min_max_maps_to_unit_range() {
        let s = Scaler::fit(ScalerKind::MinMax, &rows()).unwrap();
        assert_eq!(s.transform(&[1.0, 10.0]).unwrap(), vec![0.0, 0.0]);
        assert_eq!(s.transform(&[5.0, 10.0]).unwrap(), vec![1.0, 0.0]);
        assert_eq!(s.kind(), ScalerKind::MinMax);
    }

    #[test]
    fn wrong_width_is_rejected() {
        let s = Scaler::fit(ScalerKind::Standard, &rows()).unwrap();
        assert!(matches!(
            s.transform(&[1.0]),
            Err(FraudError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn empty_fit_fails() {
        assert!(matches!(
            Scaler::fit(ScalerKind::Standard, &[]),
            Err(FraudError::EmptyDataset(_))
        ));
    }
}
