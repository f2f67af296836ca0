use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::anomaly::aggregate::{aggregate, group_indices, select, MerchantDayAggregate};
use crate::anomaly::fraud_model::FraudModel;
use crate::anomaly::schema::AggregateSchema;
use crate::data::raw::RawTransaction;
use crate::data::scaler::{Scaler, ScalerKind};
use crate::error::{FraudError, Result};
use crate::forest::{FitPredict, IsolationForest, IsolationForestParams};
use crate::train::checkpoint::{read_json, timestamped_path, write_json};

pub const ANOMALY_EXTENSION: &str = "iso.json";

/// Persisted merchant-day anomaly model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyCheckpoint {
    pub model: IsolationForest,
    pub scaler: Scaler,
    pub contamination: f64,
    pub schema: AggregateSchema,
    pub model_type: String,
    pub created_at: DateTime<Utc>,
}

impl AnomalyCheckpoint {
    /// Writes `IsoForest_<timestamp>.iso.json` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = timestamped_path(dir, "IsoForest", ANOMALY_EXTENSION);
        write_json(&path, self)?;
        info!(path = %path.display(), "anomaly checkpoint saved");
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

/// Scores how unusual one entity's activity on one day is.
///
/// Every component is optional so a scorer can be assembled piecemeal;
/// scoring names the first missing one instead of guessing.
#[derive(Debug, Clone, Default)]
pub struct MerchantDayScorer {
    model: Option<IsolationForest>,
    scaler: Option<Scaler>,
    is_fitted: bool,
    schema: AggregateSchema,
    fraud_model: Option<FraudModel>,
}

impl MerchantDayScorer {
    pub fn new(schema: AggregateSchema) -> Self {
        MerchantDayScorer { schema, ..Default::default() }
    }

    /// Rebuilds a fitted scorer. `fraud_model` is only consulted when the
    /// checkpoint's schema includes fraud probabilities.
    pub fn from_checkpoint(ckpt: AnomalyCheckpoint, fraud_model: Option<FraudModel>) -> Self {
        MerchantDayScorer {
            is_fitted: ckpt.model.is_fitted(),
            model: Some(ckpt.model),
            scaler: Some(ckpt.scaler),
            schema: ckpt.schema,
            fraud_model,
        }
    }

    pub fn load(path: &Path, fraud_model: Option<FraudModel>) -> Result<Self> {
        Ok(Self::from_checkpoint(AnomalyCheckpoint::load(path)?, fraud_model))
    }

    pub fn with_model(mut self, model: IsolationForest) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_scaler(mut self, scaler: Scaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    pub fn schema(&self) -> &AggregateSchema {
        &self.schema
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Trains the anomaly model on every (entity, day) group in `rows`.
    ///
    /// Passing a fraud model fixes the schema to include fraud probabilities;
    /// the rows must then carry that model's feature columns.
    pub fn fit(
        &mut self,
        rows: &[RawTransaction],
        fraud_model: Option<FraudModel>,
        params: IsolationForestParams,
    ) -> Result<()> {
        let groups = group_indices(rows);
        if groups.is_empty() {
            return Err(FraudError::EmptyDataset("no transactions to aggregate".into()));
        }
        let schema = AggregateSchema::new(fraud_model.is_some());

        let row_probs = match &fraud_model {
            Some(fm) => {
                let features: Vec<Vec<f64>> = rows.iter().map(|r| r.features.clone()).collect();
                Some(fm.fraud_probabilities(&features)?)
            }
            None => None,
        };

        let mut vectors = Vec::with_capacity(groups.len());
        for ((entity, day), idx) in &groups {
            let amounts: Vec<f64> = idx.iter().map(|&i| rows[i].amount).collect();
            let agg = MerchantDayAggregate::from_amounts(entity, day, &amounts);
            let probs: Option<Vec<f64>> = row_probs.as_ref()
                .map(|p| idx.iter().map(|&i| p[i]).collect());
            vectors.push(agg.to_features(&schema, probs.as_deref())?);
        }

        let scaler = Scaler::fit(ScalerKind::Standard, &vectors)?;
        let scaled = scaler.transform_all(&vectors)?;
        let mut model = IsolationForest::new(params);
        model.fit(&scaled, &[])?;

        info!(
            groups = vectors.len(),
            features = schema.n_features(),
            with_fraud_probability = schema.include_fraud_probability,
            "merchant-day anomaly model fitted"
        );
        self.model = Some(model);
        self.scaler = Some(scaler);
        self.schema = schema;
        self.fraud_model = fraud_model;
        self.is_fitted = true;
        Ok(())
    }

    /// Isolation score in (0, 1] for `entity` on `day`; higher is more
    /// anomalous. Not a calibrated probability.
    pub fn predict_for_entity_day(&self, rows: &[RawTransaction], entity: &str, day: &str) -> Result<f64> {
        let model = self.model.as_ref().ok_or(FraudError::MissingComponent("anomaly model"))?;
        let scaler = self.scaler.as_ref().ok_or(FraudError::MissingComponent("scaler"))?;
        if !self.is_fitted {
            return Err(FraudError::MissingComponent("fitted anomaly model"));
        }
        let fraud_model = match (self.schema.include_fraud_probability, &self.fraud_model) {
            (true, None) => return Err(FraudError::MissingComponent("fraud model")),
            (true, Some(fm)) => Some(fm),
            (false, _) => None,
        };

        let agg = aggregate(rows, entity, day)?;
        let probs = match fraud_model {
            Some(fm) => {
                let features: Vec<Vec<f64>> = select(rows, entity, day).iter()
                    .map(|r| r.features.clone())
                    .collect();
                Some(fm.fraud_probabilities(&features)?)
            }
            None => None,
        };
        let vector = agg.to_features(&self.schema, probs.as_deref())?;
        let scaled = scaler.transform(&vector)?;
        let score = model.score_samples(&[scaled])?
            .pop()
            .ok_or(FraudError::NotFitted("isolation forest"))?;
        debug!(entity, day, count = agg.count, score, "merchant-day scored");
        Ok(score)
    }

    /// Whether the score crosses the threshold learned from `contamination`.
    pub fn is_anomalous(&self, score: f64) -> Result<bool> {
        let model = self.model.as_ref().ok_or(FraudError::MissingComponent("anomaly model"))?;
        Ok(score >= model.threshold())
    }

    pub fn to_checkpoint(&self) -> Result<AnomalyCheckpoint> {
        let model = self.model.clone().ok_or(FraudError::MissingComponent("anomaly model"))?;
        let scaler = self.scaler.clone().ok_or(FraudError::MissingComponent("scaler"))?;
        if !self.is_fitted {
            return Err(FraudError::MissingComponent("fitted anomaly model"));
        }
        Ok(AnomalyCheckpoint {
            contamination: model.params.contamination,
            model_type: model.model_type().to_string(),
            model,
            scaler,
            schema: self.schema,
            created_at: Utc::now(),
        })
    }

    pub fn persist(&self, dir: &Path) -> Result<PathBuf> {
        self.to_checkpoint()?.save(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<RawTransaction> {
        let mut rows = Vec::new();
        for entity in 0..12 {
            for day in 1..=6 {
                let day = format!("{day:02}062025");
                for k in 0..3 {
                    let amount = 20.0 + (entity as f64) + k as f64;
                    rows.push(RawTransaction::new(format!("E{entity}"), day.clone(), amount));
                }
            }
        }
        // one burst day far outside everyone's usual pattern
        for _ in 0..40 {
            rows.push(RawTransaction::new("E0", "07062025", 900.0));
        }
        rows.push(RawTransaction::new("E0", "07062025", 3.0));
        rows
    }

    fn params() -> IsolationForestParams {
        IsolationForestParams { n_estimators: 50, ..Default::default() }
    }

    #[test]
    fn unfitted_scorer_names_missing_component() {
        let rows = history();
        let scorer = MerchantDayScorer::default();
        match scorer.predict_for_entity_day(&rows, "E1", "01062025") {
            Err(FraudError::MissingComponent(name)) => assert_eq!(name, "anomaly model"),
            other => panic!("unexpected {other:?}"),
        }

        let scorer = MerchantDayScorer::default().with_model(IsolationForest::default());
        assert!(matches!(
            scorer.predict_for_entity_day(&rows, "E1", "01062025"),
            Err(FraudError::MissingComponent("scaler"))
        ));

        let scaler = Scaler::fit(ScalerKind::Standard, &[vec![1.0; 5], vec![2.0; 5]]).unwrap();
        let scorer = scorer.with_scaler(scaler);
        assert!(matches!(
            scorer.predict_for_entity_day(&rows, "E1", "01062025"),
            Err(FraudError::MissingComponent("fitted anomaly model"))
        ));
    }

    #[test]
    fn failed_fit_leaves_scorer_unfitted() {
        let mut scorer = MerchantDayScorer::default();
        let params = IsolationForestParams { n_estimators: 0, ..Default::default() };
        assert!(matches!(scorer.fit(&history(), None, params), Err(FraudError::InvalidConfig(_))));
        assert!(!scorer.is_fitted());
        assert!(matches!(
            scorer.predict_for_entity_day(&history(), "E1", "01062025"),
            Err(FraudError::MissingComponent("anomaly model"))
        ));
    }

    #[test]
    fn schema_requiring_fraud_model_fails_without_it() {
        let mut scorer = MerchantDayScorer::default();
        scorer.fit(&history(), None, params()).unwrap();
        let ckpt = scorer.to_checkpoint().unwrap();
        let ckpt = AnomalyCheckpoint { schema: AggregateSchema::with_fraud_probability(), ..ckpt };
        let scorer = MerchantDayScorer::from_checkpoint(ckpt, None);
        assert!(matches!(
            scorer.predict_for_entity_day(&history(), "E1", "01062025"),
            Err(FraudError::MissingComponent("fraud model"))
        ));
    }

    #[test]
    fn burst_day_scores_higher_than_a_normal_day() {
        let rows = history();
        let mut scorer = MerchantDayScorer::default();
        scorer.fit(&rows, None, params()).unwrap();

        let normal = scorer.predict_for_entity_day(&rows, "E5", "03062025").unwrap();
        let burst = scorer.predict_for_entity_day(&rows, "E0", "07062025").unwrap();
        assert!(burst > normal, "burst {burst} vs normal {normal}");
        assert!(burst > 0.0 && burst <= 1.0);
    }

    #[test]
    fn unknown_pair_is_empty_aggregate() {
        let rows = history();
        let mut scorer = MerchantDayScorer::default();
        scorer.fit(&rows, None, params()).unwrap();
        assert!(matches!(
            scorer.predict_for_entity_day(&rows, "nobody", "01062025"),
            Err(FraudError::EmptyAggregate { .. })
        ));
    }

    #[test]
    fn checkpoint_round_trip_keeps_scores() {
        let dir = tempfile::TempDir::new().unwrap();
        let rows = history();
        let mut scorer = MerchantDayScorer::default();
        scorer.fit(&rows, None, params()).unwrap();
        let path = scorer.persist(dir.path()).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("IsoForest_"));

        let reloaded = MerchantDayScorer::load(&path, None).unwrap();
        assert_eq!(reloaded.schema(), scorer.schema());
        let a = scorer.predict_for_entity_day(&rows, "E2", "02062025").unwrap();
        let b = reloaded.predict_for_entity_day(&rows, "E2", "02062025").unwrap();
        assert!((a - b).abs() < 1e-9);
    }
}
