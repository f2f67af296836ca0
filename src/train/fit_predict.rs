use std::path::PathBuf;

use tracing::{debug, info};

use crate::data::reader::{Dataset, Table};
use crate::data::scaler::Scaler;
use crate::error::{FraudError, Result};
use crate::forest::{FitPredict, FitPredictModel};
use crate::metrics::confusion::{apply_threshold, ConfusionMatrix};
use crate::plot::ConfusionPlotter;
use crate::train::checkpoint::{FitPredictCheckpoint, FIT_PREDICT_EXTENSION};
use crate::train::lifecycle::{seeded_rng, Lifecycle, Splits};
use crate::train::train_config::TrainingConfig;

/// Single-fit lifecycle for models such as random and isolation forests.
///
/// The model is assigned after construction; until then `train`, `evaluate`
/// and `persist` fail with `UndefinedModel` and leave the lifecycle untouched.
pub struct FitPredictLifecycle {
    config: TrainingConfig,
    train_set: Dataset,
    test_set: Dataset,
    model: Option<FitPredictModel>,
    titles: Vec<String>,
    last_confusion: Option<ConfusionMatrix>,
}

impl FitPredictLifecycle {
    /// Reads the undersampled training set and the test set; no model yet.
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = seeded_rng(config.seed);
        let splits = Splits::read(&config, &mut rng)?;
        Ok(Self::assemble(config, splits))
    }

    /// Same as `new` but from tables already in memory.
    pub fn from_tables(config: TrainingConfig, train: Table, test: &Table) -> Result<Self> {
        config.validate()?;
        let mut rng = seeded_rng(config.seed);
        let splits = Splits::from_tables(&config, train, test, &mut rng)?;
        Ok(Self::assemble(config, splits))
    }

    fn assemble(config: TrainingConfig, splits: Splits) -> Self {
        info!(
            train_rows = splits.train_set.len(),
            test_rows = splits.test_set.len(),
            "fit/predict lifecycle ready"
        );
        FitPredictLifecycle {
            config,
            train_set: splits.train_set,
            test_set: splits.test_set,
            model: None,
            titles: vec!["Model Training".to_string()],
            last_confusion: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<FitPredictModel>) -> Self {
        self.set_model(model);
        self
    }

    /// Assigns the model and titles the plot after it.
    pub fn set_model(&mut self, model: impl Into<FitPredictModel>) {
        let model = model.into();
        self.titles = vec![format!("{} Confusion Matrix", model.model_type())];
        self.model = Some(model);
    }

    pub fn with_titles(mut self, titles: Vec<String>) -> Self {
        self.titles = titles;
        self
    }

    pub fn model(&self) -> Option<&FitPredictModel> {
        self.model.as_ref()
    }

    pub fn scaler(&self) -> &Scaler {
        self.train_set.scaler()
    }

    pub fn train_set(&self) -> &Dataset {
        &self.train_set
    }

    pub fn test_set(&self) -> &Dataset {
        &self.test_set
    }

    pub fn last_confusion(&self) -> Option<&ConfusionMatrix> {
        self.last_confusion.as_ref()
    }

    fn defined_model(&self) -> Result<&FitPredictModel> {
        self.model.as_ref().ok_or(FraudError::UndefinedModel)
    }

    /// Test-set labels: thresholded probabilities for supervised models,
    /// raw labels (1 = anomalous) otherwise.
    fn predicted_labels(&self) -> Result<Vec<u8>> {
        let model = self.defined_model()?;
        if model.is_supervised() {
            let probs = model.predict_proba(&self.test_set.features)?;
            Ok(apply_threshold(&probs, self.config.threshold))
        } else {
            model.predict(&self.test_set.features)
        }
    }
}

impl Lifecycle for FitPredictLifecycle {
    fn train(&mut self) -> Result<()> {
        let model = self.model.as_mut().ok_or(FraudError::UndefinedModel)?;
        info!(model = model.model_type(), rows = self.train_set.len(), "fitting");
        model.fit(&self.train_set.features, &self.train_set.target)
    }

    fn evaluate(&mut self) -> Result<ConfusionMatrix> {
        let predicted = self.predicted_labels()?;
        let cm = ConfusionMatrix::from_predictions(&self.test_set.target, &predicted)?;
        debug!(%cm, "test set evaluated");
        self.last_confusion = Some(cm);
        Ok(cm)
    }

    fn run_training_loop(&mut self, plotter: &mut dyn ConfusionPlotter) -> Result<Vec<ConfusionMatrix>> {
        self.train()?;
        let cm = self.evaluate()?;
        info!(
            model = self.model_type(),
            accuracy = format_args!("{:.2}%", cm.accuracy() * 100.0),
            "training complete"
        );
        plotter.plot(&[cm], &self.titles)?;
        Ok(vec![cm])
    }

    fn persist(&self) -> Result<PathBuf> {
        let model = self.defined_model()?;
        let model_type = model.model_type();
        FitPredictCheckpoint::new(
            model.clone(),
            self.config.threshold,
            model_type,
            self.scaler().clone(),
            model_type,
            self.config.columns.clone(),
        )
        .save(&self.config.output_dir, FIT_PREDICT_EXTENSION)
    }

    fn model_type(&self) -> &str {
        self.model.as_ref().map_or("Undefined", |m| m.model_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::columns::FeatureColumns;
    use crate::forest::{IsolationForest, IsolationForestParams, RandomForest, RandomForestParams};
    use crate::plot::TextPlotter;

    fn table(n: usize) -> Table {
        let mut t = Table::default();
        for i in 0..n {
            let fraud = i % 5 == 0;
            let x = (i % 7) as f64;
            t.features.push(vec![if fraud { 50.0 + x } else { x }, x]);
            t.targets.push(if fraud { 1.0 } else { 0.0 });
        }
        t
    }

    fn lifecycle(dir: &std::path::Path) -> FitPredictLifecycle {
        let config = TrainingConfig::new("unused", "unused")
            .with_columns(FeatureColumns::new(vec!["a".into(), "b".into()], "y"))
            .with_output_dir(dir)
            .with_seed(Some(3));
        FitPredictLifecycle::from_tables(config, table(100), &table(30)).unwrap()
    }

    fn small_forest() -> RandomForest {
        RandomForest::new(RandomForestParams { n_estimators: 10, ..Default::default() })
    }

    #[test]
    fn train_without_model_is_undefined() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut lc = lifecycle(dir.path());
        let before = lc.train_set().features.clone();
        assert!(matches!(lc.train(), Err(FraudError::UndefinedModel)));
        assert!(matches!(lc.evaluate(), Err(FraudError::UndefinedModel)));
        assert!(matches!(lc.persist(), Err(FraudError::UndefinedModel)));
        assert!(lc.model().is_none());
        assert!(lc.last_confusion().is_none());
        assert_eq!(lc.train_set().features, before);
    }

    #[test]
    fn random_forest_separates_easy_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut lc = lifecycle(dir.path()).with_model(small_forest());
        let mut plotter = TextPlotter::new(Vec::new());
        let cms = lc.run_training_loop(&mut plotter).unwrap();
        assert_eq!(cms.len(), 1);
        assert_eq!(cms[0].total(), 30);
        assert!(cms[0].accuracy() > 0.9);
        let text = String::from_utf8(plotter.into_inner()).unwrap();
        assert!(text.contains("RandomForest Confusion Matrix"));
    }

    #[test]
    fn isolation_forest_uses_raw_labels() {
        let dir = tempfile::TempDir::new().unwrap();
        let params = IsolationForestParams { n_estimators: 20, contamination: 0.2, ..Default::default() };
        let mut lc = lifecycle(dir.path()).with_model(IsolationForest::new(params));
        lc.train().unwrap();
        let cm = lc.evaluate().unwrap();
        assert_eq!(cm.total(), 30);
        assert_eq!(lc.last_confusion(), Some(&cm));
    }

    #[test]
    fn persisted_checkpoint_names_the_model() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut lc = lifecycle(dir.path()).with_model(small_forest());
        lc.train().unwrap();
        let path = lc.persist().unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("RandomForestModel_"));
        assert!(name.ends_with(".fp.json"));

        let ckpt = FitPredictCheckpoint::load(&path).unwrap();
        assert_eq!(ckpt.model_type, "RandomForest");
        assert_eq!(ckpt.threshold, 0.5);
        assert!(ckpt.model.is_fitted());
    }
}
