use std::path::PathBuf;
use std::time::Instant;

use rand::rngs::StdRng;
use rayon::ThreadPool;
use tracing::{debug, info};

use crate::activation::sigmoid;
use crate::data::reader::{Dataset, ReadOptions, Table};
use crate::data::scaler::Scaler;
use crate::error::{FraudError, Result};
use crate::loss::bce_logits::BceWithLogitsLoss;
use crate::metrics::confusion::{apply_threshold, ConfusionMatrix};
use crate::network::network::Network;
use crate::optim::Optimizer;
use crate::plot::ConfusionPlotter;
use crate::train::checkpoint::{GradientCheckpoint, GRADIENT_EXTENSION, GRADIENT_MODEL_TYPE};
use crate::train::epoch_stats::EpochStats;
use crate::train::family::ModelFamily;
use crate::train::lifecycle::{seeded_rng, Lifecycle, Splits};
use crate::train::loop_fn::{predict_scores, run_one_epoch};
use crate::train::train_config::TrainingConfig;

/// Mini-batch training of a `ModelFamily` network.
///
/// The scaler is fit once, on the first undersampled training set, and is
/// reused for every redraw and for the test set, so each epoch's checkpoint
/// carries the same scaler the network was trained against.
pub struct GradientLifecycle<F: ModelFamily> {
    config: TrainingConfig,
    family: F,
    rng: StdRng,
    pool: Option<ThreadPool>,
    train_table: Table,
    train_set: Dataset,
    test_set: Dataset,
    network: Network,
    loss: BceWithLogitsLoss,
    optimizer: Box<dyn Optimizer>,
    epochs: usize,
    history: Vec<EpochStats>,
}

impl<F: ModelFamily> GradientLifecycle<F> {
    /// Reads both CSV files and initializes the family's network.
    pub fn new(config: TrainingConfig, family: F) -> Result<Self> {
        config.validate()?;
        let mut rng = seeded_rng(config.seed);
        let splits = Splits::read(&config, &mut rng)?;
        Self::assemble(config, family, rng, splits)
    }

    /// Same as `new` but from tables already in memory.
    pub fn from_tables(config: TrainingConfig, family: F, train: Table, test: &Table) -> Result<Self> {
        config.validate()?;
        let mut rng = seeded_rng(config.seed);
        let splits = Splits::from_tables(&config, train, test, &mut rng)?;
        Self::assemble(config, family, rng, splits)
    }

    fn assemble(config: TrainingConfig, family: F, mut rng: StdRng, splits: Splits) -> Result<Self> {
        let n_features = splits.train_set.n_features();
        let pool = config.device.pool()?;
        let parts = family.initialize(n_features, &mut rng)?;
        if parts.network.input_size() != n_features {
            return Err(FraudError::DimensionMismatch {
                expected: n_features,
                got: parts.network.input_size(),
            });
        }
        info!(
            family = family.family_name(),
            features = n_features,
            train_rows = splits.train_set.len(),
            test_rows = splits.test_set.len(),
            epochs = parts.epochs,
            optimizer = parts.optimizer.name(),
            threads = pool.as_ref().map_or(1, ThreadPool::current_num_threads),
            "gradient lifecycle ready"
        );
        Ok(GradientLifecycle {
            pool,
            config,
            family,
            rng,
            train_table: splits.train_table,
            train_set: splits.train_set,
            test_set: splits.test_set,
            network: parts.network,
            loss: parts.loss,
            optimizer: parts.optimizer,
            epochs: parts.epochs,
            history: Vec::new(),
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
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

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Per-epoch records of the last `run_epochs` call.
    pub fn history(&self) -> &[EpochStats] {
        &self.history
    }

    /// One pass over the current training set; returns its mean batch loss.
    /// A non-finite loss stops training with `Diverged`.
    pub fn train_one_epoch(&mut self) -> Result<f64> {
        let loss = run_one_epoch(
            &mut self.network,
            &self.train_set.features,
            &self.train_set.target,
            self.optimizer.as_mut(),
            &self.loss,
            self.config.batch_size,
            &mut self.rng,
        );
        if !loss.is_finite() {
            return Err(FraudError::Diverged { epoch: self.history.len() + 1, loss });
        }
        Ok(loss)
    }

    /// Fraud probabilities for the test set.
    pub fn test_probabilities(&self) -> Result<Vec<f64>> {
        let scores = predict_scores(&self.network, &self.test_set.features, self.pool.as_ref())?;
        Ok(scores.into_iter().map(sigmoid).collect())
    }

    /// Draws a fresh undersampled training set, scaled with the existing scaler.
    pub fn resample_training_set(&mut self) -> Result<()> {
        let mut options = ReadOptions::with_scaler(self.train_set.scaler().clone());
        options.undersample = Some(self.config.undersample_ratio);
        self.train_set = Dataset::from_table(&self.train_table, options, &mut self.rng)?;
        debug!(rows = self.train_set.len(), positives = self.train_set.positives(), "training set redrawn");
        Ok(())
    }

    /// Trains for the family's epoch count. After every epoch the test set is
    /// scored, a checkpoint is written and the confusion matrix kept; the
    /// matrices go to `plotter` at the end.
    pub fn run_epochs(&mut self, plotter: &mut dyn ConfusionPlotter) -> Result<Vec<EpochStats>> {
        self.history.clear();
        for epoch in 1..=self.epochs {
            let started = Instant::now();
            if epoch > 1 && self.config.resample_each_epoch {
                self.resample_training_set()?;
            }
            let train_loss = self.train_one_epoch()?;
            let confusion = self.evaluate()?;
            let checkpoint = self.persist()?;
            let stats = EpochStats {
                epoch,
                total_epochs: self.epochs,
                train_loss,
                train_rows: self.train_set.len(),
                confusion,
                accuracy: confusion.accuracy(),
                checkpoint,
                elapsed_ms: started.elapsed().as_millis() as u64,
            };
            info!(
                epoch,
                total = self.epochs,
                loss = format_args!("{train_loss:.5}"),
                accuracy = format_args!("{:.2}%", stats.accuracy * 100.0),
                elapsed_ms = stats.elapsed_ms,
                "epoch complete"
            );
            self.history.push(stats);
        }

        let matrices: Vec<ConfusionMatrix> = self.history.iter().map(|s| s.confusion).collect();
        plotter.plot(&matrices, &self.family.titles(self.epochs))?;
        Ok(self.history.clone())
    }
}

impl<F: ModelFamily> Lifecycle for GradientLifecycle<F> {
    fn train(&mut self) -> Result<()> {
        self.train_one_epoch().map(|_| ())
    }

    fn evaluate(&mut self) -> Result<ConfusionMatrix> {
        let predicted = apply_threshold(&self.test_probabilities()?, self.config.threshold);
        let cm = ConfusionMatrix::from_predictions(&self.test_set.target, &predicted)?;
        debug!(%cm, "test set evaluated");
        Ok(cm)
    }

    fn run_training_loop(&mut self, plotter: &mut dyn ConfusionPlotter) -> Result<Vec<ConfusionMatrix>> {
        let stats = self.run_epochs(plotter)?;
        Ok(stats.into_iter().map(|s| s.confusion).collect())
    }

    fn persist(&self) -> Result<PathBuf> {
        GradientCheckpoint::new(
            self.network.clone(),
            self.config.threshold,
            GRADIENT_MODEL_TYPE,
            self.scaler().clone(),
            self.family.family_name(),
            self.config.columns.clone(),
        )
        .save(&self.config.output_dir, GRADIENT_EXTENSION)
    }

    fn model_type(&self) -> &str {
        GRADIENT_MODEL_TYPE
    }
}
