use std::path::PathBuf;

use rand::{rngs::StdRng, SeedableRng};

use crate::data::reader::{read_table, Dataset, ReadOptions, Table};
use crate::error::Result;
use crate::metrics::confusion::ConfusionMatrix;
use crate::plot::ConfusionPlotter;
use crate::train::train_config::TrainingConfig;

/// The outer contract both model families share, so entry points can drive
/// either one the same way.
pub trait Lifecycle {
    /// One unit of training: an epoch for gradient models, the single fit
    /// call for fit/predict models.
    fn train(&mut self) -> Result<()>;

    /// Scores the test set and returns its confusion matrix.
    fn evaluate(&mut self) -> Result<ConfusionMatrix>;

    /// Full train/evaluate(/persist) cycle; hands the matrices to `plotter`
    /// and returns them in order.
    fn run_training_loop(&mut self, plotter: &mut dyn ConfusionPlotter) -> Result<Vec<ConfusionMatrix>>;

    /// Writes a checkpoint and returns its path.
    fn persist(&self) -> Result<PathBuf>;

    fn model_type(&self) -> &str;
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Training and test data for one lifecycle. The test set is always scaled
/// with the scaler fit on the (undersampled) training set.
pub(crate) struct Splits {
    pub train_table: Table,
    pub train_set: Dataset,
    pub test_set: Dataset,
}

impl Splits {
    pub fn read(config: &TrainingConfig, rng: &mut StdRng) -> Result<Splits> {
        let train_table = read_table(&config.train_file, &config.columns)?;
        let test_table = read_table(&config.test_file, &config.columns)?;
        Splits::from_tables(config, train_table, &test_table, rng)
    }

    pub fn from_tables(
        config: &TrainingConfig,
        train_table: Table,
        test_table: &Table,
        rng: &mut StdRng,
    ) -> Result<Splits> {
        let train_set = Dataset::from_table(
            &train_table,
            ReadOptions::training(config.undersample_ratio, config.scaler_kind),
            rng,
        )?;
        let test_set = Dataset::from_table(
            test_table,
            ReadOptions::with_scaler(train_set.scaler().clone()),
            rng,
        )?;
        Ok(Splits { train_table, train_set, test_set })
    }
}
