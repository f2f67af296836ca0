use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "ferrite-fraud")]
#[command(author, version, about = "Fraud-detection model training and merchant-day anomaly scoring")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum ForestKind {
    RandomForest,
    IsolationForest,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OptimizerChoice {
    Sgd,
    Adam,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ActivationChoice {
    Relu,
    LeakyRelu,
    Tanh,
    Sigmoid,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FamilyChoice {
    Logistic,
    FeedForward,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit a tree ensemble once, evaluate it and save a checkpoint
    TrainForest {
        /// Training CSV
        #[arg(long = "train_file")]
        train_file: PathBuf,

        /// Test CSV
        #[arg(long = "test_file")]
        test_file: PathBuf,

        /// Fraud probability at or above which a row is flagged
        #[arg(long, default_value = "0.5")]
        threshold: f64,

        #[arg(long, value_enum, default_value = "random_forest")]
        model: ForestKind,

        /// Number of trees
        #[arg(long, default_value = "100")]
        trees: usize,

        /// Directory checkpoints are written to
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[arg(long)]
        seed: Option<u64>,

        /// Also render the confusion matrix to this PNG
        #[arg(long)]
        plot: Option<PathBuf>,
    },

    /// Train a neural network or logistic regression with mini-batch descent
    TrainNn {
        /// Training CSV
        #[arg(long = "train_file")]
        train_file: PathBuf,

        /// Test CSV
        #[arg(long = "test_file")]
        test_file: PathBuf,

        #[arg(long, default_value = "0.5")]
        threshold: f64,

        #[arg(long, value_enum, default_value = "feed-forward")]
        family: FamilyChoice,

        #[arg(long, default_value = "64")]
        batch_size: usize,

        /// Overrides the hyperparameter file
        #[arg(long)]
        epochs: Option<usize>,

        /// Hidden layer widths, comma separated
        #[arg(long, value_delimiter = ',')]
        hidden: Option<Vec<usize>>,

        #[arg(long)]
        learning_rate: Option<f64>,

        #[arg(long, value_enum)]
        optimizer: Option<OptimizerChoice>,

        /// Hidden layer activation (feed-forward only)
        #[arg(long, value_enum)]
        activation: Option<ActivationChoice>,

        /// Evaluation threads (0 = one per core); omit to stay on one thread
        #[arg(long)]
        threads: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Keep the first undersampled training set for every epoch
        #[arg(long)]
        no_resample: bool,

        /// JSON file with hyperparameters
        #[arg(long)]
        hyperparams: Option<PathBuf>,

        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Render the per-epoch confusion matrices to this PNG
        #[arg(long)]
        plot: Option<PathBuf>,
    },

    /// Fit the merchant-day anomaly model on raw transactions
    TrainAnomaly {
        /// Raw transactions CSV with entity, date and amount columns
        #[arg(long)]
        raw_file: PathBuf,

        /// Supervised checkpoint whose fraud probabilities enrich each day
        #[arg(long)]
        fraud_model: Option<PathBuf>,

        #[arg(long, default_value = "0.1")]
        contamination: f64,

        #[arg(long, default_value = "100")]
        trees: usize,

        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Score one entity's activity on one day
    Score {
        #[arg(long)]
        raw_file: PathBuf,

        /// Anomaly checkpoint written by train-anomaly
        #[arg(long)]
        anomaly_model: PathBuf,

        #[arg(long)]
        fraud_model: Option<PathBuf>,

        /// Entity key; a random (entity, day) pair is used when omitted
        #[arg(long, requires = "day")]
        entity: Option<String>,

        /// Day as ddmmyyyy
        #[arg(long, requires = "entity")]
        day: Option<String>,
    },

    /// Copy a CSV, adding a random transaction day to every row
    AddDates {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// First day (ddmmyyyy)
        #[arg(long, default_value = "01062025")]
        start: String,

        /// Last day (ddmmyyyy), inclusive
        #[arg(long, default_value = "15062025")]
        end: String,

        #[arg(long, default_value = "date")]
        column: String,

        #[arg(long)]
        seed: Option<u64>,
    },
}
