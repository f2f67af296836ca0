pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod metrics;
pub mod forest;
pub mod train;
pub mod plot;
pub mod anomaly;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::network::Network;
pub use loss::bce_logits::BceWithLogitsLoss;
pub use optim::{Adam, Optimizer, OptimizerKind, Sgd};
pub use data::{Dataset, FeatureColumns, RawTransaction, Scaler, ScalerKind};
pub use metrics::{apply_threshold, ConfusionMatrix};
pub use forest::{FitPredict, FitPredictModel, IsolationForest, RandomForest};
pub use train::{
    Device, FeedForward, FitPredictLifecycle, GradientLifecycle, Hyperparams, Lifecycle,
    LogisticRegression, ModelFamily, TrainingConfig,
};
pub use plot::{ConfusionPlotter, PngPlotter, TextPlotter};
pub use anomaly::{AggregateSchema, FraudModel, MerchantDayScorer};
pub use error::{FraudError, Result};
