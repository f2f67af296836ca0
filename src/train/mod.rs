pub mod checkpoint;
pub mod epoch_stats;
pub mod family;
pub mod fit_predict;
pub mod gradient;
pub mod lifecycle;
pub mod loop_fn;
pub mod train_config;

pub use checkpoint::{Checkpoint, FitPredictCheckpoint, GradientCheckpoint};
pub use epoch_stats::EpochStats;
pub use family::{FeedForward, GradientComponents, Hyperparams, LogisticRegression, ModelFamily};
pub use fit_predict::FitPredictLifecycle;
pub use gradient::GradientLifecycle;
pub use lifecycle::Lifecycle;
pub use loop_fn::{predict_scores, run_one_epoch};
pub use train_config::{Device, TrainingConfig};
