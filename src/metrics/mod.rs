pub mod confusion;

pub use confusion::{apply_threshold, ConfusionMatrix};
