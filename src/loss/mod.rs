pub mod bce_logits;

pub use bce_logits::BceWithLogitsLoss;
