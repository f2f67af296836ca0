//! Merchant-day aggregation and isolation-forest anomaly scoring.

pub mod aggregate;
pub mod fraud_model;
pub mod schema;
pub mod scorer;

pub use aggregate::{aggregate, aggregate_all, MerchantDayAggregate};
pub use fraud_model::FraudModel;
pub use schema::AggregateSchema;
pub use scorer::{AnomalyCheckpoint, MerchantDayScorer};
