use serde::{Serialize, Deserialize};

/// Current layout version written into new anomaly checkpoints.
pub const SCHEMA_VERSION: u32 = 1;

const AMOUNT_FEATURES: [&str; 6] = ["count", "sum", "mean", "min", "max", "std"];
const FRAUD_FEATURES: [&str; 2] = ["fraud_prob_mean", "fraud_prob_max"];

/// Feature layout of a merchant-day vector, fixed when the anomaly model is
/// trained and stored alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSchema {
    pub version: u32,
    /// Append mean and max supervised fraud probability to the amount stats.
    pub include_fraud_probability: bool,
}

impl AggregateSchema {
    pub fn new(include_fraud_probability: bool) -> Self {
        AggregateSchema { version: SCHEMA_VERSION, include_fraud_probability }
    }

    pub fn amount_only() -> Self {
        Self::new(false)
    }

    pub fn with_fraud_probability() -> Self {
        Self::new(true)
    }

    pub fn n_features(&self) -> usize {
        self.feature_names().len()
    }

    /// Names in vector order.
    pub fn feature_names(&self) -> Vec<&'static str> {
        let mut names = AMOUNT_FEATURES.to_vec();
        if self.include_fraud_probability {
            names.extend(FRAUD_FEATURES);
        }
        names
    }
}

impl Default for AggregateSchema {
    fn default() -> Self {
        Self::amount_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraud_probability_adds_two_columns() {
        assert_eq!(AggregateSchema::amount_only().n_features(), 6);
        let with = AggregateSchema::with_fraud_probability();
        assert_eq!(with.n_features(), 8);
        assert_eq!(with.feature_names()[7], "fraud_prob_max");
    }
}
