use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::anomaly::schema::AggregateSchema;
use crate::data::raw::RawTransaction;
use crate::error::{FraudError, Result};

/// Amount statistics for one entity on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantDayAggregate {
    pub entity: String,
    pub day: String,
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation (0 for a single transaction).
    pub std: f64,
}

impl MerchantDayAggregate {
    pub(crate) fn from_amounts(entity: &str, day: &str, amounts: &[f64]) -> Self {
        let n = amounts.len() as f64;
        let sum: f64 = amounts.iter().sum();
        let mean = sum / n;
        let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
        MerchantDayAggregate {
            entity: entity.to_string(),
            day: day.to_string(),
            count: amounts.len(),
            sum,
            mean,
            min: amounts.iter().copied().fold(f64::INFINITY, f64::min),
            max: amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            std: variance.sqrt(),
        }
    }

    /// Feature vector in `schema` order. `fraud_probabilities` are the
    /// per-transaction supervised scores for this group and are required
    /// when the schema includes them.
    pub fn to_features(&self, schema: &AggregateSchema, fraud_probabilities: Option<&[f64]>) -> Result<Vec<f64>> {
        let mut features = vec![self.count as f64, self.sum, self.mean, self.min, self.max, self.std];
        if schema.include_fraud_probability {
            let probs = fraud_probabilities
                .filter(|p| !p.is_empty())
                .ok_or(FraudError::MissingComponent("fraud probabilities"))?;
            let mean = probs.iter().sum::<f64>() / probs.len() as f64;
            let max = probs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            features.push(mean);
            features.push(max);
        }
        Ok(features)
    }
}

/// Rows belonging to (`entity`, `day`), in input order.
pub fn select<'a>(rows: &'a [RawTransaction], entity: &str, day: &str) -> Vec<&'a RawTransaction> {
    rows.iter().filter(|r| r.entity == entity && r.day == day).collect()
}

/// Aggregates the rows of one entity on one day.
pub fn aggregate(rows: &[RawTransaction], entity: &str, day: &str) -> Result<MerchantDayAggregate> {
    let amounts: Vec<f64> = select(rows, entity, day).iter().map(|r| r.amount).collect();
    if amounts.is_empty() {
        return Err(FraudError::EmptyAggregate { entity: entity.to_string(), day: day.to_string() });
    }
    Ok(MerchantDayAggregate::from_amounts(entity, day, &amounts))
}

/// Row indices of every distinct (entity, day) pair, ordered by key.
pub fn group_indices(rows: &[RawTransaction]) -> BTreeMap<(String, String), Vec<usize>> {
    let mut groups: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        groups.entry((row.entity.clone(), row.day.clone())).or_default().push(i);
    }
    groups
}

/// Aggregates for every (entity, day) pair present in `rows`.
pub fn aggregate_all(rows: &[RawTransaction]) -> Vec<MerchantDayAggregate> {
    group_indices(rows)
        .into_iter()
        .map(|((entity, day), idx)| {
            let amounts: Vec<f64> = idx.iter().map(|&i| rows[i].amount).collect();
            MerchantDayAggregate::from_amounts(&entity, &day, &amounts)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<RawTransaction> {
        vec![
            RawTransaction::new("A", "01062025", 10.0),
            RawTransaction::new("A", "01062025", 20.0),
            RawTransaction::new("B", "01062025", 5.0),
            RawTransaction::new("A", "02062025", 99.0),
        ]
    }

    #[test]
    fn aggregates_only_the_requested_pair() {
        let agg = aggregate(&rows(), "A", "01062025").unwrap();
        assert_eq!(agg.count, 2);
        assert_eq!(agg.sum, 30.0);
        assert_eq!(agg.mean, 15.0);
        assert_eq!(agg.min, 10.0);
        assert_eq!(agg.max, 20.0);
        assert_eq!(agg.std, 5.0);
    }

    #[test]
    fn empty_pair_fails_explicitly() {
        let err = aggregate(&rows(), "B", "02062025").unwrap_err();
        match err {
            FraudError::EmptyAggregate { entity, day } => {
                assert_eq!(entity, "B");
                assert_eq!(day, "02062025");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn groups_every_pair() {
        let all = aggregate_all(&rows());
        assert_eq!(all.len(), 3);
        assert_eq!(all.iter().map(|a| a.count).sum::<usize>(), 4);
    }

    #[test]
    fn schema_controls_vector_layout() {
        let agg = aggregate(&rows(), "A", "01062025").unwrap();
        let plain = agg.to_features(&AggregateSchema::amount_only(), None).unwrap();
        assert_eq!(plain, vec![2.0, 30.0, 15.0, 10.0, 20.0, 5.0]);

        let schema = AggregateSchema::with_fraud_probability();
        assert!(matches!(agg.to_features(&schema, None), Err(FraudError::MissingComponent(_))));
        let enriched = agg.to_features(&schema, Some(&[0.2, 0.6])).unwrap();
        assert_eq!(enriched.len(), 8);
        assert!((enriched[6] - 0.4).abs() < 1e-12);
        assert_eq!(enriched[7], 0.6);
    }
}
