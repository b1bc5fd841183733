use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::underwriting::schema::{CategoricalField, NumericField};

/// Standardization parameters for one numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingParameters {
    pub mean: f64,
    pub std_dev: f64,
}

impl ScalingParameters {
    /// Mean and population standard deviation of `values`.
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
            };
        }
        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let variance = values
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / count;
        Self {
            mean,
            std_dev: variance.sqrt(),
        }
    }

    /// True when the field was (numerically) constant at fit time.
    pub fn is_degenerate(&self) -> bool {
        !self.std_dev.is_finite() || self.std_dev <= f64::EPSILON * self.mean.abs().max(1.0)
    }

    /// `(x - mean) / std_dev`; a degenerate field is only centred.
    pub fn scale(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            value - self.mean
        } else {
            (value - self.mean) / self.std_dev
        }
    }
}

/// Replacement values for missing inputs, learned at fit time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputationStatistics {
    pub categorical: BTreeMap<CategoricalField, String>,
    pub numeric: BTreeMap<NumericField, f64>,
}

/// Most frequent value; ties go to the value encountered first.
pub(crate) fn most_frequent<'a, I>(values: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tallies: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, value) in values.into_iter().enumerate() {
        tallies.entry(value).or_insert((0, position)).0 += 1;
    }

    tallies
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(value, _)| value)
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
