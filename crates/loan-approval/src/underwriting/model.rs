use serde::{Deserialize, Serialize};

/// Logistic model over the encoded feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LinearModel {
    pub fn new(weights: Vec<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }

    /// `w · x + b`. `features` must have one value per weight.
    pub fn decision_value(&self, features: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(features)
            .map(|(weight, value)| weight * value)
            .sum::<f64>()
            + self.bias
    }

    /// Probability of the positive (approved) class.
    pub fn approval_probability(&self, features: &[f64]) -> f64 {
        sigmoid(self.decision_value(features))
    }
}

/// `1 / (1 + e^-z)`, evaluated without overflowing for large `|z|`.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let exp = z.exp();
        exp / (1.0 + exp)
    }
}
