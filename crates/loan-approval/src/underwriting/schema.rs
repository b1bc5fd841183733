use std::fmt;

use serde::{Deserialize, Serialize};

/// Version of the eleven-attribute applicant schema recorded in every bundle.
pub const SCHEMA_VERSION: u32 = 1;

/// Applicant attributes carried as strings and label-encoded before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CategoricalField {
    #[serde(rename = "Gender")]
    Gender,
    #[serde(rename = "Married")]
    Married,
    #[serde(rename = "Dependents")]
    Dependents,
    #[serde(rename = "Education")]
    Education,
    #[serde(rename = "Self_Employed")]
    SelfEmployed,
    #[serde(rename = "Property_Area")]
    PropertyArea,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 6] = [
        CategoricalField::Gender,
        CategoricalField::Married,
        CategoricalField::Dependents,
        CategoricalField::Education,
        CategoricalField::SelfEmployed,
        CategoricalField::PropertyArea,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CategoricalField::Gender => "Gender",
            CategoricalField::Married => "Married",
            CategoricalField::Dependents => "Dependents",
            CategoricalField::Education => "Education",
            CategoricalField::SelfEmployed => "Self_Employed",
            CategoricalField::PropertyArea => "Property_Area",
        }
    }

    /// Values offered by the intake form. Informational only: the encoder learns its
    /// vocabulary from the training data, not from this list.
    pub fn known_values(self) -> &'static [&'static str] {
        match self {
            CategoricalField::Gender => &["Male", "Female"],
            CategoricalField::Married => &["Yes", "No"],
            CategoricalField::Dependents => &["0", "1", "2", "3+"],
            CategoricalField::Education => &["Graduate", "Not Graduate"],
            CategoricalField::SelfEmployed => &["No", "Yes"],
            CategoricalField::PropertyArea => &["Urban", "Semiurban", "Rural"],
        }
    }
}

/// Applicant attributes carried as non-negative reals and standardized before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NumericField {
    #[serde(rename = "ApplicantIncome")]
    ApplicantIncome,
    #[serde(rename = "CoapplicantIncome")]
    CoapplicantIncome,
    #[serde(rename = "LoanAmount")]
    LoanAmount,
    #[serde(rename = "Loan_Amount_Term")]
    LoanAmountTerm,
    #[serde(rename = "Credit_History")]
    CreditHistory,
}

impl NumericField {
    pub const ALL: [NumericField; 5] = [
        NumericField::ApplicantIncome,
        NumericField::CoapplicantIncome,
        NumericField::LoanAmount,
        NumericField::LoanAmountTerm,
        NumericField::CreditHistory,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumericField::ApplicantIncome => "ApplicantIncome",
            NumericField::CoapplicantIncome => "CoapplicantIncome",
            NumericField::LoanAmount => "LoanAmount",
            NumericField::LoanAmountTerm => "Loan_Amount_Term",
            NumericField::CreditHistory => "Credit_History",
        }
    }
}

/// One model input column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Categorical(CategoricalField),
    Numeric(NumericField),
}

/// Column order of the model's feature vector: the historical dataset's column
/// order once the identifier and the label are dropped.
pub const FEATURE_ORDER: [Feature; 11] = [
    Feature::Categorical(CategoricalField::Gender),
    Feature::Categorical(CategoricalField::Married),
    Feature::Categorical(CategoricalField::Dependents),
    Feature::Categorical(CategoricalField::Education),
    Feature::Categorical(CategoricalField::SelfEmployed),
    Feature::Numeric(NumericField::ApplicantIncome),
    Feature::Numeric(NumericField::CoapplicantIncome),
    Feature::Numeric(NumericField::LoanAmount),
    Feature::Numeric(NumericField::LoanAmountTerm),
    Feature::Numeric(NumericField::CreditHistory),
    Feature::Categorical(CategoricalField::PropertyArea),
];

impl Feature {
    pub fn name(self) -> &'static str {
        match self {
            Feature::Categorical(field) => field.name(),
            Feature::Numeric(field) => field.name(),
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Feature::Categorical(_) => FieldKind::Categorical,
            Feature::Numeric(_) => FieldKind::Numeric,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        FEATURE_ORDER
            .iter()
            .copied()
            .find(|feature| feature.name() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical feature names in model column order.
pub fn feature_names() -> Vec<String> {
    FEATURE_ORDER
        .iter()
        .map(|feature| feature.name().to_string())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Categorical,
    Numeric,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Categorical => f.write_str("categorical (string)"),
            FieldKind::Numeric => f.write_str("numeric"),
        }
    }
}

/// Schema entry exposed to intake front ends.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub known_values: &'static [&'static str],
}

pub fn field_descriptors() -> Vec<FieldDescriptor> {
    FEATURE_ORDER
        .iter()
        .map(|feature| FieldDescriptor {
            name: feature.name(),
            kind: feature.kind(),
            known_values: match feature {
                Feature::Categorical(field) => field.known_values(),
                Feature::Numeric(_) => &[],
            },
        })
        .collect()
}

/// Input that does not satisfy the applicant schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("required field `{field}` is missing")]
    MissingField { field: &'static str },
    #[error("field `{field}` expects a {expected} value")]
    WrongType {
        field: &'static str,
        expected: FieldKind,
    },
    #[error("field `{field}` must be a finite, non-negative number (got {value})")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("field `{field}` has no observed values in the training records")]
    FieldNeverObserved { field: &'static str },
    #[error("no records were supplied")]
    EmptyInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_order_covers_every_field_once() {
        assert_eq!(FEATURE_ORDER.len(), 11);
        for field in CategoricalField::ALL {
            assert_eq!(
                FEATURE_ORDER
                    .iter()
                    .filter(|f| **f == Feature::Categorical(field))
                    .count(),
                1
            );
        }
        for field in NumericField::ALL {
            assert_eq!(
                FEATURE_ORDER
                    .iter()
                    .filter(|f| **f == Feature::Numeric(field))
                    .count(),
                1
            );
        }
    }

    #[test]
    fn feature_names_round_trip_through_lookup() {
        for name in feature_names() {
            let feature = Feature::from_name(&name).expect("known feature");
            assert_eq!(feature.name(), name);
        }
        assert!(Feature::from_name("Loan_ID").is_none());
    }

    #[test]
    fn serde_names_match_schema_names() {
        let encoded = serde_json::to_string(&CategoricalField::SelfEmployed).expect("serializes");
        assert_eq!(encoded, "\"Self_Employed\"");
        let encoded = serde_json::to_string(&NumericField::LoanAmountTerm).expect("serializes");
        assert_eq!(encoded, "\"Loan_Amount_Term\"");
    }
}
