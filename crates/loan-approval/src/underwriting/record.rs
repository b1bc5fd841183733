use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::schema::{CategoricalField, Feature, FieldKind, NumericField, SchemaError, FEATURE_ORDER};

/// A raw value as submitted by an intake front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
    /// Booleans, arrays and objects. Tolerated for keys outside the schema.
    Other(serde_json::Value),
}

/// One applicant's raw attributes. Every field may be absent.
///
/// Deserializing goes through [`ApplicantRecord::from_fields`], so keys outside
/// the schema are ignored and a value of the wrong kind is a [`SchemaError`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, RawValue>")]
pub struct ApplicantRecord {
    #[serde(rename = "Gender")]
    pub gender: Option<String>,
    #[serde(rename = "Married")]
    pub married: Option<String>,
    #[serde(rename = "Dependents")]
    pub dependents: Option<String>,
    #[serde(rename = "Education")]
    pub education: Option<String>,
    #[serde(rename = "Self_Employed")]
    pub self_employed: Option<String>,
    #[serde(rename = "ApplicantIncome")]
    pub applicant_income: Option<f64>,
    #[serde(rename = "CoapplicantIncome")]
    pub coapplicant_income: Option<f64>,
    #[serde(rename = "LoanAmount")]
    pub loan_amount: Option<f64>,
    #[serde(rename = "Loan_Amount_Term")]
    pub loan_amount_term: Option<f64>,
    #[serde(rename = "Credit_History")]
    pub credit_history: Option<f64>,
    #[serde(rename = "Property_Area")]
    pub property_area: Option<String>,
}

impl ApplicantRecord {
    /// Build a record from a name → value mapping.
    ///
    /// Blank strings and nulls count as missing. Numbers are not accepted for
    /// categorical fields (and vice versa).
    pub fn from_fields<I, K>(fields: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (K, RawValue)>,
        K: AsRef<str>,
    {
        let mut record = Self::default();
        for (name, value) in fields {
            let Some(feature) = Feature::from_name(name.as_ref().trim()) else {
                continue;
            };
            match (feature, value) {
                (_, RawValue::Missing) => {}
                (Feature::Categorical(field), RawValue::Text(text)) => {
                    record.set_categorical(field, Some(text));
                }
                (Feature::Numeric(field), RawValue::Number(number)) => {
                    record.set_numeric(field, Some(number));
                }
                (Feature::Categorical(field), RawValue::Number(_) | RawValue::Other(_)) => {
                    return Err(SchemaError::WrongType {
                        field: field.name(),
                        expected: FieldKind::Categorical,
                    });
                }
                (Feature::Numeric(field), RawValue::Text(_) | RawValue::Other(_)) => {
                    return Err(SchemaError::WrongType {
                        field: field.name(),
                        expected: FieldKind::Numeric,
                    });
                }
            }
        }
        Ok(record)
    }

    pub fn categorical(&self, field: CategoricalField) -> Option<&str> {
        let value = match field {
            CategoricalField::Gender => &self.gender,
            CategoricalField::Married => &self.married,
            CategoricalField::Dependents => &self.dependents,
            CategoricalField::Education => &self.education,
            CategoricalField::SelfEmployed => &self.self_employed,
            CategoricalField::PropertyArea => &self.property_area,
        };
        value.as_deref().map(str::trim).filter(|text| !text.is_empty())
    }

    pub fn numeric(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::ApplicantIncome => self.applicant_income,
            NumericField::CoapplicantIncome => self.coapplicant_income,
            NumericField::LoanAmount => self.loan_amount,
            NumericField::LoanAmountTerm => self.loan_amount_term,
            NumericField::CreditHistory => self.credit_history,
        }
    }

    pub fn set_categorical(&mut self, field: CategoricalField, value: Option<String>) {
        let slot = match field {
            CategoricalField::Gender => &mut self.gender,
            CategoricalField::Married => &mut self.married,
            CategoricalField::Dependents => &mut self.dependents,
            CategoricalField::Education => &mut self.education,
            CategoricalField::SelfEmployed => &mut self.self_employed,
            CategoricalField::PropertyArea => &mut self.property_area,
        };
        *slot = value;
    }

    pub fn set_numeric(&mut self, field: NumericField, value: Option<f64>) {
        let slot = match field {
            NumericField::ApplicantIncome => &mut self.applicant_income,
            NumericField::CoapplicantIncome => &mut self.coapplicant_income,
            NumericField::LoanAmount => &mut self.loan_amount,
            NumericField::LoanAmountTerm => &mut self.loan_amount_term,
            NumericField::CreditHistory => &mut self.credit_history,
        };
        *slot = value;
    }

    pub fn is_present(&self, feature: Feature) -> bool {
        match feature {
            Feature::Categorical(field) => self.categorical(field).is_some(),
            Feature::Numeric(field) => self.numeric(field).is_some(),
        }
    }

    /// Fields absent from this record, in model column order.
    pub fn missing_fields(&self) -> Vec<Feature> {
        FEATURE_ORDER
            .iter()
            .copied()
            .filter(|feature| !self.is_present(*feature))
            .collect()
    }

    /// Basic range check for front ends: every present number must be finite and
    /// non-negative.
    pub fn check_ranges(&self) -> Result<(), SchemaError> {
        for field in NumericField::ALL {
            if let Some(value) = self.numeric(field) {
                if !value.is_finite() || value < 0.0 {
                    return Err(SchemaError::OutOfRange {
                        field: field.name(),
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    /// The submitted value of one field, formatted for tabular logs.
    pub fn display_value(&self, feature: Feature) -> String {
        match feature {
            Feature::Categorical(field) => self.categorical(field).unwrap_or_default().to_string(),
            Feature::Numeric(field) => self
                .numeric(field)
                .map(|value| value.to_string())
                .unwrap_or_default(),
        }
    }
}

impl TryFrom<BTreeMap<String, RawValue>> for ApplicantRecord {
    type Error = SchemaError;

    fn try_from(fields: BTreeMap<String, RawValue>) -> Result<Self, Self::Error> {
        Self::from_fields(fields)
    }
}
