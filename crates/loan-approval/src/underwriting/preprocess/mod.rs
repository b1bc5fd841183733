//! Imputation, label encoding, and standardization of applicant records.
//!
//! [`fit`] learns a [`PreprocessingState`] from historical records; the state's
//! `apply*` methods replay exactly the same transform on new records without ever
//! refitting. The fit-time matrix is itself produced by `apply`, so training and
//! inference cannot drift apart.

mod statistics;
mod vocabulary;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::record::ApplicantRecord;
use super::schema::{CategoricalField, Feature, NumericField, SchemaError, FEATURE_ORDER};

pub use statistics::{ImputationStatistics, ScalingParameters};
pub use vocabulary::CategoryVocabulary;

/// Everything learned at fit time that inference needs to reproduce the encoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingState {
    pub(crate) vocabularies: BTreeMap<CategoricalField, CategoryVocabulary>,
    pub(crate) scaling: BTreeMap<NumericField, ScalingParameters>,
    pub(crate) imputation: ImputationStatistics,
}

/// Output of [`fit`]: the learned state plus the encoded training matrix.
#[derive(Debug, Clone)]
pub struct FittedPreprocessing {
    pub state: PreprocessingState,
    /// One row per input record, columns in [`FEATURE_ORDER`].
    pub matrix: Vec<Vec<f64>>,
}

/// A record whose categorical value was not part of the fit-time vocabulary and
/// was encoded as the vocabulary's first entry instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFallback {
    pub field: CategoricalField,
    pub observed: String,
    /// Vocabulary entry whose code was used; `None` for an empty vocabulary.
    pub substituted: Option<String>,
}

/// Numeric feature vector for one record plus what happened while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRecord {
    pub values: Vec<f64>,
    pub imputed: Vec<Feature>,
    pub fallbacks: Vec<CategoryFallback>,
}

/// Learn imputation statistics, vocabularies, and scaling parameters from
/// `records`, then encode them.
///
/// Fails when `records` is empty or when a field has no value in any record.
pub fn fit(records: &[ApplicantRecord]) -> Result<FittedPreprocessing, SchemaError> {
    if records.is_empty() {
        return Err(SchemaError::EmptyInput);
    }

    let mut state = PreprocessingState::default();

    for field in CategoricalField::ALL {
        let observed: Vec<&str> = records
            .iter()
            .filter_map(|record| record.categorical(field))
            .collect();
        let mode = statistics::most_frequent(observed.iter().copied()).ok_or(
            SchemaError::FieldNeverObserved {
                field: field.name(),
            },
        )?;
        let mode = mode.to_string();

        let filled = records
            .iter()
            .map(|record| record.categorical(field).unwrap_or(mode.as_str()));
        state
            .vocabularies
            .insert(field, CategoryVocabulary::from_observed(filled));
        state.imputation.categorical.insert(field, mode);
    }

    for field in NumericField::ALL {
        let observed: Vec<f64> = records
            .iter()
            .filter_map(|record| record.numeric(field))
            .collect();
        let mean = statistics::mean(&observed).ok_or(SchemaError::FieldNeverObserved {
            field: field.name(),
        })?;

        let filled: Vec<f64> = records
            .iter()
            .map(|record| record.numeric(field).unwrap_or(mean))
            .collect();
        state
            .scaling
            .insert(field, ScalingParameters::fit(&filled));
        state.imputation.numeric.insert(field, mean);
    }

    let matrix = state
        .apply_batch(records)
        .into_iter()
        .map(|encoded| encoded.values)
        .collect();

    Ok(FittedPreprocessing { state, matrix })
}

impl PreprocessingState {
    pub fn new(
        vocabularies: BTreeMap<CategoricalField, CategoryVocabulary>,
        scaling: BTreeMap<NumericField, ScalingParameters>,
        imputation: ImputationStatistics,
    ) -> Self {
        Self {
            vocabularies,
            scaling,
            imputation,
        }
    }

    /// Vocabulary for `field`; empty if the state has none.
    pub fn vocabulary(&self, field: CategoricalField) -> &CategoryVocabulary {
        self.vocabularies
            .get(&field)
            .unwrap_or(&vocabulary::EMPTY_VOCABULARY)
    }

    pub fn scaling(&self, field: NumericField) -> Option<&ScalingParameters> {
        self.scaling.get(&field)
    }

    pub fn imputation(&self) -> &ImputationStatistics {
        &self.imputation
    }

    /// Encode one record in [`FEATURE_ORDER`].
    pub fn apply(&self, record: &ApplicantRecord) -> EncodedRecord {
        self.apply_columns(record, &FEATURE_ORDER)
    }

    pub fn apply_batch(&self, records: &[ApplicantRecord]) -> Vec<EncodedRecord> {
        records.iter().map(|record| self.apply(record)).collect()
    }

    /// Encode one record with the given column order.
    ///
    /// Missing values take the stored imputation statistics. Unseen categories take
    /// the code of the vocabulary's first entry (code 0) and are reported in
    /// [`EncodedRecord::fallbacks`].
    pub fn apply_columns(&self, record: &ApplicantRecord, columns: &[Feature]) -> EncodedRecord {
        let mut encoded = EncodedRecord {
            values: Vec::with_capacity(columns.len()),
            imputed: Vec::new(),
            fallbacks: Vec::new(),
        };

        for &feature in columns {
            if !record.is_present(feature) {
                encoded.imputed.push(feature);
            }
            let value = match feature {
                Feature::Categorical(field) => {
                    self.encode_category(field, record.categorical(field), &mut encoded.fallbacks)
                }
                Feature::Numeric(field) => self.encode_number(field, record.numeric(field)),
            };
            encoded.values.push(value);
        }

        encoded
    }

    fn encode_category(
        &self,
        field: CategoricalField,
        value: Option<&str>,
        fallbacks: &mut Vec<CategoryFallback>,
    ) -> f64 {
        let vocabulary = self.vocabulary(field);
        let value = value
            .or_else(|| self.imputation.categorical.get(&field).map(String::as_str))
            .or_else(|| vocabulary.first())
            .unwrap_or_default();

        match vocabulary.code_of(value) {
            Some(code) => code as f64,
            None => {
                let substituted = vocabulary.first().map(str::to_string);
                debug!(
                    field = field.name(),
                    observed = value,
                    substituted = substituted.as_deref().unwrap_or(""),
                    "unseen category encoded as first vocabulary entry"
                );
                fallbacks.push(CategoryFallback {
                    field,
                    observed: value.to_string(),
                    substituted,
                });
                0.0
            }
        }
    }

    fn encode_number(&self, field: NumericField, value: Option<f64>) -> f64 {
        let value = value
            .or_else(|| self.imputation.numeric.get(&field).copied())
            .or_else(|| self.scaling.get(&field).map(|params| params.mean))
            .unwrap_or_default();

        match self.scaling.get(&field) {
            Some(params) => params.scale(value),
            None => value,
        }
    }

    /// Names of fields the state has no vocabulary, scaling, or imputation entry for.
    pub(crate) fn incomplete_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for field in CategoricalField::ALL {
            if !self.vocabularies.contains_key(&field)
                || !self.imputation.categorical.contains_key(&field)
            {
                missing.push(field.name());
            }
        }
        for field in NumericField::ALL {
            if !self.scaling.contains_key(&field) || !self.imputation.numeric.contains_key(&field)
            {
                missing.push(field.name());
            }
        }
        missing
    }
}
