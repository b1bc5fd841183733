use super::common::*;

use crate::underwriting::preprocess::{self, CategoryFallback};
use crate::underwriting::record::ApplicantRecord;
use crate::underwriting::schema::{CategoricalField, Feature, NumericField, SchemaError};

fn history_records() -> Vec<ApplicantRecord> {
    labeled_history()
        .into_iter()
        .map(|row| row.record)
        .collect()
}

#[test]
fn fit_rejects_empty_input() {
    assert!(matches!(preprocess::fit(&[]), Err(SchemaError::EmptyInput)));
}

#[test]
fn fit_rejects_fields_never_observed() {
    let mut records = history_records();
    for record in &mut records {
        record.self_employed = None;
    }
    assert_eq!(
        preprocess::fit(&records).expect_err("field never observed"),
        SchemaError::FieldNeverObserved {
            field: "Self_Employed"
        }
    );
}

#[test]
fn fit_learns_sorted_vocabularies_and_means() {
    let records = history_records();
    let fitted = preprocess::fit(&records).expect("fit succeeds");

    assert_eq!(
        fitted.state.vocabulary(CategoricalField::PropertyArea).values(),
        ["Rural", "Semiurban", "Urban"]
    );
    assert_eq!(
        fitted.state.vocabulary(CategoricalField::Dependents).values(),
        ["0", "1", "2", "3+"]
    );

    let observed: Vec<f64> = records
        .iter()
        .filter_map(|record| record.numeric(NumericField::LoanAmount))
        .collect();
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    assert_close(
        fitted.state.imputation().numeric[&NumericField::LoanAmount],
        mean,
    );

    assert_eq!(fitted.matrix.len(), records.len());
    assert!(fitted.matrix.iter().all(|row| row.len() == 11));
}

#[test]
fn fit_imputes_missing_categories_with_the_mode() {
    let records = history_records();
    let fitted = preprocess::fit(&records).expect("fit succeeds");

    // 23 of the 39 observed genders are Male.
    assert_eq!(
        fitted.state.imputation().categorical[&CategoricalField::Gender],
        "Male"
    );
    let male_code = fitted
        .state
        .vocabulary(CategoricalField::Gender)
        .code_of("Male")
        .expect("Male observed") as f64;
    assert_eq!(fitted.matrix[11][0], male_code);
}

#[test]
fn fit_matrix_is_standardized() {
    let fitted = preprocess::fit(&history_records()).expect("fit succeeds");
    let column: Vec<f64> = fitted.matrix.iter().map(|row| row[5]).collect();
    let mean = column.iter().sum::<f64>() / column.len() as f64;
    let variance = column.iter().map(|value| (value - mean).powi(2)).sum::<f64>()
        / column.len() as f64;
    assert!(mean.abs() < 1e-9);
    assert!((variance - 1.0).abs() < 1e-9);
}

#[test]
fn apply_encodes_by_hand() {
    let state = synthetic_state();
    let encoded = state.apply(&strong_applicant());
    assert_eq!(
        encoded.values,
        vec![1.0, 1.0, 0.0, 0.0, 0.0, 1.0, -1.0, -1.0, 0.0, 1.0, 2.0]
    );
    assert!(encoded.imputed.is_empty());
    assert!(encoded.fallbacks.is_empty());
}

#[test]
fn apply_is_idempotent_and_leaves_state_untouched() {
    let state = synthetic_state();
    let before = state.clone();
    let record = ApplicantRecord {
        property_area: Some("Downtown".to_string()),
        loan_amount: None,
        ..strong_applicant()
    };

    let first = state.apply(&record);
    let second = state.apply(&record);

    assert_eq!(first, second);
    assert_eq!(state, before);
}

#[test]
fn unseen_category_takes_first_vocabulary_code() {
    let state = synthetic_state();
    let unseen = ApplicantRecord {
        property_area: Some("Downtown".to_string()),
        ..strong_applicant()
    };
    let rural = ApplicantRecord {
        property_area: Some("Rural".to_string()),
        ..strong_applicant()
    };

    let encoded = state.apply(&unseen);
    assert_eq!(encoded.values, state.apply(&rural).values);
    assert_eq!(
        encoded.fallbacks,
        vec![CategoryFallback {
            field: CategoricalField::PropertyArea,
            observed: "Downtown".to_string(),
            substituted: Some("Rural".to_string()),
        }]
    );
}

#[test]
fn missing_values_take_stored_statistics() {
    let state = synthetic_state();
    let record = ApplicantRecord {
        married: None,
        applicant_income: None,
        ..strong_applicant()
    };

    let encoded = state.apply(&record);
    // Married imputes to "Yes" (code 1); income imputes to its mean and scales to 0.
    assert_eq!(encoded.values[1], 1.0);
    assert_eq!(encoded.values[5], 0.0);
    assert_eq!(
        encoded.imputed,
        vec![
            Feature::Categorical(CategoricalField::Married),
            Feature::Numeric(NumericField::ApplicantIncome),
        ]
    );
}

#[test]
fn empty_vocabulary_falls_back_to_code_zero() {
    let mut state = synthetic_state();
    state.vocabularies.remove(&CategoricalField::Education);

    let encoded = state.apply(&strong_applicant());
    assert_eq!(encoded.values[3], 0.0);
    assert_eq!(
        encoded.fallbacks,
        vec![CategoryFallback {
            field: CategoricalField::Education,
            observed: "Graduate".to_string(),
            substituted: None,
        }]
    );
}
