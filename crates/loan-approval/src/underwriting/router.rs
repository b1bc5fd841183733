use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::audit::AuditSink;
use super::record::{ApplicantRecord, RawValue};
use super::registry::RegistryError;
use super::schema::{field_descriptors, SCHEMA_VERSION};
use super::service::{DecisionService, DecisionServiceError};

/// Router builder exposing HTTP endpoints for decisions and model management.
pub fn decision_router<A>(service: Arc<DecisionService<A>>) -> Router
where
    A: AuditSink + 'static,
{
    Router::new()
        .route("/api/v1/loans/decisions", post(decide_handler::<A>))
        .route("/api/v1/model", get(model_handler::<A>))
        .route("/api/v1/model/reload", post(reload_handler::<A>))
        .route("/api/v1/schema", get(schema_handler))
        .with_state(service)
}

pub(crate) async fn decide_handler<A>(
    State(service): State<Arc<DecisionService<A>>>,
    axum::Json(fields): axum::Json<BTreeMap<String, RawValue>>,
) -> Response
where
    A: AuditSink + 'static,
{
    let applicant = match ApplicantRecord::from_fields(fields)
        .and_then(|record| record.check_ranges().map(|()| record))
    {
        Ok(record) => record,
        Err(error) => return unprocessable(error.to_string()),
    };

    match service.decide(applicant) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(DecisionServiceError::Schema(error)) => unprocessable(error.to_string()),
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn model_handler<A>(State(service): State<Arc<DecisionService<A>>>) -> Response
where
    A: AuditSink + 'static,
{
    (StatusCode::OK, axum::Json(service.model_summary())).into_response()
}

pub(crate) async fn reload_handler<A>(State(service): State<Arc<DecisionService<A>>>) -> Response
where
    A: AuditSink + 'static,
{
    match service.reload() {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(DecisionServiceError::Registry(RegistryError::NoSource)) => {
            let payload = json!({
                "error": RegistryError::NoSource.to_string(),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn schema_handler() -> Response {
    let payload = json!({
        "schema_version": SCHEMA_VERSION,
        "fields": field_descriptors(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn unprocessable(message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}
