use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use loan_approval::underwriting::{decision_router, AuditSink, DecisionService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_decision_routes<A>(service: Arc<DecisionService<A>>) -> axum::Router
where
    A: AuditSink + 'static,
{
    decision_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{decision_service, fixtures, AuditTrail};
    use axum::body::Body;
    use axum::http::Request;
    use loan_approval::config::ModelConfig;
    use loan_approval::underwriting::MissingFieldPolicy;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app(dir: &std::path::Path, ready: bool) -> axum::Router {
        let config = ModelConfig {
            artifact_path: dir.join("bundle.json"),
            audit_log: None,
            missing_fields: MissingFieldPolicy::Reject,
        };
        fixtures::credit_only_bundle()
            .save(&config.artifact_path)
            .expect("bundle saves");
        let service: DecisionService<AuditTrail> =
            decision_service(&config, None).expect("service builds");

        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        state.readiness.store(ready, Ordering::Release);

        with_decision_routes(Arc::new(service)).layer(Extension(state))
    }

    async fn status_of(router: axum::Router, uri: &str) -> StatusCode {
        router
            .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
            .await
            .expect("route executes")
            .status()
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            status_of(app(dir.path(), false), "/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_of(app(dir.path(), true), "/ready").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn decision_routes_are_mounted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let router = app(dir.path(), true);
        assert_eq!(status_of(router.clone(), "/api/v1/model").await, StatusCode::OK);
        assert_eq!(status_of(router.clone(), "/api/v1/schema").await, StatusCode::OK);
        assert_eq!(status_of(router, "/metrics").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn reload_route_rereads_the_bundle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let router = app(dir.path(), true);
        let response = router
            .oneshot(
                Request::post("/api/v1/model/reload")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
