use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::service::Upstreams;

#[derive(Clone)]
pub struct HealthState {
    upstreams: Upstreams,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpstreamCheck {
    pub name: &'static str,
    pub status: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub upstreams: Vec<UpstreamCheck>,
    pub checked_at: String,
}

pub fn router(upstreams: Upstreams) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { upstreams })
}

/// The process serves whatever it can, so a missing upstream degrades the
/// report without failing the probe.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let upstreams: Vec<UpstreamCheck> = state
        .upstreams
        .configured()
        .into_iter()
        .map(|(kind, configured)| UpstreamCheck {
            name: kind.as_str(),
            status: if configured { "configured" } else { "unconfigured" },
        })
        .collect();
    let ready = upstreams.iter().all(|check| check.status == "configured");

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "nebo-server runtime initialized".to_string(),
        },
        upstreams,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
