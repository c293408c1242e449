use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use nebo_core::sources::{SiteReport, SourceError, SourceKind};

const ERROR_BODY_LIMIT: usize = 200;

pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).user_agent(concat!("nebo/", env!("CARGO_PKG_VERSION"))).build()
}

pub(crate) fn transport_error(source_kind: SourceKind, error: reqwest::Error) -> SourceError {
    SourceError::transport(source_kind, error.to_string())
}

/// Maps 401/403 to `Authentication` and any other non-2xx to `Status`.
pub(crate) async fn ensure_success(
    source_kind: SourceKind,
    response: Response,
) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(SourceError::Authentication { source_kind, message })
        }
        _ => Err(SourceError::Status { source_kind, status: status.as_u16(), message }),
    }
}

pub(crate) async fn decode_json<T: DeserializeOwned>(
    source_kind: SourceKind,
    response: Response,
) -> Result<T, SourceError> {
    let response = ensure_success(source_kind, response).await?;
    response.json::<T>().await.map_err(|error| SourceError::decode(source_kind, error.to_string()))
}

/// Renders a JSON scalar the way it should read in chat; `null` becomes `None`.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

pub(crate) fn flatten_object(value: Value) -> SiteReport {
    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| {
                let text = scalar_text(&value).unwrap_or_else(|| "null".to_owned());
                (key, text)
            })
            .collect(),
        _ => SiteReport::new(),
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
