use axum::{
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::{
    error::{Error, Result},
    utils::extract::Json,
};

const MAX_FIELD_CHARS: usize = 4000;

/// Error report posted by the browser client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientErrorReport {
    pub message: String,
    pub stack: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: Option<String>,
    pub context: Option<JsonValue>,
}

fn clip(value: &str) -> &str {
    match value.char_indices().nth(MAX_FIELD_CHARS) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[utoipa::path(
    post,
    path = "/api/errors/log",
    request_body = ClientErrorReport,
    responses(
        (status = 202, description = "Report logged"),
        (status = 400, description = "Empty message")
    )
)]
#[axum::debug_handler]
pub async fn log_client_error(Json(report): Json<ClientErrorReport>) -> Result<impl IntoResponse> {
    if report.message.trim().is_empty() {
        return Err(Error::BadRequest("message is required".to_string()));
    }
    tracing::warn!(
        message = %clip(&report.message),
        kind = report.kind.as_deref().unwrap_or("error"),
        url = report.url.as_deref().unwrap_or_default(),
        user_agent = report.user_agent.as_deref().unwrap_or_default(),
        reported_at = report.timestamp.as_deref().unwrap_or_default(),
        stack = report.stack.as_deref().map(clip).unwrap_or_default(),
        context = ?report.context,
        "client error reported"
    );
    Ok((StatusCode::ACCEPTED, Json(json!({ "received": true }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_fields_are_clipped_on_char_boundaries() {
        let long = "é".repeat(MAX_FIELD_CHARS + 10);
        assert_eq!(clip(&long).chars().count(), MAX_FIELD_CHARS);
        assert_eq!(clip("short"), "short");
    }
}
