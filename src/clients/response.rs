//! Response decoding shared by the upstream HTTP clients.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::error::{ClientError, ClientResult};

/// Longest upstream error text carried into a message.
const MAX_ERROR_CHARS: usize = 300;

/// Send a request and decode its JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    timeout: Duration,
) -> ClientResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| ClientError::from_reqwest(e, timeout))?;
    read_json(response, timeout).await
}

/// Check the status of a response, then decode its JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    timeout: Duration,
) -> ClientResult<T> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| ClientError::from_reqwest(e, timeout))?;

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ClientError::Unauthorized(status.as_u16()));
    }

    if !status.is_success() {
        debug!(status = status.as_u16(), "Upstream returned an error status");
        return Err(ClientError::status(status.as_u16(), error_message(&body, status)));
    }

    serde_json::from_slice(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

/// Pull a human-readable message out of an error body.
///
/// JSON bodies with a `message` or `error` member are unwrapped; anything
/// else is passed on as (truncated) text.
fn error_message(body: &[u8], status: StatusCode) -> String {
    let from_json = serde_json::from_slice::<Value>(body).ok().and_then(|value| {
        ["message", "error", "detail"].iter().find_map(|key| match value.get(key) {
            Some(Value::String(message)) => Some(message.clone()),
            Some(Value::Object(inner)) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
    });

    let message = from_json.unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
    if message.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("no details")
            .to_string();
    }

    truncate(&message, MAX_ERROR_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
