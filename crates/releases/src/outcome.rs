//! Result of a run as reported to the HTTP layer.

use std::collections::BTreeMap;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::error::{ReleaseError, StatusMapping};

/// Message and status returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestrationOutcome {
    pub message: String,
    pub status_code: u16,
    #[serde(skip)]
    pub headers: BTreeMap<String, String>,
}

impl OrchestrationOutcome {
    #[must_use]
    pub fn new(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code,
            headers: BTreeMap::new(),
        }
    }

    /// Outcome for a run that ended with `error`.
    #[must_use]
    pub fn from_error(error: &ReleaseError, statuses: &StatusMapping) -> Self {
        Self::new(error.to_string(), statuses.status_for(error.kind()))
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl IntoResponse for OrchestrationOutcome {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST);
        let headers = self.headers.clone();
        let mut response = (status, Json(self)).into_response();

        for (name, value) in headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().insert(name, value);
                }
                _ => warn!(header = %name, "Dropping invalid response header"),
            }
        }

        response
    }
}
