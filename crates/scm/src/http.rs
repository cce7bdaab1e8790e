//! Response handling shared by both backends.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::{Backend, ScmError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_client(
    provider: Backend,
    headers: HeaderMap,
    timeout: Duration,
) -> Result<reqwest::Client, ScmError> {
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .build()
        .map_err(|e| ScmError::Configuration(format!("failed to create {provider} HTTP client: {e}")))
}

/// Turn a non-success response into [`ScmError::Auth`] or [`ScmError::Api`].
pub(crate) async fn check_status(provider: Backend, response: Response) -> Result<Response, ScmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ScmError::Auth {
            provider,
            status: status.as_u16(),
        });
    }

    Err(ScmError::Api {
        provider,
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn decode<T: DeserializeOwned>(
    provider: Backend,
    response: Response,
) -> Result<T, ScmError> {
    response
        .json()
        .await
        .map_err(|source| ScmError::Decode { provider, source })
}

pub(crate) fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
