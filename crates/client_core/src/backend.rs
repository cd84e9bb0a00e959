//! Generation backend seam and the HTTP request helper every remote call
//! goes through.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{multipart::Form, Client, RequestBuilder, StatusCode};
use serde_json::Value;
use shared::{
    error::BackendErrorBody,
    protocol::{GenerationRequest, GenerationResult, RequestEncoding},
};
use tracing::{debug, warn};
use url::Url;

use crate::{definition::EndpointSpec, error::BackendError};

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(
        &self,
        endpoint: &EndpointSpec,
        request: GenerationRequest,
    ) -> Result<GenerationResult, BackendError>;
}

pub struct HttpGenerationBackend {
    http: Client,
    base_url: Url,
}

impl HttpGenerationBackend {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build http client")?;
        Self::with_client(http, base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
        })
    }

    fn endpoint_url(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| BackendError::transport(format!("invalid endpoint path {path}: {err}")))
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    async fn generate(
        &self,
        endpoint: &EndpointSpec,
        request: GenerationRequest,
    ) -> Result<GenerationResult, BackendError> {
        let url = self.endpoint_url(&endpoint.path)?;
        let builder = match endpoint.encoding {
            RequestEncoding::Json => self.http.post(url.clone()).json(&request.fields),
            RequestEncoding::Multipart => {
                let form = request
                    .form_parts()
                    .into_iter()
                    .fold(Form::new(), |form, (name, value)| form.text(name, value));
                self.http.post(url.clone()).multipart(form)
            }
        };

        let (status, body) = send_request(builder).await?;
        debug!(
            "backend: response status={} endpoint={} bytes={}",
            status.as_u16(),
            url,
            body.len()
        );
        interpret_response(status, &body, &endpoint.result_field)
    }
}

/// Base URLs are treated as directories so endpoint paths join beneath them.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).with_context(|| format!("invalid api base url '{raw}'"))
}

/// Sends one request; any failure before a complete body arrives is a
/// transport failure.
pub async fn send_request(builder: RequestBuilder) -> Result<(StatusCode, Vec<u8>), BackendError> {
    let response = builder.send().await.map_err(|err| {
        warn!("backend: request failed before response error={err}");
        BackendError::transport(err.to_string())
    })?;
    let status = response.status();
    let body = response.bytes().await.map_err(|err| {
        warn!(
            "backend: failed to read response body status={} error={err}",
            status.as_u16()
        );
        BackendError::transport(err.to_string())
    })?;
    Ok((status, body.to_vec()))
}

/// Maps a backend response to a result or a failure kind.
///
/// An explicit `error` field always wins over the status code. Without one,
/// non-2xx responses fail with the body's `message` or a fallback naming the
/// status, and 2xx responses must carry a non-empty `result_field` string.
pub fn interpret_response(
    status: StatusCode,
    body: &[u8],
    result_field: &str,
) -> Result<GenerationResult, BackendError> {
    let payload: Value = serde_json::from_slice(body).map_err(|err| {
        warn!(
            "backend: unreadable response body status={} error={err}",
            status.as_u16()
        );
        BackendError::transport(format!(
            "unreadable response body (status {}): {err}",
            status.as_u16()
        ))
    })?;

    let error_body = BackendErrorBody::from_payload(&payload);
    if let Some(error) = error_body.explicit_error() {
        let message = error
            .map(str::to_string)
            .unwrap_or_else(|| status_fallback(status));
        warn!(
            "backend: explicit error payload status={} error={message}",
            status.as_u16()
        );
        return Err(BackendError::remote(message));
    }

    if !status.is_success() {
        let message = error_body
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| status_fallback(status));
        warn!(
            "backend: request rejected status={} message={message}",
            status.as_u16()
        );
        return Err(BackendError::remote(message));
    }

    match payload.get(result_field).and_then(Value::as_str) {
        Some(url) if !url.trim().is_empty() => Ok(GenerationResult {
            url: url.to_string(),
            payload,
        }),
        _ => {
            warn!("backend: success response missing field={result_field}");
            Err(BackendError::transport(format!(
                "response is missing '{result_field}'"
            )))
        }
    }
}

fn status_fallback(status: StatusCode) -> String {
    format!("generation failed (status {})", status.as_u16())
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
