//! HTTP transport for oaish.
//!
//! [`ApiClient`] wraps a configured `reqwest::Client` bound to one API base URL. It
//! fetches the API description ([`ApiClient::discover`]) and turns an
//! [`OperationRecord`] plus an [`AssembledPayload`] into a request
//! ([`ApiClient::request`], [`ApiClient::call`]).

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use oaish_types::{AssembledPayload, OperationRecord};
use oaish_util::{build_path, join_url, redact_header, to_plain_string};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url, header};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure to fetch or parse the API description.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to discover API at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to discover API at {url}: server answered {status}")]
    Status { url: String, status: StatusCode },
    #[error("failed to discover API at {url}: document is not valid JSON: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DiscoveryError {
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. } | Self::Status { url, .. } | Self::Parse { url, .. } => url,
        }
    }
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error("unsupported HTTP method '{0}'")]
    InvalidMethod(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Successful response: status plus the decoded body.
///
/// Bodies that are not JSON are kept as a JSON string; an empty body is an empty object.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: Client,
    user_agent: String,
}

impl ApiClient {
    /// Builds a client for `base_url`, sending `token` as a bearer credential when set.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        validate_base_url(base_url)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|token| !token.trim().is_empty()),
            http,
            user_agent: format!("oaish/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a base-relative path; absolute URLs pass through.
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Fetches and parses the API description at `openapi_url`.
    pub async fn discover(&self, openapi_url: &str) -> Result<Value, DiscoveryError> {
        let url = self.url_for(openapi_url);
        info!(%url, "discovering API");

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|source| DiscoveryError::Transport { url: url.clone(), source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Status { url, status });
        }
        let text = response
            .text()
            .await
            .map_err(|source| DiscoveryError::Transport { url: url.clone(), source })?;
        serde_json::from_str(&text).map_err(|source| DiscoveryError::Parse { url, source })
    }

    /// Builds the request for one operation without sending it.
    ///
    /// Path parameters are substituted into the template, query parameters and headers
    /// are sent as text, and the body is sent as JSON only when it has entries.
    pub fn request(&self, operation: &OperationRecord, payload: &AssembledPayload) -> Result<RequestBuilder, CallError> {
        let method = parse_method(&operation.method)?;
        let url = self.url_for(&build_path(&operation.path, &payload.path_params));
        debug!(%method, %url, operation_id = %operation.operation_id, "building request");

        let mut builder = self
            .authorize(self.http.request(method, url))
            .header(header::USER_AGENT, &self.user_agent);
        for (name, value) in &payload.headers {
            builder = builder.header(name.as_str(), to_plain_string(value));
        }
        if !payload.query_params.is_empty() {
            builder = builder.query(&plain_pairs(&payload.query_params));
        }
        if let Some(body) = payload.body_value() {
            builder = builder.json(&body);
        }
        Ok(builder)
    }

    /// Sends one operation call. Non-2xx statuses are errors carrying the response text.
    pub async fn call(&self, operation: &OperationRecord, payload: &AssembledPayload) -> Result<ApiResponse, CallError> {
        let response = self.request(operation, payload)?.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%status, bytes = text.len(), operation_id = %operation.operation_id, "received response");

        if !status.is_success() {
            return Err(CallError::Status { status, body: text });
        }
        let body = if text.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(ApiResponse { status, body })
    }

    /// Sends one operation call and hands each non-empty response line to `on_line`
    /// as it arrives. Returns the response status.
    ///
    /// A non-2xx status is an error carrying the response text, as in [`ApiClient::call`].
    pub async fn stream_lines<F>(
        &self,
        operation: &OperationRecord,
        payload: &AssembledPayload,
        mut on_line: F,
    ) -> Result<StatusCode, CallError>
    where
        F: FnMut(&str),
    {
        let mut response = self.request(operation, payload)?.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(CallError::Status { status, body });
        }
        debug!(%status, operation_id = %operation.operation_id, "streaming response");

        let mut pending: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            pending.extend_from_slice(&chunk);
            while let Some(end) = pending.iter().position(|byte| *byte == b'\n') {
                let line: Vec<u8> = pending.drain(..=end).collect();
                emit_line(&line, &mut on_line);
            }
        }
        emit_line(&pending, &mut on_line);
        Ok(status)
    }

    /// What [`ApiClient::request`] would send, as JSON with credentials masked.
    pub fn preview(&self, operation: &OperationRecord, payload: &AssembledPayload) -> Value {
        let mut headers = Map::new();
        if let Some(token) = &self.token {
            let value = format!("Bearer {token}");
            headers.insert("Authorization".into(), Value::String(redact_header("Authorization", &value)));
        }
        for (name, value) in &payload.headers {
            headers.insert(name.clone(), Value::String(redact_header(name, &to_plain_string(value))));
        }
        json!({
            "method": operation.method,
            "url": self.url_for(&build_path(&operation.path, &payload.path_params)),
            "query": payload.query_params,
            "headers": headers,
            "body": payload.body_value(),
        })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn emit_line<F: FnMut(&str)>(bytes: &[u8], on_line: &mut F) {
    let text = String::from_utf8_lossy(bytes);
    let line = text.trim_end_matches(['\r', '\n']);
    if !line.is_empty() {
        on_line(line);
    }
}

fn parse_method(method: &str) -> Result<Method, CallError> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| CallError::InvalidMethod(method.to_string()))
}

fn plain_pairs(values: &Map<String, Value>) -> Vec<(String, String)> {
    values.iter().map(|(name, value)| (name.clone(), to_plain_string(value))).collect()
}

/// Requires an absolute `http` or `https` URL with a host.
fn validate_base_url(base: &str) -> Result<()> {
    let parsed = Url::parse(base).map_err(|error| anyhow!("invalid base URL '{}': {}", base, error))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!("base URL must use http or https; got '{}://'", parsed.scheme()));
    }
    if parsed.host_str().is_none() {
        return Err(anyhow!("base URL must include a host"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation(method: &str, path: &str) -> OperationRecord {
        OperationRecord {
            operation_id: "op".into(),
            method: method.into(),
            path: path.into(),
            display_path: path.into(),
            summary: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: Default::default(),
            raw: Value::Null,
        }
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(ApiClient::new("http://localhost:8001", None).is_ok());
        assert!(ApiClient::new("not a url", None).is_err());
        assert!(ApiClient::new("ftp://example.com", None).is_err());
    }

    #[test]
    fn builds_request_from_payload() {
        let client = ApiClient::new("http://localhost:8001/api/", Some("t0k".into())).expect("client");
        let payload = AssembledPayload {
            path_params: map(json!({ "id": "a b" })),
            query_params: map(json!({ "verbose": true, "limit": 5 })),
            headers: map(json!({ "X-Trace": "abc" })),
            body: map(json!({ "profile": { "name": "Ada" } })),
        };

        let request = client
            .request(&operation("put", "/users/{id}"), &payload)
            .expect("builder")
            .build()
            .expect("request");

        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.url().as_str(), "http://localhost:8001/api/users/a%20b?verbose=true&limit=5");
        assert_eq!(request.headers()["authorization"], "Bearer t0k");
        assert_eq!(request.headers()["x-trace"], "abc");
        let body = request.body().and_then(|body| body.as_bytes()).expect("json body");
        assert_eq!(serde_json::from_slice::<Value>(body).expect("json"), json!({ "profile": { "name": "Ada" } }));
    }

    #[test]
    fn empty_body_is_not_sent() {
        let client = ApiClient::new("http://localhost:8001", None).expect("client");
        let request = client
            .request(&operation("GET", "/items"), &AssembledPayload::default())
            .expect("builder")
            .build()
            .expect("request");
        assert!(request.body().is_none());
        assert!(request.url().query().is_none());
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn invalid_method_is_rejected() {
        let client = ApiClient::new("http://localhost:8001", None).expect("client");
        let error = client
            .request(&operation("BAD METHOD", "/x"), &AssembledPayload::default())
            .expect_err("method");
        assert!(matches!(error, CallError::InvalidMethod(_)));
    }

    #[test]
    fn emitted_lines_drop_terminators_and_blanks() {
        let mut lines = Vec::new();
        emit_line(b"data: 1\r\n", &mut |line: &str| lines.push(line.to_string()));
        emit_line(b"\n", &mut |line: &str| lines.push(line.to_string()));
        emit_line(b"tail", &mut |line: &str| lines.push(line.to_string()));
        assert_eq!(lines, vec!["data: 1".to_string(), "tail".to_string()]);
    }

    #[test]
    fn preview_masks_credentials() {
        let client = ApiClient::new("http://localhost:8001", Some("secret-token".into())).expect("client");
        let payload = AssembledPayload {
            headers: map(json!({ "X-Api-Key": "k-123", "X-Trace": "t" })),
            ..AssembledPayload::default()
        };
        let preview = client.preview(&operation("GET", "/items"), &payload);
        let rendered = preview.to_string();
        assert!(!rendered.contains("secret-token"));
        assert!(!rendered.contains("k-123"));
        assert_eq!(preview["headers"]["X-Trace"], json!("t"));
        assert_eq!(preview["url"], json!("http://localhost:8001/items"));
        assert_eq!(preview["body"], Value::Null);
    }
}
