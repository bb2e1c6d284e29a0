//! Blocking HTTP implementation of [`SandboxApi`].

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use sandboxai_core::{
    config::ClientConfig,
    traits::SandboxApi,
    types::{
        ApiError, CreateSandboxRequest, IPythonCellResult, RunIPythonCellRequest,
        RunIPythonCellResponse, RunShellCommandRequest, RunShellCommandResponse, Sandbox,
        ShellCommandResult,
    },
    Error, Result,
};

/// Upper bound on a single health probe, independent of the request timeout.
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the v1 sandbox API.
pub struct HttpClient {
    base_url: String,
    base: Url,
    http: Client,
    poll_interval: Duration,
}

impl HttpClient {
    /// Create a client with default settings.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(base_url, &ClientConfig::default())
    }

    /// Create a client with explicit timeouts and polling settings.
    pub fn with_config(base_url: impl Into<String>, config: &ClientConfig) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::configuration("base_url must not be empty"));
        }
        let base = Url::parse(&base_url)
            .map_err(|e| Error::configuration(format!("Invalid base_url {:?}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::configuration(format!(
                "base_url {:?} cannot carry a path",
                base_url
            )));
        }

        // The blocking client defaults to a 30s timeout; cells may legitimately run longer.
        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            base,
            http,
            poll_interval: config.health_poll_interval(),
        })
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::configuration("base_url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn sandboxes_url(&self, space: &str) -> Result<Url> {
        self.endpoint(&["spaces", space, "sandboxes"])
    }

    fn sandbox_url(&self, space: &str, name: &str) -> Result<Url> {
        self.endpoint(&["spaces", space, "sandboxes", name])
    }

    fn tool_url(&self, space: &str, name: &str, tool: &str) -> Result<Url> {
        self.endpoint(&["spaces", space, "sandboxes", name, &format!("tools:{}", tool)])
    }

    /// Probe `/healthz`, giving up after `timeout`.
    fn probe_health(&self, timeout: Duration) -> bool {
        let url = match self.endpoint(&["healthz"]) {
            Ok(url) => url,
            Err(_) => return false,
        };
        match self.http.get(url.clone()).timeout(timeout).send() {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::trace!(url = %url, error = %e, "Health probe failed");
                false
            }
        }
    }

    fn send(&self, request: RequestBuilder, method: &str, url: &Url) -> Result<Response> {
        tracing::debug!(method = method, url = %url, "Sending request");
        request
            .send()
            .map_err(|e| Error::transport(format!("{} {} failed: {}", method, url, e)))
    }
}

impl SandboxApi for HttpClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn check_health(&self) -> bool {
        self.probe_health(HEALTH_PROBE_TIMEOUT)
    }

    fn check_health_within(&self, timeout: Duration) -> bool {
        self.probe_health(timeout.min(HEALTH_PROBE_TIMEOUT))
    }

    fn health_poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn create_sandbox(&self, space: &str, request: &CreateSandboxRequest) -> Result<Sandbox> {
        let url = self.sandboxes_url(space)?;
        let resp = self.send(self.http.post(url.clone()).json(request), "POST", &url)?;
        let resp = validate_response(resp, StatusCode::CREATED)?;
        decode(resp)
    }

    fn get_sandbox(&self, space: &str, name: &str) -> Result<Sandbox> {
        let url = self.sandbox_url(space, name)?;
        let resp = self.send(self.http.get(url.clone()), "GET", &url)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::not_found(space, name));
        }
        let resp = validate_response(resp, StatusCode::OK)?;
        decode(resp)
    }

    fn delete_sandbox(&self, space: &str, name: &str) -> Result<()> {
        let url = self.sandbox_url(space, name)?;
        let resp = self.send(self.http.delete(url.clone()), "DELETE", &url)?;
        validate_response(resp, StatusCode::NO_CONTENT)?;
        Ok(())
    }

    fn run_ipython_cell(
        &self,
        space: &str,
        name: &str,
        request: &RunIPythonCellRequest,
    ) -> Result<IPythonCellResult> {
        let url = self.tool_url(space, name, "run_ipython_cell")?;
        let resp = self.send(self.http.post(url.clone()).json(request), "POST", &url)?;
        let resp = validate_response(resp, StatusCode::OK)?;
        let body: RunIPythonCellResponse = decode(resp)?;
        Ok(IPythonCellResult::from_response(request.split_output, body))
    }

    fn run_shell_command(
        &self,
        space: &str,
        name: &str,
        request: &RunShellCommandRequest,
    ) -> Result<ShellCommandResult> {
        let url = self.tool_url(space, name, "run_shell_command")?;
        let resp = self.send(self.http.post(url.clone()).json(request), "POST", &url)?;
        let resp = validate_response(resp, StatusCode::OK)?;
        let body: RunShellCommandResponse = decode(resp)?;
        Ok(ShellCommandResult::from_response(request.split_output, body))
    }
}

// =============================================================================
// Response Helpers
// =============================================================================

/// Fail with [`Error::Protocol`] unless the response has the expected status.
fn validate_response(resp: Response, expected: StatusCode) -> Result<Response> {
    let actual = resp.status();
    if actual == expected {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(Error::protocol(
        expected.as_u16(),
        actual.as_u16(),
        error_detail(&body),
    ))
}

/// Prefer the `message` of a JSON error body, fall back to the raw text.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(err) => err.message,
        Err(_) => body.trim().to_string(),
    }
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let body = resp
        .text()
        .map_err(|e| Error::transport(format!("Failed to read response body: {}", e)))?;
    Ok(serde_json::from_str(&body)?)
}

// =============================================================================
// Tests
// =============================================================================
