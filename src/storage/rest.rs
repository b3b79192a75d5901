//! Shared plumbing for the Storage REST clients.

use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;

use crate::auth::SharedKeyCredential;
use crate::config::{StorageOptions, DEFAULT_API_VERSION};
use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::xml::deserialize::parse_error_code;

/// Formats a DateTime as RFC 1123 for `x-ms-date`.
pub(crate) fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parses an RFC 1123 `Last-Modified` value.
pub(crate) fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Signed HTTP access to one storage service endpoint.
pub(crate) struct RestClient {
    http: reqwest::Client,
    credential: SharedKeyCredential,
    endpoint: String,
}

impl RestClient {
    /// `service` is `blob` or `queue`; `endpoint_override` replaces the
    /// public `https://{account}.{service}.core.windows.net` root.
    pub fn new(
        options: &StorageOptions,
        service: &str,
        endpoint_override: Option<&str>,
    ) -> StorageResult<Self> {
        let credential = SharedKeyCredential::new(&options.account_name, &options.account_key)?;

        let endpoint = match endpoint_override {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.{}.core.windows.net", options.account_name, service),
        };
        url::Url::parse(&endpoint).map_err(|e| {
            StorageError::configuration(format!("Invalid {service} endpoint {endpoint}: {e}"))
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| StorageError::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            credential,
            endpoint,
        })
    }

    pub fn account(&self) -> &str {
        self.credential.account()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Starts a request to `{endpoint}/{path}` with the version and date headers.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.endpoint, path);
        self.http
            .request(method, url)
            .header("x-ms-version", DEFAULT_API_VERSION)
            .header("x-ms-date", format_http_date(&Utc::now()))
    }

    /// Signs and sends a request. Connection-level failures become
    /// `RequestFailed`; HTTP error statuses are returned to the caller.
    pub async fn send(&self, builder: RequestBuilder) -> StorageResult<Response> {
        let mut request = builder.build()?;
        self.credential.sign(&mut request)?;

        debug!("{} {}", request.method(), request.url());
        let response = self.http.execute(request).await?;
        debug!("-> {}", response.status());
        Ok(response)
    }
}

/// Converts a non-success response into a storage error.
///
/// The `x-ms-error-code` header wins; otherwise the XML body's `<Code>`.
pub(crate) async fn error_from_response(context: &str, response: Response) -> StorageError {
    let status = response.status();
    let request_id = header_string(&response, "x-ms-request-id");
    let header_code = header_string(&response, "x-ms-error-code");
    let body = response.text().await.unwrap_or_default();

    let remote_code = header_code.or_else(|| parse_error_code(&body));
    let code = remote_code
        .as_deref()
        .map(ErrorCode::from_remote)
        .unwrap_or(ErrorCode::RequestFailed);

    let message = format!(
        "{} failed: HTTP {} {}",
        context,
        status.as_u16(),
        remote_code.as_deref().unwrap_or_default()
    );

    let mut error = StorageError::with_message(code, message.trim_end()).with_status(status.as_u16());
    if let Some(id) = request_id {
        error = error.with_request_id(id);
    }
    error
}

pub(crate) fn header_string(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}
