//! SharedKey request signing for the Azure Storage REST API.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{StorageError, StorageResult};

type HmacSha256 = Hmac<Sha256>;

/// Account name plus decoded account key.
#[derive(Clone)]
pub struct SharedKeyCredential {
    account: String,
    key: Vec<u8>,
}

impl fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account", &self.account)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl SharedKeyCredential {
    /// Creates a credential from an account name and base64 account key.
    pub fn new(account: impl Into<String>, account_key: &str) -> StorageResult<Self> {
        let key = BASE64.decode(account_key).map_err(|e| {
            StorageError::configuration(format!("Account key is not valid base64: {e}"))
        })?;
        Ok(Self {
            account: account.into(),
            key,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Signs the request in place by adding the `Authorization` header.
    ///
    /// `x-ms-date` and `x-ms-version` must already be set.
    pub fn sign(&self, request: &mut Request) -> StorageResult<()> {
        let string_to_sign = build_string_to_sign(&self.account, request);
        let signature = compute_signature(&string_to_sign, &self.key)?;

        tracing::trace!("SharedKey string-to-sign: {:?}", string_to_sign);

        let value = HeaderValue::from_str(&format!("SharedKey {}:{}", self.account, signature))
            .map_err(|e| StorageError::configuration(format!("Invalid authorization header: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Builds the string-to-sign for SharedKey authentication.
fn build_string_to_sign(account: &str, request: &Request) -> String {
    let mut parts = Vec::new();

    // VERB
    parts.push(request.method().as_str().to_uppercase());

    // Content headers (must be in this exact order)
    let content_headers = [
        "content-encoding",
        "content-language",
        "content-length",
        "content-md5",
        "content-type",
    ];

    for header in &content_headers {
        let value = if *header == "content-length" {
            // Content-Length is empty when 0 or absent
            match body_length(request) {
                Some(0) | None => String::new(),
                Some(len) => len.to_string(),
            }
        } else {
            header_str(request, header).to_string()
        };
        parts.push(value);
    }

    // Date is always carried by x-ms-date
    parts.push(String::new());

    let conditional_headers = [
        "if-modified-since",
        "if-match",
        "if-none-match",
        "if-unmodified-since",
        "range",
    ];

    for header in &conditional_headers {
        parts.push(header_str(request, header).to_string());
    }

    let headers_str = parts.join("\n");
    let canonicalized_headers = build_canonicalized_headers(request);
    let canonicalized_resource = build_canonicalized_resource(account, request);

    format!("{}\n{}{}", headers_str, canonicalized_headers, canonicalized_resource)
}

fn header_str<'a>(request: &'a Request, name: &str) -> &'a str {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn body_length(request: &Request) -> Option<usize> {
    request.body().and_then(|b| b.as_bytes()).map(<[u8]>::len)
}

/// Builds canonicalized `x-ms-*` headers, each line terminated by `\n`.
fn build_canonicalized_headers(request: &Request) -> String {
    let ms_headers: BTreeMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            let name = name.as_str().to_lowercase();
            if !name.starts_with("x-ms-") {
                return None;
            }
            let value = value.to_str().ok()?;
            let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
            Some((name, normalized))
        })
        .collect();

    let mut result = String::new();
    for (name, value) in &ms_headers {
        result.push_str(name);
        result.push(':');
        result.push_str(value);
        result.push('\n');
    }
    result
}

/// Builds the canonicalized resource: `/{account}{path}` followed by the
/// sorted, decoded query parameters.
fn build_canonicalized_resource(account: &str, request: &Request) -> String {
    let url = request.url();
    let mut resource = format!("/{}{}", account, url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url.query_pairs() {
        params
            .entry(key.to_lowercase())
            .or_default()
            .push(value.into_owned());
    }

    for (key, mut values) in params {
        values.sort();
        resource.push('\n');
        resource.push_str(&key);
        resource.push(':');
        resource.push_str(&values.join(","));
    }

    resource
}

/// Computes HMAC-SHA256 signature.
fn compute_signature(string_to_sign: &str, key: &[u8]) -> StorageResult<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| StorageError::configuration("Failed to create HMAC"))?;

    mac.update(string_to_sign.as_bytes());
    let result = mac.finalize();

    Ok(BASE64.encode(result.into_bytes()))
}
