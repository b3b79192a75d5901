//! Common test utilities.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, Response, StatusCode, Uri},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use dashmap::{DashMap, DashSet};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use parking_lot::Mutex;
use quick_xml::events::Event;
use sha2::Sha256;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

use azstorage_rs::models::BlobStream;
use azstorage_rs::{
    ApiServer, BlobBody, BlobConnection, BlobStore, Config, ConnectionConfig, ErrorCode,
    MemoryBlobStore, RemoteAccount, StorageError, StorageOptions, StorageResult, UploadReceipt,
    DEFAULT_ACCOUNT, DEFAULT_ACCOUNT_KEY,
};

/// Builds a blob connection over a pre-built client.
pub fn connection(store: Arc<dyn BlobStore>) -> BlobConnection {
    BlobConnection::new(ConnectionConfig::from_client(Some(store)).unwrap())
}

/// Test server wrapper.
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryBlobStore>,
}

impl TestServer {
    /// Starts the API on a random port over an in-memory store.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let store = Arc::new(MemoryBlobStore::new());
        let config = Config {
            host: "127.0.0.1".to_string(),
            port,
            ..Config::default()
        };
        let server = ApiServer::with_connection(config, connection(store.clone()));

        // Start server in background
        tokio::spawn(async move {
            server.serve(listener).await.unwrap();
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            store,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Blob store that records every call before delegating to a memory store.
pub struct RecordingStore {
    pub inner: MemoryBlobStore,
    calls: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }

    /// Calls in the order they were made.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Calls that mutate blobs.
    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("upload") || c.starts_with("delete"))
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl RemoteAccount for RecordingStore {
    fn account_name(&self) -> &str {
        self.inner.account_name()
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}

#[async_trait]
impl BlobStore for RecordingStore {
    async fn container_exists(&self, container: &str) -> StorageResult<bool> {
        self.record("container_exists");
        self.inner.container_exists(container).await
    }

    async fn create_container(&self, container: &str) -> StorageResult<()> {
        self.record("create_container");
        self.inner.create_container(container).await
    }

    async fn blob_exists(&self, container: &str, blob: &str) -> StorageResult<bool> {
        self.record("blob_exists");
        self.inner.blob_exists(container, blob).await
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        body: BlobBody,
        overwrite: bool,
    ) -> StorageResult<Option<UploadReceipt>> {
        self.record(if overwrite { "upload(overwrite)" } else { "upload(conditional)" });
        self.inner.upload_blob(container, blob, body, overwrite).await
    }

    async fn delete_blob(&self, container: &str, blob: &str) -> StorageResult<()> {
        self.record("delete_blob");
        self.inner.delete_blob(container, blob).await
    }

    async fn list_blobs(&self, container: &str) -> StorageResult<Vec<String>> {
        self.record("list_blobs");
        self.inner.list_blobs(container).await
    }

    async fn download_blob(&self, container: &str, blob: &str) -> StorageResult<Bytes> {
        self.record("download_blob");
        self.inner.download_blob(container, blob).await
    }

    async fn open_blob_stream(&self, container: &str, blob: &str) -> StorageResult<BlobStream> {
        self.record("open_blob_stream");
        self.inner.open_blob_stream(container, blob).await
    }
}

/// How a [`FailingStore`] answers uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Delegate,
    /// Connection-level failure.
    Fail,
    /// Accepted without a receipt.
    Unacknowledged,
    /// The conditional write lost a race.
    AlreadyExists,
}

/// Memory store whose mutating calls can be made to fail.
pub struct FailingStore {
    pub inner: MemoryBlobStore,
    pub upload: Mutex<UploadOutcome>,
    pub fail_delete: Mutex<bool>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            upload: Mutex::new(UploadOutcome::Delegate),
            fail_delete: Mutex::new(false),
        }
    }

    pub fn set_upload(&self, outcome: UploadOutcome) {
        *self.upload.lock() = outcome;
    }

    pub fn set_fail_delete(&self, fail: bool) {
        *self.fail_delete.lock() = fail;
    }
}

impl RemoteAccount for FailingStore {
    fn account_name(&self) -> &str {
        self.inner.account_name()
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}

#[async_trait]
impl BlobStore for FailingStore {
    async fn container_exists(&self, container: &str) -> StorageResult<bool> {
        self.inner.container_exists(container).await
    }

    async fn create_container(&self, container: &str) -> StorageResult<()> {
        self.inner.create_container(container).await
    }

    async fn blob_exists(&self, container: &str, blob: &str) -> StorageResult<bool> {
        self.inner.blob_exists(container, blob).await
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        body: BlobBody,
        overwrite: bool,
    ) -> StorageResult<Option<UploadReceipt>> {
        let outcome = *self.upload.lock();
        match outcome {
            UploadOutcome::Delegate => self.inner.upload_blob(container, blob, body, overwrite).await,
            UploadOutcome::Fail => {
                Err(StorageError::request_failed("connection reset by peer").with_status(500))
            }
            UploadOutcome::Unacknowledged => Ok(None),
            UploadOutcome::AlreadyExists => {
                Err(StorageError::new(ErrorCode::BlobAlreadyExists).with_status(409))
            }
        }
    }

    async fn delete_blob(&self, container: &str, blob: &str) -> StorageResult<()> {
        let fail = *self.fail_delete.lock();
        if fail {
            return Err(StorageError::request_failed("operation timed out"));
        }
        self.inner.delete_blob(container, blob).await
    }

    async fn list_blobs(&self, container: &str) -> StorageResult<Vec<String>> {
        self.inner.list_blobs(container).await
    }

    async fn download_blob(&self, container: &str, blob: &str) -> StorageResult<Bytes> {
        self.inner.download_blob(container, blob).await
    }

    async fn open_blob_stream(&self, container: &str, blob: &str) -> StorageResult<BlobStream> {
        self.inner.open_blob_stream(container, blob).await
    }
}

/// A request seen by [`FakeAzure`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body_len: usize,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone)]
struct FakeMessage {
    id: String,
    pop_receipt: String,
    text: String,
}

/// Minimal stand-in for the Storage REST endpoints, path-style like an
/// emulator (`/{account}/{container}/{blob}`).
#[derive(Clone, Default)]
pub struct FakeAzure {
    pub containers: Arc<DashSet<String>>,
    pub blobs: Arc<DashMap<(String, String), Bytes>>,
    staged: Arc<DashMap<String, Bytes>>,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
    queues: Arc<DashMap<String, Vec<FakeMessage>>>,
    delete_message_status: Arc<AtomicU16>,
    /// Page size for List Blobs.
    pub page_size: usize,
}

impl FakeAzure {
    /// Starts the fake and returns its account endpoint.
    pub async fn start() -> (Self, String) {
        let fake = FakeAzure {
            delete_message_status: Arc::new(AtomicU16::new(204)),
            page_size: 2,
            ..FakeAzure::default()
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let app = Router::new().fallback(handle).with_state(fake.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (fake, format!("http://127.0.0.1:{}/{}", port, DEFAULT_ACCOUNT))
    }

    /// Options for the development account pointed at `endpoint`.
    pub fn options(endpoint: &str) -> StorageOptions {
        let mut options = StorageOptions::new(DEFAULT_ACCOUNT, DEFAULT_ACCOUNT_KEY);
        options.blob_endpoint = Some(endpoint.to_string());
        options.queue_endpoint = Some(endpoint.to_string());
        options
    }

    pub fn create_queue(&self, queue: &str) {
        self.queues.entry(queue.to_string()).or_default();
    }

    /// Enqueues a message and returns its id.
    pub fn push_message(&self, queue: &str, text: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.queues.entry(queue.to_string()).or_default().push(FakeMessage {
            id: id.clone(),
            pop_receipt: BASE64.encode(uuid::Uuid::new_v4().as_bytes()),
            text: text.to_string(),
        });
        id
    }

    pub fn message_count(&self, queue: &str) -> usize {
        self.queues.get(queue).map(|q| q.len()).unwrap_or(0)
    }

    /// Status returned by a successful Delete Message.
    pub fn set_delete_message_status(&self, status: u16) {
        self.delete_message_status.store(status, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }
}

fn response(status: StatusCode, headers: &[(&str, String)], body: impl Into<Body>) -> Response<Body> {
    let mut builder = Response::builder()
        .status(status)
        .header("x-ms-request-id", uuid::Uuid::new_v4().to_string());
    for (name, value) in headers {
        builder = builder.header(*name, value.as_str());
    }
    builder.body(body.into()).unwrap()
}

fn error(status: StatusCode, code: &str, method: &Method) -> Response<Body> {
    let body = if *method == Method::HEAD {
        String::new()
    } else {
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>{}</Code><Message>fake</Message></Error>",
            code
        )
    };
    response(status, &[("x-ms-error-code", code.to_string())], body)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
}

/// Recomputes the SharedKey signature of a received request with the
/// development account key and compares it to the `Authorization` header.
fn signature_matches(method: &Method, uri: &Uri, headers: &HeaderMap) -> bool {
    let Some(signature) = header(headers, "authorization")
        .strip_prefix(&format!("SharedKey {}:", DEFAULT_ACCOUNT))
        .map(str::to_string)
    else {
        return false;
    };
    if header(headers, "x-ms-date").is_empty() || header(headers, "x-ms-version").is_empty() {
        return false;
    }

    let mut lines = vec![method.as_str().to_string()];
    for name in [
        "content-encoding",
        "content-language",
        "content-length",
        "content-md5",
        "content-type",
    ] {
        let value = header(headers, name);
        lines.push(if name == "content-length" && value == "0" {
            String::new()
        } else {
            value.to_string()
        });
    }
    lines.push(String::new());
    for name in [
        "if-modified-since",
        "if-match",
        "if-none-match",
        "if-unmodified-since",
        "range",
    ] {
        lines.push(header(headers, name).to_string());
    }

    let ms_headers: BTreeMap<String, String> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-ms-"))
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((
                name.as_str().to_string(),
                value.split_whitespace().collect::<Vec<_>>().join(" "),
            ))
        })
        .collect();
    let mut canonical_headers = String::new();
    for (name, value) in &ms_headers {
        canonical_headers.push_str(&format!("{name}:{value}\n"));
    }

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes()) {
        params
            .entry(key.to_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    let mut resource = format!("/{}{}", DEFAULT_ACCOUNT, uri.path());
    for (key, mut values) in params {
        values.sort();
        resource.push_str(&format!("\n{key}:{}", values.join(",")));
    }

    let string_to_sign = format!("{}\n{}{}", lines.join("\n"), canonical_headers, resource);
    let key = BASE64.decode(DEFAULT_ACCOUNT_KEY).unwrap();
    let mut mac = Hmac::<Sha256>::new_from_slice(&key).unwrap();
    mac.update(string_to_sign.as_bytes());
    BASE64.encode(mac.finalize().into_bytes()) == signature
}

/// Block IDs from a Put Block List body, in commit order.
fn parse_block_list_ids(xml: &str) -> Vec<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.trim_text(true);

    let mut ids = Vec::new();
    let mut in_block = false;
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) => {
                in_block = matches!(e.name().as_ref(), b"Latest" | b"Committed" | b"Uncommitted");
            }
            Event::Text(e) if in_block => ids.push(e.unescape().unwrap().into_owned()),
            Event::End(_) => in_block = false,
            Event::Eof => break,
            _ => {}
        }
    }
    ids
}

fn md5_base64(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    BASE64.encode(hasher.finalize())
}

fn created(data: &[u8]) -> Response<Body> {
    response(
        StatusCode::CREATED,
        &[
            ("ETag", format!("\"0x{}\"", uuid::Uuid::new_v4().simple())),
            ("Last-Modified", "Mon, 19 Oct 2026 10:00:00 GMT".to_string()),
            ("Content-MD5", md5_base64(data)),
        ],
        Body::empty(),
    )
}

async fn handle(
    State(fake): State<FakeAzure>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response<Body> {
    let query: HashMap<String, String> =
        url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
            .into_owned()
            .collect();

    fake.requests.lock().push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: query.clone(),
        headers: headers.clone(),
        body_len: body.len(),
    });

    if !signature_matches(&method, &uri, &headers) {
        return error(StatusCode::FORBIDDEN, "AuthenticationFailed", &method);
    }

    let segments: Vec<String> = uri
        .path()
        .trim_start_matches('/')
        .splitn(3, '/')
        .map(|s| {
            percent_encoding::percent_decode_str(s)
                .decode_utf8_lossy()
                .into_owned()
        })
        .collect();
    let resource = segments.get(1).cloned().unwrap_or_default();
    let rest = segments.get(2).cloned();

    if query.get("comp").map(String::as_str) == Some("metadata")
        || rest.as_deref().map_or(false, |r| r.starts_with("messages"))
    {
        return handle_queue(&fake, &method, &resource, rest.as_deref(), &query);
    }

    match rest {
        None => handle_container(&fake, &method, &resource, &query),
        Some(blob) => handle_blob(&fake, &method, &resource, &blob, &query, &headers, body),
    }
}

fn handle_container(
    fake: &FakeAzure,
    method: &Method,
    container: &str,
    query: &HashMap<String, String>,
) -> Response<Body> {
    let exists = fake.containers.contains(container);
    match (method.clone(), query.get("comp").map(String::as_str)) {
        (Method::PUT, None) => {
            if !fake.containers.insert(container.to_string()) {
                return error(StatusCode::CONFLICT, "ContainerAlreadyExists", method);
            }
            created(b"")
        }
        (Method::GET, Some("list")) => {
            if !exists {
                return error(StatusCode::NOT_FOUND, "ContainerNotFound", method);
            }
            let mut names: Vec<String> = fake
                .blobs
                .iter()
                .filter(|e| e.key().0 == container)
                .map(|e| e.key().1.clone())
                .collect();
            names.sort();

            let start: usize = query.get("marker").and_then(|m| m.parse().ok()).unwrap_or(0);
            let end = (start + fake.page_size).min(names.len());
            let blobs: String = names[start.min(end)..end]
                .iter()
                .map(|n| format!("<Blob><Name>{}</Name><Properties /></Blob>", n))
                .collect();
            let next = if end < names.len() { end.to_string() } else { String::new() };
            let xml = format!(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?><EnumerationResults ContainerName=\"{}\"><Blobs>{}</Blobs><NextMarker>{}</NextMarker></EnumerationResults>",
                container, blobs, next
            );
            response(StatusCode::OK, &[("Content-Type", "application/xml".to_string())], xml)
        }
        (Method::HEAD, None) | (Method::GET, None) => {
            if exists {
                response(StatusCode::OK, &[], Body::empty())
            } else {
                error(StatusCode::NOT_FOUND, "ContainerNotFound", method)
            }
        }
        _ => error(StatusCode::BAD_REQUEST, "UnsupportedHttpVerb", method),
    }
}

fn handle_blob(
    fake: &FakeAzure,
    method: &Method,
    container: &str,
    blob: &str,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    body: Bytes,
) -> Response<Body> {
    let key = (container.to_string(), blob.to_string());
    let if_none_match = headers.get("if-none-match") == Some(&HeaderValue::from_static("*"));

    match (method.clone(), query.get("comp").map(String::as_str)) {
        (Method::HEAD, None) => match fake.blobs.contains_key(&key) {
            true => response(StatusCode::OK, &[], Body::empty()),
            false => error(StatusCode::NOT_FOUND, "BlobNotFound", method),
        },
        (Method::GET, None) => match fake.blobs.get(&key) {
            Some(data) => response(StatusCode::OK, &[], data.value().clone()),
            None => error(StatusCode::NOT_FOUND, "BlobNotFound", method),
        },
        (Method::DELETE, None) => match fake.blobs.remove(&key) {
            Some(_) => response(StatusCode::ACCEPTED, &[], Body::empty()),
            None => error(StatusCode::NOT_FOUND, "BlobNotFound", method),
        },
        (Method::PUT, Some("block")) => {
            let Some(id) = query.get("blockid") else {
                return error(StatusCode::BAD_REQUEST, "InvalidQueryParameterValue", method);
            };
            fake.staged.insert(id.clone(), body);
            created(b"")
        }
        (Method::PUT, Some("blocklist")) => {
            if if_none_match && fake.blobs.contains_key(&key) {
                return error(StatusCode::CONFLICT, "BlobAlreadyExists", method);
            }
            let xml = String::from_utf8_lossy(&body).into_owned();
            let ids = parse_block_list_ids(&xml);
            let mut data = Vec::new();
            for id in ids {
                match fake.staged.remove(&id) {
                    Some((_, chunk)) => data.extend_from_slice(&chunk),
                    None => return error(StatusCode::BAD_REQUEST, "InvalidBlockList", method),
                }
            }
            let resp = created(&data);
            fake.blobs.insert(key, Bytes::from(data));
            resp
        }
        (Method::PUT, None) => {
            if !fake.containers.contains(container) {
                return error(StatusCode::NOT_FOUND, "ContainerNotFound", method);
            }
            if if_none_match && fake.blobs.contains_key(&key) {
                return error(StatusCode::CONFLICT, "BlobAlreadyExists", method);
            }
            let sent_md5 = headers.get("content-md5").and_then(|v| v.to_str().ok());
            if let Some(md5) = sent_md5 {
                if md5 != md5_base64(&body) {
                    return error(StatusCode::BAD_REQUEST, "Md5Mismatch", method);
                }
            }
            let resp = created(&body);
            fake.blobs.insert(key, body);
            resp
        }
        _ => error(StatusCode::BAD_REQUEST, "UnsupportedHttpVerb", method),
    }
}

fn handle_queue(
    fake: &FakeAzure,
    method: &Method,
    queue: &str,
    rest: Option<&str>,
    query: &HashMap<String, String>,
) -> Response<Body> {
    if !fake.queues.contains_key(queue) {
        return error(StatusCode::NOT_FOUND, "QueueNotFound", method);
    }

    let message_id = rest.and_then(|r| r.strip_prefix("messages/"));
    match (method.clone(), message_id) {
        (Method::GET, None) if rest.is_none() => response(StatusCode::OK, &[], Body::empty()),
        (Method::GET, None) => {
            let limit: usize = query
                .get("numofmessages")
                .and_then(|n| n.parse().ok())
                .unwrap_or(1);
            let messages = fake.queues.get(queue).map(|q| q.value().clone()).unwrap_or_default();
            let items: String = messages
                .iter()
                .take(limit)
                .map(|m| {
                    format!(
                        "<QueueMessage><MessageId>{}</MessageId><InsertionTime>Mon, 19 Oct 2026 10:00:00 GMT</InsertionTime><PopReceipt>{}</PopReceipt><TimeNextVisible>Mon, 19 Oct 2026 10:00:30 GMT</TimeNextVisible><DequeueCount>1</DequeueCount><MessageText>{}</MessageText></QueueMessage>",
                        m.id, m.pop_receipt, m.text
                    )
                })
                .collect();
            let xml = format!(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?><QueueMessagesList>{}</QueueMessagesList>",
                items
            );
            response(StatusCode::OK, &[], xml)
        }
        (Method::DELETE, Some(id)) => {
            let receipt = query.get("popreceipt").cloned().unwrap_or_default();
            let mut messages = match fake.queues.get_mut(queue) {
                Some(messages) => messages,
                None => return error(StatusCode::NOT_FOUND, "QueueNotFound", method),
            };
            let Some(index) = messages
                .iter()
                .position(|m| m.id == id && m.pop_receipt == receipt)
            else {
                return error(StatusCode::NOT_FOUND, "MessageNotFound", method);
            };
            messages.remove(index);
            let status = fake.delete_message_status.load(Ordering::SeqCst);
            response(StatusCode::from_u16(status).unwrap(), &[], Body::empty())
        }
        _ => error(StatusCode::BAD_REQUEST, "UnsupportedHttpVerb", method),
    }
}
