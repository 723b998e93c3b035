use super::{Answer, DocumentFile, IngestBackend, IngestReceipt, QueryBackend};
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

const DOCUMENT_ID_KEYS: [&str; 4] = ["document_id", "documentId", "doc_id", "id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Ingest,
    Query,
}

impl Operation {
    fn unreachable_message(self) -> &'static str {
        match self {
            Operation::Ingest => "Network Error: Cannot reach the backend server (Is it running?).",
            Operation::Query => {
                "Network Error: Cannot reach the backend server (Check connection or service status)."
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    document_id: &'a str,
}

/// HTTP client for the document service
///
/// No request timeout is set: calls run until the transport resolves or fails.
pub struct BackendClient {
    client: Client,
    upload_url: Url,
    query_url: Url,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self {
            client,
            upload_url: config.upload_url()?,
            query_url: config.query_url()?,
        })
    }

    async fn send<T: DeserializeOwned>(&self, op: Operation, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|e| transport_error(op, e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(op, e))?;
        debug!(?op, status = status.as_u16(), bytes = body.len(), "Backend responded");

        if !status.is_success() {
            return Err(service_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| invalid_response(status, e))
    }
}

fn transport_error(op: Operation, err: reqwest::Error) -> Error {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        debug!(?op, "Backend unreachable: {}", err);
        Error::Unreachable(op.unreachable_message().to_string())
    } else {
        Error::Http(err)
    }
}

fn invalid_response(status: StatusCode, err: impl std::fmt::Display) -> Error {
    Error::Service {
        status: status.as_u16(),
        code: None,
        message: format!("Invalid response from backend: {}", err),
    }
}

/// Build an application error from a non-success response
///
/// Prefers `detail`, then `message`, then the bare status code. Empty strings,
/// `false` and `0` count as absent.
pub fn service_error(status: StatusCode, body: &str) -> Error {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |key: &str| non_null(parsed.as_ref(), key);

    let message = field("detail")
        .and_then(error_text)
        .or_else(|| field("message").and_then(error_text))
        .unwrap_or_else(|| format!("Server Error: {}", status.as_u16()));

    let code = field("code").and_then(|code| match code {
        Value::String(text) => Some(text.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    Error::Service {
        status: status.as_u16(),
        code,
        message,
    }
}

fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

fn non_null<'a>(body: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    body.and_then(|v| v.get(key)).filter(|v| !v.is_null())
}

fn extract_document_id(body: &Value) -> Option<String> {
    DOCUMENT_ID_KEYS.iter().find_map(|key| match body.get(*key)? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    })
}

#[async_trait]
impl IngestBackend for BackendClient {
    async fn ingest(&self, file: &DocumentFile) -> Result<IngestReceipt> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new().part("file", part);

        debug!(file = %file.name, bytes = file.bytes.len(), "Uploading document");
        let request = self.client.post(self.upload_url.clone()).multipart(form);
        let body: Value = self.send(Operation::Ingest, request).await?;

        let document_id = extract_document_id(&body).ok_or_else(|| {
            invalid_response(StatusCode::OK, "response carries no document id")
        })?;
        Ok(IngestReceipt { document_id })
    }
}

#[async_trait]
impl QueryBackend for BackendClient {
    async fn query(&self, query: &str, document_id: &str) -> Result<Answer> {
        debug!(document_id, "Sending query");
        let request = self
            .client
            .post(self.query_url.clone())
            .json(&QueryRequest { query, document_id });
        self.send(Operation::Query, request).await
    }
}
