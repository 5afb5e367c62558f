use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::builder::{CompiledBody, CompiledRequest, FormValue, normalize_url};
use super::client::build_client;
use crate::config::NetworkSettings;
use crate::error::AppError;
use crate::event::Event;
use crate::state::request_state::{FileRef, HttpMethod};

/// What came back over the wire, before any normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body_text: String,
    pub elapsed_ms: u64,
}

/// Performs the network exchange for a compiled request. Any HTTP status is
/// a successful exchange; only connection-level failures are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &CompiledRequest) -> Result<RawResponse, AppError>;
}

/// Run one send, honoring cancellation, and report back on the event channel.
pub async fn execute(
    transport: Arc<dyn HttpTransport>,
    tab_id: String,
    send_id: u64,
    request: CompiledRequest,
    tx: UnboundedSender<Event>,
    cancel: CancellationToken,
) {
    let result = tokio::select! {
        res = transport.send(&request) => res,
        _ = cancel.cancelled() => Err(AppError::Cancelled),
    };
    let _ = tx.send(Event::Response {
        tab_id,
        send_id,
        request,
        result,
    });
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(settings: &NetworkSettings) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(settings)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn build(&self, state: &CompiledRequest) -> Result<reqwest::Request, AppError> {
        let method = match state.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
        };

        let target = normalize_url(&state.url);
        let url = url::Url::parse(&target)
            .map_err(|e| AppError::validation(format!("Invalid URL '{}': {}", target, e)))?;
        let mut builder = self.client.request(method, url);

        for (key, value) in &state.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let explicit_content_type = state.header("content-type").is_some();

        builder = match &state.body {
            None => builder,
            Some(CompiledBody::Json(text)) | Some(CompiledBody::Raw { text, .. }) => {
                builder.body(text.clone())
            }
            Some(CompiledBody::UrlEncoded(pairs)) => builder.form(pairs),
            Some(CompiledBody::FormData(fields)) => {
                let mut form = Form::new();
                for field in fields {
                    form = match &field.value {
                        FormValue::Text(text) => form.text(field.key.clone(), text.clone()),
                        FormValue::File(file) => form.part(field.key.clone(), file_part(file).await?),
                    };
                }
                builder.multipart(form)
            }
            Some(CompiledBody::Binary(file)) => builder.body(tokio::fs::read(&file.path).await?),
        };

        // Form encoders set their own Content-Type.
        if !explicit_content_type {
            if let Some(body) = &state.body {
                if !matches!(body, CompiledBody::FormData(_) | CompiledBody::UrlEncoded(_)) {
                    if let Some(ct) = body.body_type().default_content_type() {
                        builder = builder.header(reqwest::header::CONTENT_TYPE, ct);
                    }
                }
            }
        }

        Ok(builder.build()?)
    }
}

async fn file_part(file: &FileRef) -> Result<Part, AppError> {
    let bytes = tokio::fs::read(&file.path).await?;
    let mime = mime_guess::from_path(&file.path).first_or_octet_stream();
    let part = Part::bytes(bytes)
        .file_name(file.name.clone())
        .mime_str(mime.as_ref())?;
    Ok(part)
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, state: &CompiledRequest) -> Result<RawResponse, AppError> {
        let request = self.build(state).await?;
        debug!(method = state.method.as_str(), url = %request.url(), "sending request");

        let start = Instant::now();
        let response = self.client.execute(request).await?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("Unknown").to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let body_text = response.text().await?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text,
            headers,
            body_text,
            elapsed_ms,
        })
    }
}
