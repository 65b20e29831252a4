//! Network boundary of the client core.
//!
//! [`ApiGateway`] is everything the core needs from the backend. Every
//! failure crossing it is already a normalized [`ApiError`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{
        ApiInfo, ChatStats, ConversationHistory, DocumentInfo, DocumentStats, HealthStatus,
        VectorStoreStatus,
    },
    error::ApiError,
    protocol::{
        ChatRequest, ChatResponse, DocumentListResponse, DocumentResponse, StatusResponse,
        TextDocumentRequest, WebDocumentRequest,
    },
};
use tracing::debug;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_API_PREFIX: &str = "/api/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait ApiGateway: Send + Sync {
    async fn get_health(&self) -> Result<HealthStatus, ApiError>;
    async fn get_api_info(&self) -> Result<ApiInfo, ApiError>;

    async fn send_message(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;
    async fn get_conversations(&self) -> Result<Vec<ConversationHistory>, ApiError>;
    async fn get_conversation(&self, conversation_id: &str)
        -> Result<ConversationHistory, ApiError>;
    async fn delete_conversation(&self, conversation_id: &str) -> Result<StatusResponse, ApiError>;
    async fn clear_conversations(&self) -> Result<StatusResponse, ApiError>;
    async fn get_chat_stats(&self) -> Result<ChatStats, ApiError>;

    async fn add_text_document(
        &self,
        request: &TextDocumentRequest,
    ) -> Result<DocumentResponse, ApiError>;
    async fn add_web_document(
        &self,
        request: &WebDocumentRequest,
    ) -> Result<DocumentResponse, ApiError>;
    async fn get_documents(&self) -> Result<DocumentListResponse, ApiError>;
    async fn get_document(&self, doc_id: &str) -> Result<DocumentInfo, ApiError>;
    async fn delete_document(&self, doc_id: &str) -> Result<StatusResponse, ApiError>;

    async fn get_vector_store_status(&self) -> Result<VectorStoreStatus, ApiError>;
    async fn get_document_stats(&self) -> Result<DocumentStats, ApiError>;
    async fn clear_vector_store(&self) -> Result<StatusResponse, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Service root; `/health` lives directly under it.
    pub base_url: String,
    /// Path of the versioned API below `base_url`.
    pub api_prefix: String,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_prefix: DEFAULT_API_PREFIX.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// JSON-over-HTTP gateway backed by reqwest.
pub struct HttpGateway {
    http: Client,
    service_root: Url,
    api_root: Url,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, ClientError> {
        let service_root = Url::parse(config.base_url.trim())
            .map_err(|err| ClientError::Config(format!("base url '{}': {err}", config.base_url)))?;
        if service_root.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base url '{}' cannot carry paths",
                config.base_url
            )));
        }

        let mut api_root = service_root.clone();
        if let Ok(mut segments) = api_root.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(config.api_prefix.split('/').filter(|s| !s.is_empty()));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ClientError::Config(format!("http client: {err}")))?;

        Ok(Self {
            http,
            service_root,
            api_root,
        })
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        join_segments(&self.api_root, segments)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "gateway response");

        if status.is_success() {
            return response.json::<T>().await.map_err(|err| {
                ApiError::new(format!("invalid response body: {err}"))
                    .with_code(status.as_u16().to_string())
            });
        }

        match response.text().await {
            Ok(body) => Err(normalize_error_body(status, &body)),
            Err(err) => Err(ApiError::new(format!(
                "Request failed with status code {} (unreadable body: {err})",
                status.as_u16()
            ))
            .with_code(status.as_u16().to_string())),
        }
    }
}

fn join_segments(root: &Url, segments: &[&str]) -> Url {
    let mut url = root.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn transport_error(err: reqwest::Error) -> ApiError {
    let api_error = ApiError::new(err.to_string());
    match err.status() {
        Some(status) => api_error.with_code(status.as_u16().to_string()),
        None => api_error,
    }
}

/// Maps a non-2xx response body into the normalized error shape.
///
/// FastAPI reports `{"detail": ...}` where detail is a string or a list of
/// validation problems; the service's global handler adds an `error` field.
pub(crate) fn normalize_error_body(status: StatusCode, body: &str) -> ApiError {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let field = |name: &str| -> Option<String> {
        match parsed.as_ref()?.get(name)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    };

    let detail = field("detail");
    let error = detail
        .clone()
        .or_else(|| field("error"))
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));

    ApiError {
        error,
        detail,
        code: Some(status.as_u16().to_string()),
    }
}

#[async_trait]
impl ApiGateway for HttpGateway {
    async fn get_health(&self) -> Result<HealthStatus, ApiError> {
        let url = join_segments(&self.service_root, &["health"]);
        self.execute(self.http.get(url)).await
    }

    async fn get_api_info(&self) -> Result<ApiInfo, ApiError> {
        self.execute(self.http.get(self.endpoint(&["info"]))).await
    }

    async fn send_message(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.execute(self.http.post(self.endpoint(&["chat", ""])).json(request))
            .await
    }

    async fn get_conversations(&self) -> Result<Vec<ConversationHistory>, ApiError> {
        self.execute(self.http.get(self.endpoint(&["chat", "conversations"])))
            .await
    }

    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationHistory, ApiError> {
        let url = self.endpoint(&["chat", "conversations", conversation_id]);
        self.execute(self.http.get(url)).await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<StatusResponse, ApiError> {
        let url = self.endpoint(&["chat", "conversations", conversation_id]);
        self.execute(self.http.delete(url)).await
    }

    async fn clear_conversations(&self) -> Result<StatusResponse, ApiError> {
        self.execute(self.http.delete(self.endpoint(&["chat", "conversations"])))
            .await
    }

    async fn get_chat_stats(&self) -> Result<ChatStats, ApiError> {
        self.execute(self.http.get(self.endpoint(&["chat", "stats"])))
            .await
    }

    async fn add_text_document(
        &self,
        request: &TextDocumentRequest,
    ) -> Result<DocumentResponse, ApiError> {
        self.execute(
            self.http
                .post(self.endpoint(&["documents", "text"]))
                .json(request),
        )
        .await
    }

    async fn add_web_document(
        &self,
        request: &WebDocumentRequest,
    ) -> Result<DocumentResponse, ApiError> {
        self.execute(
            self.http
                .post(self.endpoint(&["documents", "web"]))
                .json(request),
        )
        .await
    }

    async fn get_documents(&self) -> Result<DocumentListResponse, ApiError> {
        self.execute(self.http.get(self.endpoint(&["documents", ""])))
            .await
    }

    async fn get_document(&self, doc_id: &str) -> Result<DocumentInfo, ApiError> {
        self.execute(self.http.get(self.endpoint(&["documents", doc_id])))
            .await
    }

    async fn delete_document(&self, doc_id: &str) -> Result<StatusResponse, ApiError> {
        self.execute(self.http.delete(self.endpoint(&["documents", doc_id])))
            .await
    }

    async fn get_vector_store_status(&self) -> Result<VectorStoreStatus, ApiError> {
        let url = self.endpoint(&["documents", "vectorstore", "status"]);
        self.execute(self.http.get(url)).await
    }

    async fn get_document_stats(&self) -> Result<DocumentStats, ApiError> {
        let url = self.endpoint(&["documents", "stats", "overview"]);
        self.execute(self.http.get(url)).await
    }

    async fn clear_vector_store(&self) -> Result<StatusResponse, ApiError> {
        let url = self.endpoint(&["documents", "vectorstore", "clear"]);
        self.execute(self.http.delete(url)).await
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
