//! Domain action set: user-intent operations composed from gateway calls
//! and store transitions.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::{
    domain::{ChatMessage, ChatStats, Metadata, VectorStoreStatus},
    protocol::{ChatRequest, ChatResponse, DocumentResponse, TextDocumentRequest, WebDocumentRequest},
};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};
use url::Url;

use crate::{
    action::Action,
    error::ClientError,
    gateway::ApiGateway,
    orchestrator::{CallScope, Operation, Orchestrator},
    state::{GlobalState, Section},
    store::{Store, StoreUpdate},
    ClientEvent,
};

/// Longest chat message the backend accepts.
pub const MAX_CHAT_MESSAGE_CHARS: usize = 2000;

const FETCH_API_INFO: Operation = Operation::new("fetch_api_info", Section::App);
const SEND_MESSAGE: Operation = Operation::new("send_message", Section::Chat);
const FETCH_CONVERSATIONS: Operation = Operation::new("fetch_conversations", Section::Chat);
const LOAD_CONVERSATION: Operation = Operation::new("load_conversation", Section::Chat);
const DELETE_CONVERSATION: Operation = Operation::new("delete_conversation", Section::Chat)
    .with_notice("Conversation deleted");
const CLEAR_CONVERSATIONS: Operation = Operation::new("clear_all_conversations", Section::Chat)
    .with_notice("All conversations cleared");
const FETCH_CHAT_STATS: Operation = Operation::new("fetch_chat_stats", Section::Chat);
const FETCH_DOCUMENTS: Operation = Operation::new("fetch_documents", Section::Documents);
const REFRESH_DOCUMENT: Operation = Operation::new("refresh_document", Section::Documents);
const ADD_TEXT_DOCUMENT: Operation = Operation::new("add_text_document", Section::Documents)
    .with_notice("Document added successfully");
const ADD_WEB_DOCUMENT: Operation = Operation::new("add_web_document", Section::Documents)
    .with_notice("Web document added successfully");
const DELETE_DOCUMENT: Operation =
    Operation::new("delete_document", Section::Documents).with_notice("Document deleted");
const FETCH_VECTOR_STORE_STATUS: Operation =
    Operation::new("fetch_vector_store_status", Section::Documents);
const FETCH_DOCUMENT_STATS: Operation = Operation::new("fetch_document_stats", Section::Documents);
const CLEAR_VECTOR_STORE: Operation =
    Operation::new("clear_vector_store", Section::Documents).with_notice("Vector store cleared");

/// Entry point for presentation code: read snapshots, invoke operations.
///
/// Constructed once per process around an explicit [`Store`]; nothing here
/// is global, so tests build as many independent clients as they need.
pub struct ChatClient {
    store: Arc<Store>,
    gateway: Arc<dyn ApiGateway>,
    orchestrator: Orchestrator,
    /// Ticket of the most recently started send; only it may settle the
    /// typing flag and the selection.
    latest_send: AtomicU64,
}

impl ChatClient {
    pub fn new(store: Arc<Store>, gateway: Arc<dyn ApiGateway>) -> Self {
        Self {
            orchestrator: Orchestrator::new(store.clone()),
            store,
            gateway,
            latest_send: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Arc<GlobalState> {
        self.store.snapshot()
    }

    pub fn watch_state(&self) -> watch::Receiver<Arc<GlobalState>> {
        self.store.watch()
    }

    pub fn subscribe_state(&self) -> broadcast::Receiver<StoreUpdate> {
        self.store.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.orchestrator.subscribe_events()
    }

    /// Start-up sequence: connectivity, service info, corpus and its status.
    /// Every step runs even if an earlier one failed; the first failure is
    /// returned.
    pub async fn initialize(&self) -> Result<(), ClientError> {
        let connected = self.check_connection().await;
        info!(connected, "initializing client state");

        let results = [
            self.fetch_api_info().await,
            self.fetch_documents().await,
            self.fetch_vector_store_status().await,
        ];
        results.into_iter().collect()
    }

    /// Probes the health endpoint. Failure is not an error here: it only
    /// flips `app.is_connected`.
    pub async fn check_connection(&self) -> bool {
        let connected = match self.gateway.get_health().await {
            Ok(health) => {
                info!(status = %health.status, version = %health.version, "backend reachable");
                true
            }
            Err(err) => {
                warn!(error = %err, "health check failed");
                false
            }
        };
        self.store.dispatch(Action::SetConnectionStatus(connected));
        self.orchestrator
            .emit(ClientEvent::ConnectionChanged { connected });
        connected
    }

    pub async fn fetch_api_info(&self) -> Result<(), ClientError> {
        self.orchestrator
            .run_with_loading(FETCH_API_INFO, |scope| async move {
                let info = self.gateway.get_api_info().await?;
                scope.dispatch(Action::SetApiInfo(info));
                Ok(())
            })
            .await
    }

    /// Sends `content` in the current conversation (a new one when none is
    /// selected).
    ///
    /// The user message is appended before the request goes out. The reply
    /// is appended whenever it arrives. The most recent send clears the
    /// typing flag whether it succeeds or fails, and on success selects the
    /// conversation the server answered in. Other chat calls running at the
    /// same time do not affect either.
    pub async fn send_message(&self, content: &str) -> Result<ChatResponse, ClientError> {
        validate_chat_message(content)?;

        let ticket = self.latest_send.fetch_add(1, Ordering::SeqCst) + 1;
        let conversation_id = self.store.snapshot().chat.current_conversation_id.clone();
        self.store
            .dispatch(Action::AddMessage(ChatMessage::user(content)));
        self.store.dispatch(Action::SetTyping(true));

        let request = ChatRequest {
            message: content.to_string(),
            conversation_id,
            include_sources: true,
        };

        self.orchestrator
            .run_with_loading(SEND_MESSAGE, |scope| async move {
                let response = match self.gateway.send_message(&request).await {
                    Ok(response) => response,
                    Err(err) => {
                        scope.commit(|_| {
                            if self.is_latest_send(ticket) {
                                vec![Action::SetTyping(false)]
                            } else {
                                Vec::new()
                            }
                        });
                        return Err(err.into());
                    }
                };

                let reply =
                    ChatMessage::assistant(response.message.clone(), Some(response.timestamp.clone()));
                scope.commit(|_| {
                    let mut actions = vec![Action::AddMessage(reply)];
                    if self.is_latest_send(ticket) {
                        actions.push(Action::SetCurrentConversation(Some(
                            response.conversation_id.clone(),
                        )));
                        actions.push(Action::SetTyping(false));
                    }
                    actions
                });
                info!(
                    conversation_id = %response.conversation_id,
                    sources = response.sources.as_ref().map_or(0, Vec::len),
                    "assistant replied"
                );
                Ok(response)
            })
            .await
    }

    pub async fn fetch_conversations(&self) -> Result<(), ClientError> {
        self.orchestrator
            .run_with_loading(FETCH_CONVERSATIONS, |scope| async move {
                let conversations = self.gateway.get_conversations().await?;
                scope.dispatch(Action::SetConversations(conversations));
                Ok(())
            })
            .await
    }

    /// Switches to `conversation_id`, replacing the visible messages.
    pub async fn load_conversation(&self, conversation_id: &str) -> Result<(), ClientError> {
        self.orchestrator
            .run_with_loading(LOAD_CONVERSATION, |scope| async move {
                let conversation = self.gateway.get_conversation(conversation_id).await?;
                scope.dispatch_all(vec![
                    Action::SetMessages(conversation.messages),
                    Action::SetCurrentConversation(Some(conversation_id.to_string())),
                ]);
                Ok(())
            })
            .await
    }

    /// Deletes a conversation. If it was selected, the selection and its
    /// messages go away in the same publish as the removal.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ClientError> {
        self.orchestrator
            .run_with_loading(DELETE_CONVERSATION, |scope| async move {
                self.gateway.delete_conversation(conversation_id).await?;
                scope.commit(|state| {
                    let remaining = state
                        .chat
                        .conversations
                        .iter()
                        .filter(|c| c.conversation_id != conversation_id)
                        .cloned()
                        .collect();
                    let mut actions = vec![Action::SetConversations(remaining)];
                    if state.chat.current_conversation_id.as_deref() == Some(conversation_id) {
                        actions.push(Action::SetCurrentConversation(None));
                        actions.push(Action::SetMessages(Vec::new()));
                    }
                    actions
                });

                self.reload_conversations(&scope).await
            })
            .await
    }

    pub async fn clear_all_conversations(&self) -> Result<(), ClientError> {
        self.orchestrator
            .run_with_loading(CLEAR_CONVERSATIONS, |scope| async move {
                self.gateway.clear_conversations().await?;
                scope.commit(|_| {
                    vec![
                        Action::SetConversations(Vec::new()),
                        Action::SetCurrentConversation(None),
                        Action::SetMessages(Vec::new()),
                    ]
                });
                self.reload_conversations(&scope).await
            })
            .await
    }

    /// Drops the selection so the next message opens a new conversation.
    pub fn start_new_conversation(&self) {
        self.store.dispatch_all(vec![
            Action::SetCurrentConversation(None),
            Action::SetMessages(Vec::new()),
        ]);
    }

    /// Read-through: chat statistics are not kept in the store.
    pub async fn fetch_chat_stats(&self) -> Result<ChatStats, ClientError> {
        self.orchestrator
            .run_with_loading(FETCH_CHAT_STATS, |_scope| async move {
                Ok(self.gateway.get_chat_stats().await?)
            })
            .await
    }

    pub async fn fetch_documents(&self) -> Result<(), ClientError> {
        self.orchestrator
            .run_with_loading(FETCH_DOCUMENTS, |scope| async move {
                let listing = self.gateway.get_documents().await?;
                scope.dispatch(Action::SetDocuments(listing.documents));
                Ok(())
            })
            .await
    }

    /// Re-reads one document, e.g. to pick up a pending -> completed change.
    pub async fn refresh_document(&self, doc_id: &str) -> Result<(), ClientError> {
        self.orchestrator
            .run_with_loading(REFRESH_DOCUMENT, |scope| async move {
                let document = self.gateway.get_document(doc_id).await?;
                scope.update(|state| {
                    if state.documents.contains(&document.doc_id) {
                        vec![Action::UpdateDocument(document)]
                    } else {
                        vec![Action::AddDocument(document)]
                    }
                });
                Ok(())
            })
            .await
    }

    pub async fn add_text_document(
        &self,
        content: &str,
        title: Option<String>,
        metadata: Option<Metadata>,
    ) -> Result<DocumentResponse, ClientError> {
        if content.trim().is_empty() {
            return Err(ClientError::Validation(
                "document content must not be empty".into(),
            ));
        }
        let request = TextDocumentRequest {
            content: content.to_string(),
            title,
            metadata,
        };

        self.orchestrator
            .run_with_loading(ADD_TEXT_DOCUMENT, |scope| async move {
                let created = self.gateway.add_text_document(&request).await?;
                info!(doc_id = %created.doc_id, status = ?created.status, "text document added");
                self.reload_corpus(&scope).await?;
                Ok(created)
            })
            .await
    }

    pub async fn add_web_document(
        &self,
        url: &str,
        title: Option<String>,
        metadata: Option<Metadata>,
    ) -> Result<DocumentResponse, ClientError> {
        let url = validate_web_url(url)?;
        let request = WebDocumentRequest {
            url: url.to_string(),
            title,
            metadata,
        };

        self.orchestrator
            .run_with_loading(ADD_WEB_DOCUMENT, |scope| async move {
                let created = self.gateway.add_web_document(&request).await?;
                info!(doc_id = %created.doc_id, url = %request.url, "web document added");
                self.reload_corpus(&scope).await?;
                Ok(created)
            })
            .await
    }

    pub async fn delete_document(&self, doc_id: &str) -> Result<(), ClientError> {
        self.orchestrator
            .run_with_loading(DELETE_DOCUMENT, |scope| async move {
                self.gateway.delete_document(doc_id).await?;
                scope.commit(|_| vec![Action::RemoveDocument(doc_id.to_string())]);
                self.reload_corpus(&scope).await
            })
            .await
    }

    pub async fn fetch_vector_store_status(&self) -> Result<(), ClientError> {
        self.orchestrator
            .run_with_loading(FETCH_VECTOR_STORE_STATUS, |scope| async move {
                let status = self.gateway.get_vector_store_status().await?;
                scope.dispatch(Action::SetVectorStoreStatus(status));
                Ok(())
            })
            .await
    }

    pub async fn fetch_document_stats(&self) -> Result<(), ClientError> {
        self.orchestrator
            .run_with_loading(FETCH_DOCUMENT_STATS, |scope| async move {
                let stats = self.gateway.get_document_stats().await?;
                scope.dispatch(Action::SetDocumentStats(stats));
                Ok(())
            })
            .await
    }

    /// Empties the corpus. The list and the aggregate are zeroed together,
    /// then the aggregate is re-read from the server.
    pub async fn clear_vector_store(&self) -> Result<(), ClientError> {
        self.orchestrator
            .run_with_loading(CLEAR_VECTOR_STORE, |scope| async move {
                self.gateway.clear_vector_store().await?;
                scope.commit(|_| {
                    vec![
                        Action::SetDocuments(Vec::new()),
                        Action::SetVectorStoreStatus(VectorStoreStatus::empty()),
                    ]
                });
                self.reload_vector_store_status(&scope).await
            })
            .await
    }

    fn is_latest_send(&self, ticket: u64) -> bool {
        self.latest_send.load(Ordering::SeqCst) == ticket
    }

    // reload_* run after a completed server mutation and publish unguarded.

    async fn reload_conversations(&self, scope: &CallScope) -> Result<(), ClientError> {
        let conversations = self.gateway.get_conversations().await?;
        scope.commit(|_| vec![Action::SetConversations(conversations)]);
        Ok(())
    }

    async fn reload_documents(&self, scope: &CallScope) -> Result<(), ClientError> {
        let listing = self.gateway.get_documents().await?;
        scope.commit(|_| vec![Action::SetDocuments(listing.documents)]);
        Ok(())
    }

    async fn reload_vector_store_status(&self, scope: &CallScope) -> Result<(), ClientError> {
        let status = self.gateway.get_vector_store_status().await?;
        scope.commit(|_| vec![Action::SetVectorStoreStatus(status)]);
        Ok(())
    }

    /// After a corpus mutation: authoritative list first, then aggregate.
    async fn reload_corpus(&self, scope: &CallScope) -> Result<(), ClientError> {
        self.reload_documents(scope).await?;
        self.reload_vector_store_status(scope).await
    }
}

fn validate_chat_message(content: &str) -> Result<(), ClientError> {
    if content.trim().is_empty() {
        return Err(ClientError::Validation("message must not be empty".into()));
    }
    let length = content.chars().count();
    if length > MAX_CHAT_MESSAGE_CHARS {
        return Err(ClientError::Validation(format!(
            "message is {length} characters long; the limit is {MAX_CHAT_MESSAGE_CHARS}"
        )));
    }
    Ok(())
}

fn validate_web_url(raw: &str) -> Result<Url, ClientError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ClientError::Validation("url must not be empty".into()));
    }
    let url = Url::parse(raw)
        .map_err(|err| ClientError::Validation(format!("invalid url '{raw}': {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ClientError::Validation(format!(
            "unsupported url scheme '{scheme}'; expected http or https"
        ))),
    }
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
