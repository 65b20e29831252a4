use serde::Serialize;
use shared::domain::{
    ApiInfo, ChatMessage, ConversationHistory, DocumentInfo, DocumentStats, VectorStoreStatus,
};

/// One of the three independently loadable resource groups of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    App,
    Chat,
    Documents,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::App, Section::Chat, Section::Documents];

    pub(crate) fn index(self) -> usize {
        match self {
            Section::App => 0,
            Section::Chat => 1,
            Section::Documents => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Section::App => "app",
            Section::Chat => "chat",
            Section::Documents => "documents",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadingState {
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Partial update merged into a section's [`LoadingState`].
///
/// `error: Some(None)` clears the error, `error: None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingPatch {
    pub is_loading: Option<bool>,
    pub error: Option<Option<String>>,
}

impl LoadingPatch {
    pub fn started() -> Self {
        Self {
            is_loading: Some(true),
            error: Some(None),
        }
    }

    pub fn finished() -> Self {
        Self {
            is_loading: Some(false),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            is_loading: Some(false),
            error: Some(Some(message.into())),
        }
    }
}

impl LoadingState {
    /// Applies `patch`. A state that ends up loading never keeps an error.
    pub fn merged(&self, patch: &LoadingPatch) -> Self {
        let is_loading = patch.is_loading.unwrap_or(self.is_loading);
        let error = match &patch.error {
            Some(error) => error.clone(),
            None => self.error.clone(),
        };
        Self {
            is_loading,
            error: if is_loading { None } else { error },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppState {
    pub is_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_info: Option<ApiInfo>,
    pub loading: LoadingState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_conversation_id: Option<String>,
    pub conversations: Vec<ConversationHistory>,
    pub messages: Vec<ChatMessage>,
    pub is_typing: bool,
    pub loading: LoadingState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentsState {
    pub documents: Vec<DocumentInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_store_status: Option<VectorStoreStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<DocumentStats>,
    pub loading: LoadingState,
}

impl DocumentsState {
    pub fn contains(&self, doc_id: &str) -> bool {
        self.documents.iter().any(|doc| doc.doc_id == doc_id)
    }
}

/// Root snapshot. Snapshots are never mutated after publication.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalState {
    pub app: AppState,
    pub chat: ChatState,
    pub documents: DocumentsState,
}

impl GlobalState {
    pub fn loading(&self, section: Section) -> &LoadingState {
        match section {
            Section::App => &self.app.loading,
            Section::Chat => &self.chat.loading,
            Section::Documents => &self.documents.loading,
        }
    }

    pub(crate) fn loading_mut(&mut self, section: Section) -> &mut LoadingState {
        match section {
            Section::App => &mut self.app.loading,
            Section::Chat => &mut self.chat.loading,
            Section::Documents => &mut self.documents.loading,
        }
    }
}
