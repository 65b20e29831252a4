//! Closed vocabulary of state changes accepted by the store.

use shared::domain::{
    ApiInfo, ChatMessage, ConversationHistory, DocumentInfo, DocumentStats, VectorStoreStatus,
};

use crate::state::{LoadingPatch, Section};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetLoading {
        section: Section,
        patch: LoadingPatch,
    },
    SetApiInfo(ApiInfo),
    SetConnectionStatus(bool),
    SetConversations(Vec<ConversationHistory>),
    SetCurrentConversation(Option<String>),
    SetMessages(Vec<ChatMessage>),
    AddMessage(ChatMessage),
    SetTyping(bool),
    SetDocuments(Vec<DocumentInfo>),
    AddDocument(DocumentInfo),
    RemoveDocument(String),
    UpdateDocument(DocumentInfo),
    SetVectorStoreStatus(VectorStoreStatus),
    SetDocumentStats(DocumentStats),
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::SetLoading { .. } => "set_loading",
            Action::SetApiInfo(_) => "set_api_info",
            Action::SetConnectionStatus(_) => "set_connection_status",
            Action::SetConversations(_) => "set_conversations",
            Action::SetCurrentConversation(_) => "set_current_conversation",
            Action::SetMessages(_) => "set_messages",
            Action::AddMessage(_) => "add_message",
            Action::SetTyping(_) => "set_typing",
            Action::SetDocuments(_) => "set_documents",
            Action::AddDocument(_) => "add_document",
            Action::RemoveDocument(_) => "remove_document",
            Action::UpdateDocument(_) => "update_document",
            Action::SetVectorStoreStatus(_) => "set_vector_store_status",
            Action::SetDocumentStats(_) => "set_document_stats",
        }
    }
}
