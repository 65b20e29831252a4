//! Pure transition function over [`GlobalState`].

use tracing::warn;

use crate::{action::Action, state::GlobalState};

/// Computes the snapshot that follows `state` once `action` is applied.
///
/// Total: every action yields a state, and actions that target something
/// absent leave the state as it was. `state` itself is never touched.
pub fn reduce(state: &GlobalState, action: Action) -> GlobalState {
    let mut next = state.clone();
    match action {
        Action::SetLoading { section, patch } => {
            let loading = next.loading_mut(section);
            *loading = loading.merged(&patch);
        }
        Action::SetApiInfo(info) => next.app.api_info = Some(info),
        Action::SetConnectionStatus(connected) => next.app.is_connected = connected,
        Action::SetConversations(conversations) => next.chat.conversations = conversations,
        Action::SetCurrentConversation(conversation_id) => {
            next.chat.current_conversation_id = conversation_id;
        }
        Action::SetMessages(messages) => next.chat.messages = messages,
        Action::AddMessage(message) => next.chat.messages.push(message),
        Action::SetTyping(typing) => next.chat.is_typing = typing,
        Action::SetDocuments(documents) => next.documents.documents = documents,
        Action::AddDocument(document) => {
            if next.documents.contains(&document.doc_id) {
                warn!(
                    doc_id = %document.doc_id,
                    "ignoring add for a document that is already listed"
                );
            } else {
                next.documents.documents.push(document);
            }
        }
        Action::RemoveDocument(doc_id) => {
            next.documents.documents.retain(|doc| doc.doc_id != doc_id);
        }
        Action::UpdateDocument(document) => {
            if let Some(slot) = next
                .documents
                .documents
                .iter_mut()
                .find(|doc| doc.doc_id == document.doc_id)
            {
                *slot = document;
            }
        }
        Action::SetVectorStoreStatus(status) => {
            next.documents.vector_store_status = Some(status);
        }
        Action::SetDocumentStats(stats) => next.documents.stats = Some(stats),
    }
    next
}

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod tests;
