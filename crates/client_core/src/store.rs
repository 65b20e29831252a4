use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::{action::Action, reducer::reduce, state::GlobalState};

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// A published snapshot together with its position in the publish order.
#[derive(Debug, Clone)]
pub struct StoreUpdate {
    pub revision: u64,
    pub state: Arc<GlobalState>,
}

/// Owner of the single current [`GlobalState`].
///
/// Mutation only happens through [`reduce`]; each batch of actions is
/// reduced and published under the watch channel's lock, so readers never
/// see a half-applied batch. Only this crate dispatches:
///
/// ```compile_fail
/// use client_core::{Action, Store};
/// Store::new().dispatch(Action::SetTyping(true));
/// ```
pub struct Store {
    state: watch::Sender<Arc<GlobalState>>,
    updates: broadcast::Sender<StoreUpdate>,
    revision: AtomicU64,
}

impl Store {
    pub fn new() -> Arc<Self> {
        Self::with_state(GlobalState::default())
    }

    pub fn with_state(initial: GlobalState) -> Arc<Self> {
        let (state, _) = watch::channel(Arc::new(initial));
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Arc::new(Self {
            state,
            updates,
            revision: AtomicU64::new(0),
        })
    }

    pub fn snapshot(&self) -> Arc<GlobalState> {
        self.state.borrow().clone()
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Latest-value view, for consumers that only render the newest state.
    pub fn watch(&self) -> watch::Receiver<Arc<GlobalState>> {
        self.state.subscribe()
    }

    /// Receives every publish, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.updates.subscribe()
    }

    pub(crate) fn dispatch(&self, action: Action) {
        self.dispatch_all(vec![action]);
    }

    /// Applies `actions` in order and publishes the result once.
    pub(crate) fn dispatch_all(&self, actions: Vec<Action>) {
        self.update(move |_| actions);
    }

    /// Plans a batch against the current snapshot and publishes it in the
    /// same critical section. An empty plan publishes nothing. `plan` must
    /// not call back into the store.
    pub(crate) fn update<F>(&self, plan: F) -> bool
    where
        F: FnOnce(&GlobalState) -> Vec<Action>,
    {
        self.state.send_if_modified(|current| {
            let actions = plan(&**current);
            if actions.is_empty() {
                return false;
            }

            let mut next: Option<GlobalState> = None;
            for action in actions {
                debug!(action = action.kind(), "dispatch");
                let base = next.as_ref().unwrap_or(&**current);
                next = Some(reduce(base, action));
            }
            let Some(next) = next else {
                return false;
            };

            let next = Arc::new(next);
            *current = next.clone();
            let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = self.updates.send(StoreUpdate {
                revision,
                state: next,
            });
            true
        })
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
