//! Uniform loading/error lifecycle for asynchronous work against one section.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    action::Action,
    error::ClientError,
    state::{GlobalState, LoadingPatch, Section},
    store::Store,
    ClientEvent,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Names a unit of work for logs and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub section: Section,
    pub notice: Option<&'static str>,
}

impl Operation {
    pub const fn new(name: &'static str, section: Section) -> Self {
        Self {
            name,
            section,
            notice: None,
        }
    }

    /// Message shown to the user when the operation succeeds.
    pub const fn with_notice(mut self, notice: &'static str) -> Self {
        self.notice = Some(notice);
        self
    }
}

/// Handle given to the work of one call.
///
/// Each call on a section gets the next sequence number for that section.
/// Once a newer call has started, this one is superseded: its guarded
/// dispatches are dropped and it no longer writes `loading`.
#[derive(Clone)]
pub struct CallScope {
    store: Arc<Store>,
    section: Section,
    sequence: u64,
    latest: Arc<AtomicU64>,
}

impl CallScope {
    pub fn section(&self) -> Section {
        self.section
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.sequence
    }

    pub fn snapshot(&self) -> Arc<GlobalState> {
        self.store.snapshot()
    }

    /// Publishes `action` only while this call is still the latest.
    pub(crate) fn dispatch(&self, action: Action) -> bool {
        self.dispatch_all(vec![action])
    }

    pub(crate) fn dispatch_all(&self, actions: Vec<Action>) -> bool {
        self.update(move |_| actions)
    }

    /// Guarded form of [`Store::update`].
    pub(crate) fn update<F>(&self, plan: F) -> bool
    where
        F: FnOnce(&GlobalState) -> Vec<Action>,
    {
        let published = self.store.update(|state| {
            if self.is_current() {
                plan(state)
            } else {
                Vec::new()
            }
        });
        if !published && !self.is_current() {
            debug!(
                section = self.section.as_str(),
                sequence = self.sequence,
                "dropping result of superseded call"
            );
        }
        published
    }

    /// Publishes regardless of supersession. Reserved for the consequences
    /// of a server-side mutation that already happened, which a newer read
    /// cannot make obsolete.
    pub(crate) fn commit<F>(&self, plan: F) -> bool
    where
        F: FnOnce(&GlobalState) -> Vec<Action>,
    {
        self.store.update(plan)
    }
}

/// Owned by [`ChatClient`](crate::ChatClient); not constructible outside
/// the crate.
///
/// ```compile_fail
/// use client_core::{orchestrator::Orchestrator, Store};
/// let _ = Orchestrator::new(Store::new());
/// ```
pub struct Orchestrator {
    store: Arc<Store>,
    sequences: [Arc<AtomicU64>; 3],
    events: broadcast::Sender<ClientEvent>,
}

impl Orchestrator {
    pub(crate) fn new(store: Arc<Store>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            sequences: Default::default(),
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    /// Latest sequence number issued for `section`.
    pub fn latest_sequence(&self, section: Section) -> u64 {
        self.sequences[section.index()].load(Ordering::SeqCst)
    }

    /// Runs `work` with `operation.section` marked loading.
    ///
    /// Loading is always cleared when the latest call finishes. A failure
    /// records its message in the section, is announced as
    /// [`ClientEvent::OperationFailed`] and is returned to the caller.
    /// Superseded calls leave `loading` to the newer call but are still
    /// announced and still return their result.
    pub async fn run_with_loading<T, F, Fut>(
        &self,
        operation: Operation,
        work: F,
    ) -> Result<T, ClientError>
    where
        F: FnOnce(CallScope) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let scope = self.begin(operation.section);
        debug!(
            operation = operation.name,
            section = operation.section.as_str(),
            sequence = scope.sequence,
            "operation started"
        );

        match work(scope.clone()).await {
            Ok(value) => {
                let section = operation.section;
                scope.dispatch(Action::SetLoading {
                    section,
                    patch: LoadingPatch::finished(),
                });
                self.emit(ClientEvent::OperationSucceeded {
                    section,
                    operation: operation.name,
                    notice: operation.notice,
                });
                Ok(value)
            }
            Err(err) => {
                let section = operation.section;
                let message = err.user_message();
                warn!(
                    operation = operation.name,
                    section = section.as_str(),
                    sequence = scope.sequence,
                    superseded = !scope.is_current(),
                    error = %message,
                    "operation failed"
                );
                scope.dispatch(Action::SetLoading {
                    section,
                    patch: LoadingPatch::failed(message.clone()),
                });
                self.emit(ClientEvent::OperationFailed {
                    section,
                    operation: operation.name,
                    error: message,
                });
                Err(err)
            }
        }
    }

    fn begin(&self, section: Section) -> CallScope {
        let latest = self.sequences[section.index()].clone();
        let mut sequence = 0;
        self.store.update(|_| {
            sequence = latest.fetch_add(1, Ordering::SeqCst) + 1;
            vec![Action::SetLoading {
                section,
                patch: LoadingPatch::started(),
            }]
        });
        CallScope {
            store: self.store.clone(),
            section,
            sequence,
            latest,
        }
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
