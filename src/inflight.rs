//! Cancellation tokens for in-flight requests.
//!
//! Each user action owns at most one in-flight request.  Starting a request
//! for an action cancels whatever that action still had outstanding, and a
//! [`CancelHandle`] lets other tasks (a Ctrl+C handler, a UI thread) cancel
//! requests without holding the controller.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

/// A user action that issues a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Bootstrap,
    Upload,
    AddDocument,
    NewSession,
    Chat,
    Clear,
    SetApiKey,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Bootstrap => "bootstrap",
            Action::Upload => "upload",
            Action::AddDocument => "add document",
            Action::NewSession => "new session",
            Action::Chat => "chat",
            Action::Clear => "clear",
            Action::SetApiKey => "set API key",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
struct Slots {
    generation: u64,
    tokens: HashMap<Action, (u64, CancellationToken)>,
}

/// A request registered with [`InFlight::begin`].
#[derive(Debug, Clone)]
pub struct Ticket {
    action: Action,
    generation: u64,
    token: CancellationToken,
}

impl Ticket {
    /// The action this request belongs to.
    pub fn action(&self) -> Action {
        self.action
    }

    /// The token that fires when the request is cancelled.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Registry of the cancellation tokens of in-flight requests.
#[derive(Clone, Default)]
pub struct InFlight {
    slots: Arc<Mutex<Slots>>,
}

impl InFlight {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        // The slots hold no invariants a panicking holder could break.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a new request for `action`, cancelling the previous one.
    pub fn begin(&self, action: Action) -> Ticket {
        let mut slots = self.lock();
        slots.generation += 1;
        let generation = slots.generation;
        let token = CancellationToken::new();
        if let Some((_, previous)) = slots.tokens.insert(action, (generation, token.clone())) {
            log::debug!("superseding in-flight {action} request");
            previous.cancel();
        }
        Ticket {
            action,
            generation,
            token,
        }
    }

    /// Removes the request's token unless a newer request replaced it.
    pub fn finish(&self, ticket: &Ticket) {
        let mut slots = self.lock();
        if let Some((generation, _)) = slots.tokens.get(&ticket.action)
            && *generation == ticket.generation
        {
            slots.tokens.remove(&ticket.action);
        }
    }

    /// Returns true if a request for `action` is outstanding.
    pub fn is_active(&self, action: Action) -> bool {
        self.lock().tokens.contains_key(&action)
    }

    /// A handle other tasks can use to cancel requests.
    pub fn handle(&self) -> CancelHandle {
        CancelHandle {
            inner: self.clone(),
        }
    }
}

/// Cancels in-flight requests from outside the controller.
#[derive(Clone)]
pub struct CancelHandle {
    inner: InFlight,
}

impl CancelHandle {
    /// Cancels the outstanding request for `action`; returns true if there was one.
    pub fn cancel(&self, action: Action) -> bool {
        match self.inner.lock().tokens.get(&action) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every outstanding request; returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let slots = self.inner.lock();
        for (_, token) in slots.tokens.values() {
            token.cancel();
        }
        slots.tokens.len()
    }
}
