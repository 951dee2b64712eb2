//! Per-widget fetch lifecycle with newest-trigger-wins ordering.
//!
//! Every trigger calls [`FetchController::begin`], which bumps the controller
//! generation and moves the state to `Loading`. A resolution only commits when
//! its ticket carries the current generation; anything older is dropped. The
//! request itself is never aborted.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use crate::api::ApiError;
use crate::observability::{
    log_fetch_discarded, log_fetch_failed, log_fetch_started, log_fetch_succeeded,
};

#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Idle,
    Loading,
    Success(T),
    Error(ApiError),
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }
}

/// Proof that a fetch was started at a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

pub struct FetchController<T> {
    widget: &'static str,
    generation: Arc<Mutex<u64>>,
    state: Arc<watch::Sender<FetchState<T>>>,
}

impl<T> Clone for FetchController<T> {
    fn clone(&self) -> Self {
        Self {
            widget: self.widget,
            generation: Arc::clone(&self.generation),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> FetchController<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(widget: &'static str) -> Self {
        let (state, _) = watch::channel(FetchState::Idle);
        Self {
            widget,
            generation: Arc::new(Mutex::new(0)),
            state: Arc::new(state),
        }
    }

    pub fn widget(&self) -> &'static str {
        self.widget
    }

    pub fn state(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        *self.lock_generation()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state.subscribe()
    }

    /// Starts a new fetch cycle; any outstanding ticket becomes stale.
    pub fn begin(&self) -> FetchTicket {
        let mut generation = self.lock_generation();
        *generation += 1;
        self.state.send_replace(FetchState::Loading);

        log_fetch_started(self.widget, *generation);

        FetchTicket {
            generation: *generation,
        }
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.generation == *self.lock_generation()
    }

    /// Commits `result` if `ticket` is still current. Returns whether it committed.
    pub fn resolve(&self, ticket: FetchTicket, result: Result<T, ApiError>) -> bool {
        let generation = self.lock_generation();
        if ticket.generation != *generation {
            log_fetch_discarded(self.widget, ticket.generation, *generation);
            return false;
        }

        let next = match result {
            Ok(data) => {
                log_fetch_succeeded(self.widget, ticket.generation);
                FetchState::Success(data)
            }
            Err(err) => {
                log_fetch_failed(self.widget, ticket.generation, &err);
                FetchState::Error(err)
            }
        };
        self.state.send_replace(next);
        true
    }

    /// `begin` plus a spawned task that resolves with the future's output.
    pub fn spawn<F>(&self, fetch: F) -> JoinHandle<bool>
    where
        F: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let ticket = self.begin();
        let controller = self.clone();
        tokio::spawn(async move {
            let result = fetch.await;
            controller.resolve(ticket, result)
        })
    }

    /// Waits until the controller leaves `Loading` and returns that state.
    pub async fn settled(&self) -> FetchState<T> {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    fn lock_generation(&self) -> std::sync::MutexGuard<'_, u64> {
        self.generation
            .lock()
            .expect("fetch generation lock should not be poisoned")
    }
}
