//! Front/back display state of insight widgets.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipState {
    #[default]
    Front,
    Back,
}

impl FlipState {
    pub fn toggled(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

/// Shared handle to one widget's flip state.
///
/// Only user actions move it; fetch lifecycle changes never touch it.
#[derive(Debug, Clone, Default)]
pub struct FlipCard {
    state: Arc<Mutex<FlipState>>,
}

impl FlipCard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FlipState {
        *self.lock()
    }

    /// "View details".
    pub fn show_details(&self) -> FlipState {
        self.set(FlipState::Back)
    }

    /// "Back".
    pub fn show_front(&self) -> FlipState {
        self.set(FlipState::Front)
    }

    pub fn toggle(&self) -> FlipState {
        let mut guard = self.lock();
        *guard = guard.toggled();
        *guard
    }

    fn set(&self, next: FlipState) -> FlipState {
        *self.lock() = next;
        next
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FlipState> {
        self.state
            .lock()
            .expect("flip state lock should not be poisoned")
    }
}
