use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::info;
use quiz_core::model::ViewerContext;

use crate::error::QuizFlowError;

/// Holds the signed-in viewer for the lifetime of the app.
///
/// Cloned handles share the same state.
#[derive(Clone, Default)]
pub struct AuthContext {
    viewer: Arc<Mutex<Option<ViewerContext>>>,
}

impl AuthContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, viewer: ViewerContext) {
        info!("signed in as {} ({})", viewer.user_id(), viewer.role());
        *self.slot() = Some(viewer);
    }

    /// Clears the viewer and returns who was signed in.
    pub fn sign_out(&self) -> Option<ViewerContext> {
        let previous = self.slot().take();
        if let Some(viewer) = &previous {
            info!("signed out {}", viewer.user_id());
        }
        previous
    }

    /// # Errors
    ///
    /// Returns `QuizFlowError::SignedOut` when nobody is signed in.
    pub fn current(&self) -> Result<ViewerContext, QuizFlowError> {
        self.slot().clone().ok_or(QuizFlowError::SignedOut)
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.current().is_ok()
    }

    // A panic elsewhere cannot leave the slot half-written, so poison is ignored.
    fn slot(&self) -> MutexGuard<'_, Option<ViewerContext>> {
        self.viewer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
