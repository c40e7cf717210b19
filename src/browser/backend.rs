use std::path::PathBuf;

use async_trait::async_trait;

use crate::browser::types::{ActionOutcome, ActionRequest, ObservedState};
use crate::errors::QaResult;

/// Capability interface to the browser-automation backend.
///
/// Both calls may suspend but always settle: a failed action is reported
/// through [`ActionOutcome`], never by hanging. A navigate request without a
/// destination must be rejected with a descriptive error.
#[async_trait]
pub trait AutomationBackend: Send + Sync {
    async fn observe(&self) -> ObservedState;

    async fn perform_action(&self, request: ActionRequest) -> ActionOutcome;

    /// Capture a screenshot named after the step. Backends without capture support return `None`.
    async fn capture_screenshot(&self, _name: &str) -> QaResult<Option<PathBuf>> {
        Ok(None)
    }
}
