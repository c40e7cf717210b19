use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::browser::backend::AutomationBackend;
use crate::browser::types::{ActionKind, ActionOutcome, ActionRequest, ObservedState};

/// Automation backend that records intents instead of driving a browser.
///
/// Every element action succeeds; navigation moves the synthetic page to the
/// requested URL and fails only when no destination was given.
pub struct DryRunBackend {
    page: Mutex<ObservedState>,
    recorded: Mutex<Vec<ActionRequest>>,
}

impl DryRunBackend {
    pub fn new() -> Self {
        Self {
            page: Mutex::new(ObservedState::blank("about:blank", "Blank Page")),
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// All requests received so far, in order.
    pub async fn recorded(&self) -> Vec<ActionRequest> {
        self.recorded.lock().await.clone()
    }
}

impl Default for DryRunBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomationBackend for DryRunBackend {
    async fn observe(&self) -> ObservedState {
        let mut page = self.page.lock().await;
        page.timestamp = chrono::Utc::now();
        page.clone()
    }

    async fn perform_action(&self, request: ActionRequest) -> ActionOutcome {
        tracing::debug!(
            kind = %request.kind,
            locator = %request.locator,
            value = ?request.value,
            timeout_ms = request.timeout.as_millis() as u64,
            "dry-run action"
        );
        self.recorded.lock().await.push(request.clone());

        if request.kind == ActionKind::Navigate {
            let Some(url) = request.value.filter(|v| !v.trim().is_empty()) else {
                return ActionOutcome::failed("Navigation missing destination URL");
            };
            let mut page = self.page.lock().await;
            *page = ObservedState::blank(url.clone(), url);
        }
        ActionOutcome::ok()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn request(kind: ActionKind, value: Option<&str>) -> ActionRequest {
        ActionRequest {
            locator: String::new(),
            kind,
            value: value.map(str::to_string),
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn navigate_without_destination_is_rejected() {
        let backend = DryRunBackend::new();
        let outcome = backend.perform_action(request(ActionKind::Navigate, None)).await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("Navigation missing destination URL")
        );
    }

    #[tokio::test]
    async fn navigate_updates_observed_url() {
        let backend = DryRunBackend::new();
        let outcome = backend
            .perform_action(request(ActionKind::Navigate, Some("https://shop.test/cart")))
            .await;
        assert!(outcome.success);
        assert_eq!(backend.observe().await.url, "https://shop.test/cart");
        assert_eq!(backend.recorded().await.len(), 1);
    }

    #[tokio::test]
    async fn element_actions_always_succeed() {
        let backend = DryRunBackend::new();
        let mut req = request(ActionKind::Click, None);
        req.locator = "text=Submit".into();
        assert!(backend.perform_action(req).await.success);
        assert_eq!(backend.observe().await.url, "about:blank");
    }
}
