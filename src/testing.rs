//! Scripted backends shared by unit tests.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::agent::types::ExecutionPlanStep;
use crate::browser::{ActionOutcome, ActionRequest, AutomationBackend, ObservedState};
use crate::errors::{QaError, QaResult};
use crate::llm::ReasoningBackend;

pub fn plan_step(id: &str, label: &str, description: &str) -> ExecutionPlanStep {
    ExecutionPlanStep {
        id: id.into(),
        label: label.into(),
        description: description.into(),
        expected_outcome: None,
        assertion_hooks: Vec::new(),
        possible_locators: Vec::new(),
    }
}

/// Replies from a queue; once drained, repeats the last reply.
pub struct ScriptedReasoner {
    replies: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedReasoner {
    pub fn replying(reply: Result<&str, &str>) -> Self {
        Self::sequence(vec![reply])
    }

    pub fn sequence(replies: Vec<Result<&str, &str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningBackend for ScriptedReasoner {
    async fn complete(&self, prompt: &str) -> QaResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        let reply = match next {
            Some(reply) => {
                *self.last.lock().unwrap() = Some(reply.clone());
                reply
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err("no scripted reply".into())),
        };
        reply.map_err(QaError::LlmProvider)
    }
}

/// Automation backend whose action outcomes are scripted in order; unscripted actions succeed.
pub struct ScriptedBackend {
    state: ObservedState,
    outcomes: Mutex<VecDeque<ActionOutcome>>,
    requests: Mutex<Vec<ActionRequest>>,
    observations: Mutex<usize>,
    screenshots: bool,
}

impl ScriptedBackend {
    pub fn new(outcomes: Vec<ActionOutcome>) -> Self {
        Self::with_state(ObservedState::blank("https://app.test/", "App"), outcomes)
    }

    pub fn with_state(state: ObservedState, outcomes: Vec<ActionOutcome>) -> Self {
        Self {
            state,
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
            observations: Mutex::new(0),
            screenshots: false,
        }
    }

    pub fn failing(message: &str, times: usize) -> Self {
        Self::new(vec![ActionOutcome::failed(message); times])
    }

    pub fn with_screenshots(mut self) -> Self {
        self.screenshots = true;
        self
    }

    pub fn requests(&self) -> Vec<ActionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn observations(&self) -> usize {
        *self.observations.lock().unwrap()
    }
}

#[async_trait]
impl AutomationBackend for ScriptedBackend {
    async fn observe(&self) -> ObservedState {
        *self.observations.lock().unwrap() += 1;
        self.state.clone()
    }

    async fn perform_action(&self, request: ActionRequest) -> ActionOutcome {
        self.requests.lock().unwrap().push(request);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(ActionOutcome::ok)
    }

    async fn capture_screenshot(&self, name: &str) -> QaResult<Option<PathBuf>> {
        Ok(self.screenshots.then(|| PathBuf::from(format!("{name}.png"))))
    }
}
