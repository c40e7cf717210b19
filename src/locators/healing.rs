use std::collections::HashMap;

use crate::agent::types::ExecutionPlanStep;
use crate::locators::strategy::{LocatorCandidate, LocatorStrategy};

/// Remembers the last locator that worked for each (test id, step id).
///
/// Entries are overwritten on every success and never expire; callers merge
/// the cached entry with freshly planned candidates instead of trusting it alone.
#[derive(Debug, Default)]
pub struct SelfHealingLocator {
    strategy: LocatorStrategy,
    cache: HashMap<(String, String), LocatorCandidate>,
}

impl SelfHealingLocator {
    pub fn new(strategy: LocatorStrategy) -> Self {
        Self {
            strategy,
            cache: HashMap::new(),
        }
    }

    /// `[cached]` on a hit, otherwise the strategy's full candidate list.
    pub fn get_candidates(&self, test_id: &str, step: &ExecutionPlanStep) -> Vec<LocatorCandidate> {
        match self.cached(test_id, &step.id) {
            Some(hit) => {
                tracing::debug!(test = test_id, step = %step.id, locator = %hit.to_locator(), "locator cache hit");
                vec![hit.clone()]
            }
            None => self.strategy.build_candidate_locators(step),
        }
    }

    pub fn record_success(&mut self, test_id: &str, step: &ExecutionPlanStep, candidate: LocatorCandidate) {
        self.cache
            .insert((test_id.to_string(), step.id.clone()), candidate);
    }

    pub fn cached(&self, test_id: &str, step_id: &str) -> Option<&LocatorCandidate> {
        self.cache.get(&(test_id.to_string(), step_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
