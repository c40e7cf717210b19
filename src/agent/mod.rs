pub mod executor;
pub mod journal;
pub mod login;
pub mod planner;
pub mod runner;
pub mod thinker;
pub mod types;

pub use executor::{ExecutorSettings, StepExecutor};
pub use login::{LoginDetector, OperatorPrompt, StdinPrompt};
pub use planner::TestPlanner;
pub use runner::{AgentRunner, RunOutcome};
pub use thinker::{ThinkContext, ThinkOutcome, Thinker};
pub use types::{ExecutionPlan, ExecutionPlanStep, PlannedAction, RunSummary, StepResult, StepStatus};
