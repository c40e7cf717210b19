pub mod backend;
pub mod dry_run;
pub mod types;

pub use backend::AutomationBackend;
pub use dry_run::DryRunBackend;
pub use types::{ActionKind, ActionOutcome, ActionRequest, ConsoleLevel, ConsoleLogEntry, NetworkEvent, ObservedState};
