pub mod failure;

pub use failure::{FailureAnalysis, FailureAnalyzer, RootCause, HEURISTIC_CONFIDENCE};
