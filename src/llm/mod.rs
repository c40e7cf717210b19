pub mod provider;
pub mod providers;
pub mod registry;
pub mod response;
pub mod sse_parser;
pub mod types;

pub use provider::{LlmProvider, ReasoningBackend, RoleBackend, UnconfiguredBackend};
pub use registry::{ProviderRegistry, Role};
pub use response::{salvage_object, FallbackReason, Salvaged};
