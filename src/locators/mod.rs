//! Candidate locator derivation and the self-healing cache.

pub mod healing;
pub mod strategy;

pub use healing::SelfHealingLocator;
pub use strategy::{LocatorCandidate, LocatorStrategy};
