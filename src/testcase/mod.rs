pub mod parser;

pub use parser::{ParsedTest, ParsedTestStep, TestParser};
