use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::browser::ObservedState;
use crate::errors::QaResult;

/// Recognizes a sign-in form from the page DOM.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoginDetector;

impl LoginDetector {
    pub fn is_login_page(&self, state: &ObservedState) -> bool {
        let dom = state.dom_snapshot.to_lowercase();
        dom.contains("password") && dom.contains("sign in")
    }
}

/// Blocks until an operator confirms a manual step is done.
#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    async fn wait_for_confirmation(&self, message: &str) -> QaResult<()>;
}

/// Prints the message and waits for one line on stdin.
pub struct StdinPrompt;

#[async_trait]
impl OperatorPrompt for StdinPrompt {
    async fn wait_for_confirmation(&self, message: &str) -> QaResult<()> {
        println!("{message}");
        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        Ok(())
    }
}
