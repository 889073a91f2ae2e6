//! Chat model trait used to synthesize answers.

use async_trait::async_trait;

use crate::error::Result;

/// A hosted chat model that turns a fully assembled prompt into an answer.
///
/// The query pipeline sends a single user message and expects the model's
/// text reply. No retry is attempted on failure.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send `prompt` as a single user message and return the reply text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier used in logs.
    fn name(&self) -> &str;
}
