//! Boundary to the language-model capability that performs the actual reasoning.
//!
//! Stages only know about [`EvaluationCapability`]: a prompt template plus variables go in,
//! free text comes out. The HTTP implementation lives in [`anthropic`]; tests substitute
//! deterministic fakes.

pub mod anthropic;

use std::collections::BTreeMap;

use async_trait::async_trait;

pub use anthropic::AnthropicCapability;

/// Variables substituted into `{name}` placeholders of a [`PromptTemplate`].
pub type PromptVariables = BTreeMap<String, String>;

/// Instruction sent to the capability: persona, task body and expected output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: String,
    pub system: String,
    pub body: String,
    pub expected_output: String,
}

impl PromptTemplate {
    /// Renders the task body with every known placeholder replaced.
    ///
    /// Unknown placeholders are left untouched so literal braces survive.
    pub fn render(&self, variables: &PromptVariables) -> String {
        let mut rendered = self.body.clone();
        for (key, value) in variables {
            rendered = rendered.replace(&format!("{{{key}}}"), value);
        }

        if self.expected_output.is_empty() {
            rendered
        } else {
            format!("{rendered}\n\nExpected output: {}", self.expected_output)
        }
    }
}

/// Opaque reasoning capability. Not guaranteed deterministic, may be slow, may fail.
#[async_trait]
pub trait EvaluationCapability: Send + Sync {
    async fn respond(
        &self,
        template: &PromptTemplate,
        variables: &PromptVariables,
    ) -> Result<String, CapabilityError>;
}

/// Failure raised by a capability call.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("capability returned an empty response")]
    EmptyResponse,
    #[error("capability unavailable: {0}")]
    Unavailable(String),
}
