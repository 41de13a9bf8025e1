//! Content generation: turns a task brief (and optionally prior content) into
//! a self-contained HTML artifact using an OpenAI-compatible chat API.

pub mod error;
pub mod extract;
pub mod openrouter;
pub mod prompts;

use async_trait::async_trait;
use pagesmith_core::Attachment;

pub use error::{GeneratorError, GeneratorResult};
pub use extract::extract_html;
pub use openrouter::{ChatClient, LlmGenerator};

/// Input for one generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub brief: String,
    pub attachments: Vec<Attachment>,
    /// Current artifact content when revising
    pub existing: Option<String>,
}

impl GenerationRequest {
    pub fn initial(brief: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            brief: brief.into(),
            attachments,
            existing: None,
        }
    }

    pub fn revision(
        brief: impl Into<String>,
        attachments: Vec<Attachment>,
        existing: impl Into<String>,
    ) -> Self {
        Self {
            brief: brief.into(),
            attachments,
            existing: Some(existing.into()),
        }
    }

    pub fn is_revision(&self) -> bool {
        self.existing.is_some()
    }
}

/// Produces artifact text for a brief.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> GeneratorResult<String>;
}
