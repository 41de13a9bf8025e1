use generator::GeneratorError;
use github::GitHubError;
use pagesmith_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Generation failed: {0}")]
    Generation(#[from] GeneratorError),

    #[error("Publication failed: {0}")]
    Publication(#[from] GitHubError),

    #[error("Prior content missing: {repo}/{path} not found on branch {branch}")]
    MissingPriorContent {
        repo: String,
        path: String,
        branch: String,
    },

    #[error("Store returned an empty commit identifier for {path}")]
    EmptyCommit { path: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] CoreError),
}

impl OrchestratorError {
    /// Whether the remote store rejected a stale version token.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            OrchestratorError::Publication(GitHubError::Conflict { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
