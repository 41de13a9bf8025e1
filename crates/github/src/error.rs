use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Repository not found: {owner}/{repo}")]
    RepoNotFound { owner: String, repo: String },

    #[error("Repository already exists: {owner}/{repo}")]
    RepoAlreadyExists { owner: String, repo: String },

    #[error("File already exists: {repo}/{path}")]
    FileAlreadyExists { repo: String, path: String },

    #[error("Version conflict writing {repo}/{path}: {message}")]
    Conflict {
        repo: String,
        path: String,
        message: String,
    },

    #[error("Rate limit exceeded, resets at {reset_at}")]
    RateLimitExceeded { reset_at: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl GitHubError {
    /// HTTP status reported by the API, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::Api { status, .. } => Some(*status),
            GitHubError::RepoNotFound { .. } => Some(404),
            GitHubError::RepoAlreadyExists { .. } | GitHubError::FileAlreadyExists { .. } => {
                Some(422)
            }
            GitHubError::Conflict { .. } => Some(409),
            _ => None,
        }
    }
}

impl From<octocrab::Error> for GitHubError {
    fn from(err: octocrab::Error) -> Self {
        match &err {
            octocrab::Error::GitHub { source, .. } => {
                let status = source.status_code.as_u16();
                if status == 401 {
                    GitHubError::Authentication(source.message.clone())
                } else if source.message.contains("rate limit") {
                    GitHubError::RateLimitExceeded {
                        reset_at: "unknown".to_string(),
                    }
                } else {
                    GitHubError::Api {
                        status,
                        message: source.message.clone(),
                    }
                }
            }
            octocrab::Error::Serde { .. } | octocrab::Error::Json { .. } => {
                GitHubError::Decode(err.to_string())
            }
            _ => GitHubError::Network(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;
