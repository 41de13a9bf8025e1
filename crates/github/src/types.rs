use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub html_url: String,
    pub default_branch: Option<String>,
}

impl Repository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct NewRepository {
    pub name: String,
    pub description: String,
    pub private: bool,
}

impl NewRepository {
    pub fn public(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            private: false,
        }
    }
}

// =============================================================================
// Contents
// =============================================================================

/// Optimistic-concurrency token (blob SHA) required to update an existing file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Current state of a file at a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub content: String,
    pub token: VersionToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    pub path: String,
    pub content: String,
    pub message: String,
    pub branch: String,
}

impl FileWrite {
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        message: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            message: message.into(),
            branch: branch.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub sha: String,
}

// =============================================================================
// Pages
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagesSource {
    pub branch: String,
    pub path: String,
}

impl PagesSource {
    pub fn root(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            path: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagesStatus {
    Enabled,
    AlreadyEnabled,
}

impl PagesStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PagesStatus::Enabled => "enabled",
            PagesStatus::AlreadyEnabled => "already_enabled",
        }
    }
}

/// Public URL of a repository's Pages site. Deterministic in owner and name.
pub fn pages_url(owner: &str, repo: &str) -> String {
    format!("https://{}.github.io/{}/", owner, repo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_url() {
        assert_eq!(
            pages_url("octo", "demo-app"),
            "https://octo.github.io/demo-app/"
        );
    }

    #[test]
    fn test_pages_status_labels() {
        assert_eq!(PagesStatus::Enabled.as_str(), "enabled");
        assert_eq!(PagesStatus::AlreadyEnabled.as_str(), "already_enabled");
    }

    #[test]
    fn test_repository_full_name() {
        let repo = Repository {
            owner: "octo".to_string(),
            name: "demo-app".to_string(),
            html_url: "https://github.com/octo/demo-app".to_string(),
            default_branch: Some("main".to_string()),
        };
        assert_eq!(repo.full_name(), "octo/demo-app");
    }

    #[test]
    fn test_version_token_is_transparent() {
        let token = VersionToken::new("abc123");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"abc123\"");
    }
}
