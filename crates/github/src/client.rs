use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GitHubError, Result};
use crate::store::{ContentStore, PagesApi};
use crate::types::{
    pages_url, CommitRef, FileWrite, NewRepository, PagesSource, PagesStatus, RemoteFile,
    Repository, VersionToken,
};

pub struct GitHubClient {
    octocrab: Octocrab,
    owner: String,
}

impl GitHubClient {
    pub fn new(token: &str, owner: impl Into<String>) -> Result<Self> {
        let octocrab = Octocrab::builder()
            .personal_token(token.to_string())
            .build()
            .map_err(|e| GitHubError::Config(e.to_string()))?;

        Ok(Self {
            octocrab,
            owner: owner.into(),
        })
    }

    /// Client against a non-default API root, e.g. GitHub Enterprise or a test server.
    pub fn with_base_uri(token: &str, owner: impl Into<String>, base_uri: &str) -> Result<Self> {
        let octocrab = Octocrab::builder()
            .base_uri(base_uri.to_string())
            .map_err(|e| GitHubError::Config(e.to_string()))?
            .personal_token(token.to_string())
            .build()
            .map_err(|e| GitHubError::Config(e.to_string()))?;

        Ok(Self {
            octocrab,
            owner: owner.into(),
        })
    }

    fn contents_route(&self, repo: &str, path: &str) -> String {
        format!("/repos/{}/{}/contents/{}", self.owner, repo, path)
    }

    async fn put_file(&self, repo: &str, body: &PutFileBody<'_>) -> Result<CommitRef> {
        let response: FileCommitResponse = self
            .octocrab
            .put(self.contents_route(repo, body.path), Some(body))
            .await
            .map_err(|e| match GitHubError::from(e) {
                GitHubError::Api { status: 409, message } => GitHubError::Conflict {
                    repo: repo.to_string(),
                    path: body.path.to_string(),
                    message,
                },
                GitHubError::Api { status: 422, .. } if body.sha.is_none() => {
                    GitHubError::FileAlreadyExists {
                        repo: repo.to_string(),
                        path: body.path.to_string(),
                    }
                }
                GitHubError::Api { status: 404, .. } => GitHubError::RepoNotFound {
                    owner: self.owner.clone(),
                    repo: repo.to_string(),
                },
                other => other,
            })?;

        Ok(CommitRef {
            sha: response.commit.sha,
        })
    }
}

#[async_trait]
impl ContentStore for GitHubClient {
    fn owner(&self) -> &str {
        &self.owner
    }

    async fn create_repository(&self, request: &NewRepository) -> Result<Repository> {
        info!(repo = %request.name, private = request.private, "Creating repository");

        let body = CreateRepositoryBody {
            name: &request.name,
            description: &request.description,
            private: request.private,
            auto_init: false,
        };

        let response: RepositoryResponse = self
            .octocrab
            .post("/user/repos", Some(&body))
            .await
            .map_err(|e| match GitHubError::from(e) {
                GitHubError::Api { status: 422, .. } => GitHubError::RepoAlreadyExists {
                    owner: self.owner.clone(),
                    repo: request.name.clone(),
                },
                other => other,
            })?;

        Ok(response.into())
    }

    async fn get_repository(&self, name: &str) -> Result<Repository> {
        debug!(repo = %name, "Getting repository");

        let response: RepositoryResponse = self
            .octocrab
            .get(format!("/repos/{}/{}", self.owner, name), None::<&()>)
            .await
            .map_err(|e| match GitHubError::from(e) {
                GitHubError::Api { status: 404, .. } => GitHubError::RepoNotFound {
                    owner: self.owner.clone(),
                    repo: name.to_string(),
                },
                other => other,
            })?;

        Ok(response.into())
    }

    async fn get_file(&self, repo: &str, path: &str, branch: &str) -> Result<Option<RemoteFile>> {
        debug!(repo = %repo, path = %path, branch = %branch, "Getting file contents");

        let result: std::result::Result<ContentResponse, octocrab::Error> = self
            .octocrab
            .get(self.contents_route(repo, path), Some(&[("ref", branch)]))
            .await;

        let response = match result.map_err(GitHubError::from) {
            Ok(response) => response,
            Err(GitHubError::Api { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let content = decode_content(response.content.as_deref().unwrap_or_default())?;

        Ok(Some(RemoteFile {
            path: response.path,
            content,
            token: VersionToken::new(response.sha),
        }))
    }

    async fn create_file(&self, repo: &str, write: &FileWrite) -> Result<CommitRef> {
        info!(repo = %repo, path = %write.path, "Creating file");

        let body = PutFileBody::new(write, None);
        self.put_file(repo, &body).await
    }

    async fn update_file(
        &self,
        repo: &str,
        write: &FileWrite,
        token: &VersionToken,
    ) -> Result<CommitRef> {
        info!(repo = %repo, path = %write.path, "Updating file");

        let body = PutFileBody::new(write, Some(token.as_str()));
        self.put_file(repo, &body).await
    }
}

#[async_trait]
impl PagesApi for GitHubClient {
    async fn enable_pages(&self, repo: &str, source: &PagesSource) -> Result<PagesStatus> {
        info!(repo = %repo, branch = %source.branch, "Enabling GitHub Pages");

        let body = PagesBody { source };
        let result: std::result::Result<serde_json::Value, octocrab::Error> = self
            .octocrab
            .post(format!("/repos/{}/{}/pages", self.owner, repo), Some(&body))
            .await;

        match result.map_err(GitHubError::from) {
            Ok(_) => Ok(PagesStatus::Enabled),
            Err(GitHubError::Api { status: 409, .. }) => Ok(PagesStatus::AlreadyEnabled),
            Err(e) => Err(e),
        }
    }

    fn pages_url(&self, repo: &str) -> String {
        pages_url(&self.owner, repo)
    }
}

fn decode_content(encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| GitHubError::Decode(format!("invalid base64 content: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| GitHubError::Decode(format!("content is not UTF-8: {}", e)))
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Serialize)]
struct CreateRepositoryBody<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
    auto_init: bool,
}

#[derive(Serialize)]
struct PutFileBody<'a> {
    #[serde(skip)]
    path: &'a str,
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl<'a> PutFileBody<'a> {
    fn new(write: &'a FileWrite, sha: Option<&'a str>) -> Self {
        Self {
            path: &write.path,
            message: &write.message,
            content: STANDARD.encode(write.content.as_bytes()),
            branch: &write.branch,
            sha,
        }
    }
}

#[derive(Serialize)]
struct PagesBody<'a> {
    source: &'a PagesSource,
}

#[derive(Deserialize)]
struct OwnerResponse {
    login: String,
}

#[derive(Deserialize)]
struct RepositoryResponse {
    name: String,
    html_url: String,
    owner: OwnerResponse,
    #[serde(default)]
    default_branch: Option<String>,
}

impl From<RepositoryResponse> for Repository {
    fn from(response: RepositoryResponse) -> Self {
        Repository {
            owner: response.owner.login,
            name: response.name,
            html_url: response.html_url,
            default_branch: response.default_branch,
        }
    }
}

#[derive(Deserialize)]
struct ContentResponse {
    sha: String,
    path: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
}

#[derive(Deserialize)]
struct FileCommitResponse {
    commit: CommitResponse,
}
