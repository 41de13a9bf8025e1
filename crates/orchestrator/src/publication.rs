//! Idempotent create-or-update publication of the artifact file set.

use std::sync::Arc;

use github::{
    pages_url, ContentStore, FileWrite, GitHubError, NewRepository, RemoteFile, Repository,
    VersionToken,
};
use pagesmith_core::{PublicationResult, Round};
use tracing::{debug, info};

use crate::error::{OrchestratorError, Result};

#[derive(Debug, Clone)]
pub struct RepositorySpec {
    pub name: String,
    pub description: String,
}

/// How the publisher learns the current version of a file before writing it.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// Ask the store; create the file when it does not exist yet
    Lookup,
    /// Token observed earlier in the round; the write fails if it went stale
    Known(VersionToken),
}

#[derive(Debug, Clone)]
pub struct PublishFile {
    pub path: String,
    pub content: String,
    pub create_message: String,
    pub update_message: String,
    pub token: TokenSource,
}

impl PublishFile {
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        create_message: impl Into<String>,
        update_message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            create_message: create_message.into(),
            update_message: update_message.into(),
            token: TokenSource::Lookup,
        }
    }

    pub fn with_token(mut self, token: VersionToken) -> Self {
        self.token = TokenSource::Known(token);
        self
    }
}

/// Files written by one publication, in write order: artifact, license, readme.
#[derive(Debug, Clone)]
pub struct ArtifactFiles {
    pub artifact: PublishFile,
    pub license: Option<PublishFile>,
    pub readme: PublishFile,
}

impl ArtifactFiles {
    fn in_order(&self) -> impl Iterator<Item = &PublishFile> {
        std::iter::once(&self.artifact)
            .chain(self.license.iter())
            .chain(std::iter::once(&self.readme))
    }
}

pub struct ArtifactPublisher {
    store: Arc<dyn ContentStore>,
    branch: String,
}

impl ArtifactPublisher {
    pub fn new(store: Arc<dyn ContentStore>, branch: impl Into<String>) -> Self {
        Self {
            store,
            branch: branch.into(),
        }
    }

    pub fn owner(&self) -> &str {
        self.store.owner()
    }

    /// Writes `files` to the repository and reports where they landed.
    ///
    /// Round 1 creates the repository, reusing it when it already exists.
    /// Round 2 requires it to exist. The reported commit is the one produced
    /// by the last write (the readme).
    pub async fn publish(
        &self,
        repo: &RepositorySpec,
        round: Round,
        files: &ArtifactFiles,
    ) -> Result<PublicationResult> {
        let repository = match round {
            Round::Initial => self.ensure_repository(repo).await?,
            Round::Revision => self.store.get_repository(&repo.name).await?,
        };

        let mut commit_sha = String::new();
        for file in files.in_order() {
            commit_sha = self.write_file(&repository.name, file).await?;
        }

        if commit_sha.is_empty() {
            return Err(OrchestratorError::EmptyCommit {
                path: files.readme.path.clone(),
            });
        }

        info!(
            repo = %repository.full_name(),
            commit = %commit_sha,
            round = round.number(),
            "Published artifact"
        );

        Ok(PublicationResult {
            repo_url: repository.html_url.clone(),
            commit_sha,
            pages_url: pages_url(self.store.owner(), &repository.name),
        })
    }

    /// Current content and version token of `path`. Fails when the repository
    /// or the file is absent.
    pub async fn fetch_prior(&self, repo: &str, path: &str) -> Result<RemoteFile> {
        let repository = self.store.get_repository(repo).await?;

        self.store
            .get_file(&repository.name, path, &self.branch)
            .await?
            .ok_or_else(|| OrchestratorError::MissingPriorContent {
                repo: repository.full_name(),
                path: path.to_string(),
                branch: self.branch.clone(),
            })
    }

    async fn ensure_repository(&self, repo: &RepositorySpec) -> Result<Repository> {
        let request = NewRepository::public(&repo.name, &repo.description);

        match self.store.create_repository(&request).await {
            Ok(repository) => {
                info!(repo = %repository.full_name(), "Created repository");
                Ok(repository)
            }
            Err(GitHubError::RepoAlreadyExists { .. }) => {
                debug!(repo = %repo.name, "Repository exists, reusing it");
                Ok(self.store.get_repository(&repo.name).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(&self, repo: &str, file: &PublishFile) -> Result<String> {
        let token = match &file.token {
            TokenSource::Known(token) => Some(token.clone()),
            TokenSource::Lookup => self
                .store
                .get_file(repo, &file.path, &self.branch)
                .await?
                .map(|existing| existing.token),
        };

        let commit = match token {
            Some(token) => {
                let write = FileWrite::new(
                    &file.path,
                    &file.content,
                    &file.update_message,
                    &self.branch,
                );
                self.store.update_file(repo, &write, &token).await?
            }
            None => {
                let write = FileWrite::new(
                    &file.path,
                    &file.content,
                    &file.create_message,
                    &self.branch,
                );
                self.store.create_file(repo, &write).await?
            }
        };

        debug!(repo = %repo, path = %file.path, commit = %commit.sha, "Wrote file");
        Ok(commit.sha)
    }
}
