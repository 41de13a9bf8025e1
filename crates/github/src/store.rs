use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    CommitRef, FileWrite, NewRepository, PagesSource, PagesStatus, RemoteFile, Repository,
    VersionToken,
};

/// Versioned file store keyed by repository name under a single owner.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Account that owns every repository this store touches.
    fn owner(&self) -> &str;

    /// Fails with `RepoAlreadyExists` when the name is taken.
    async fn create_repository(&self, request: &NewRepository) -> Result<Repository>;

    /// Fails with `RepoNotFound` when absent.
    async fn get_repository(&self, name: &str) -> Result<Repository>;

    /// `None` when the file does not exist at `branch`.
    async fn get_file(&self, repo: &str, path: &str, branch: &str) -> Result<Option<RemoteFile>>;

    /// Fails with `FileAlreadyExists` when the path is taken.
    async fn create_file(&self, repo: &str, write: &FileWrite) -> Result<CommitRef>;

    /// Fails with `Conflict` when `token` is not the file's current version.
    async fn update_file(
        &self,
        repo: &str,
        write: &FileWrite,
        token: &VersionToken,
    ) -> Result<CommitRef>;
}

/// Static hosting for a repository's branch.
#[async_trait]
pub trait PagesApi: Send + Sync {
    async fn enable_pages(&self, repo: &str, source: &PagesSource) -> Result<PagesStatus>;

    fn pages_url(&self, repo: &str) -> String;
}
