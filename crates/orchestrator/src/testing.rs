//! In-memory stand-ins for every external collaborator of a round.
//!
//! Enabled for this crate's unit tests and, through the `testing` feature,
//! for downstream test suites.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use generator::{ContentGenerator, GenerationRequest, GeneratorError, GeneratorResult};
use github::{
    pages_url, CommitRef, ContentStore, FileWrite, GitHubError, NewRepository, PagesApi,
    PagesSource, PagesStatus, RemoteFile, Repository, VersionToken,
};
use tokio::time::Instant;

use crate::delivery::{NotificationTransport, TransportError, TransportResponse};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Content store
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub repo: String,
    pub path: String,
    pub kind: WriteKind,
    pub message: String,
    pub commit_sha: String,
}

#[derive(Debug, Clone)]
struct StoredFile {
    content: String,
    token: VersionToken,
}

#[derive(Default)]
struct StoreState {
    repos: HashMap<String, HashMap<String, StoredFile>>,
    writes: Vec<WriteRecord>,
    repo_creations: u32,
    counter: u64,
    failing_paths: HashSet<String>,
    blank_commits: bool,
}

impl StoreState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}-{}", prefix, self.counter)
    }
}

/// Versioned store that enforces version tokens the way the real API does.
#[derive(Clone)]
pub struct MemoryStore {
    owner: String,
    /// Owner spelling reported back on repository lookups
    login: Option<String>,
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            login: None,
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    /// Reports `login` as the repository owner, as the API does when the
    /// configured account name differs in case.
    pub fn with_login(mut self, login: &str) -> Self {
        self.login = Some(login.to_string());
        self
    }

    pub fn with_repository(self, name: &str) -> Self {
        lock(&self.state)
            .repos
            .entry(name.to_string())
            .or_default();
        self
    }

    /// Seeds a file as if committed by an earlier run. Returns its token.
    pub fn seed_file(&self, repo: &str, path: &str, content: &str) -> VersionToken {
        let mut state = lock(&self.state);
        let token = VersionToken::new(state.next_id("blob"));
        state.repos.entry(repo.to_string()).or_default().insert(
            path.to_string(),
            StoredFile {
                content: content.to_string(),
                token: token.clone(),
            },
        );
        token
    }

    /// Makes every write to `path` fail with a server error.
    pub fn fail_writes_to(&self, path: &str) {
        lock(&self.state).failing_paths.insert(path.to_string());
    }

    /// Makes writes report an empty commit identifier.
    pub fn return_blank_commits(&self) {
        lock(&self.state).blank_commits = true;
    }

    pub fn has_repository(&self, name: &str) -> bool {
        lock(&self.state).repos.contains_key(name)
    }

    pub fn file(&self, repo: &str, path: &str) -> Option<String> {
        lock(&self.state)
            .repos
            .get(repo)
            .and_then(|files| files.get(path))
            .map(|f| f.content.clone())
    }

    pub fn paths(&self, repo: &str) -> Vec<String> {
        let state = lock(&self.state);
        let mut paths: Vec<String> = state
            .repos
            .get(repo)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        lock(&self.state).writes.clone()
    }

    pub fn repo_creations(&self) -> u32 {
        lock(&self.state).repo_creations
    }

    fn repository(&self, name: &str) -> Repository {
        let owner = self.login.as_deref().unwrap_or(&self.owner);
        Repository {
            owner: owner.to_string(),
            name: name.to_string(),
            html_url: format!("https://github.com/{}/{}", owner, name),
            default_branch: Some("main".to_string()),
        }
    }

    fn write(
        &self,
        repo: &str,
        write: &FileWrite,
        token: Option<&VersionToken>,
    ) -> github::Result<CommitRef> {
        let mut state = lock(&self.state);

        if state.failing_paths.contains(&write.path) {
            return Err(GitHubError::Api {
                status: 500,
                message: format!("injected failure for {}", write.path),
            });
        }

        let blob = VersionToken::new(state.next_id("blob"));
        let commit_sha = if state.blank_commits {
            String::new()
        } else {
            state.next_id("commit")
        };

        let files = state
            .repos
            .get_mut(repo)
            .ok_or_else(|| GitHubError::RepoNotFound {
                owner: self.owner.clone(),
                repo: repo.to_string(),
            })?;

        let kind = match (files.get(&write.path), token) {
            (Some(_), None) => {
                return Err(GitHubError::FileAlreadyExists {
                    repo: repo.to_string(),
                    path: write.path.clone(),
                })
            }
            (Some(existing), Some(token)) if existing.token != *token => {
                return Err(GitHubError::Conflict {
                    repo: repo.to_string(),
                    path: write.path.clone(),
                    message: format!("{} does not match {}", write.path, token.as_str()),
                })
            }
            (None, Some(_)) => {
                return Err(GitHubError::Api {
                    status: 404,
                    message: format!("{} not found", write.path),
                })
            }
            (Some(_), Some(_)) => WriteKind::Update,
            (None, None) => WriteKind::Create,
        };

        files.insert(
            write.path.clone(),
            StoredFile {
                content: write.content.clone(),
                token: blob,
            },
        );
        state.writes.push(WriteRecord {
            repo: repo.to_string(),
            path: write.path.clone(),
            kind,
            message: write.message.clone(),
            commit_sha: commit_sha.clone(),
        });

        Ok(CommitRef { sha: commit_sha })
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn owner(&self) -> &str {
        &self.owner
    }

    async fn create_repository(&self, request: &NewRepository) -> github::Result<Repository> {
        let mut state = lock(&self.state);
        if state.repos.contains_key(&request.name) {
            return Err(GitHubError::RepoAlreadyExists {
                owner: self.owner.clone(),
                repo: request.name.clone(),
            });
        }
        state.repos.insert(request.name.clone(), HashMap::new());
        state.repo_creations += 1;
        Ok(self.repository(&request.name))
    }

    async fn get_repository(&self, name: &str) -> github::Result<Repository> {
        if self.has_repository(name) {
            Ok(self.repository(name))
        } else {
            Err(GitHubError::RepoNotFound {
                owner: self.owner.clone(),
                repo: name.to_string(),
            })
        }
    }

    async fn get_file(
        &self,
        repo: &str,
        path: &str,
        _branch: &str,
    ) -> github::Result<Option<RemoteFile>> {
        let state = lock(&self.state);
        let files = state.repos.get(repo).ok_or_else(|| GitHubError::RepoNotFound {
            owner: self.owner.clone(),
            repo: repo.to_string(),
        })?;

        Ok(files.get(path).map(|f| RemoteFile {
            path: path.to_string(),
            content: f.content.clone(),
            token: f.token.clone(),
        }))
    }

    async fn create_file(&self, repo: &str, write: &FileWrite) -> github::Result<CommitRef> {
        self.write(repo, write, None)
    }

    async fn update_file(
        &self,
        repo: &str,
        write: &FileWrite,
        token: &VersionToken,
    ) -> github::Result<CommitRef> {
        self.write(repo, write, Some(token))
    }
}

// =============================================================================
// Generator
// =============================================================================

/// Generator that replays canned replies in order, repeating the last one.
#[derive(Clone)]
pub struct ScriptedGenerator {
    replies: Arc<Mutex<VecDeque<Result<String, String>>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedGenerator {
    pub fn returning(html: &str) -> Self {
        Self::with_replies(vec![Ok(html.to_string())])
    }

    pub fn failing(message: &str) -> Self {
        Self::with_replies(vec![Err(message.to_string())])
    }

    pub fn with_replies(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> GeneratorResult<String> {
        lock(&self.requests).push(request.clone());

        let mut replies = lock(&self.replies);
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };

        match reply {
            Some(Ok(html)) => Ok(html),
            Some(Err(message)) => Err(GeneratorError::Api {
                message,
                status_code: Some(500),
            }),
            None => Err(GeneratorError::EmptyResponse),
        }
    }
}

// =============================================================================
// Pages
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub enum PagesBehavior {
    Enable,
    AlreadyEnabled,
    FailWith(u16),
}

#[derive(Clone)]
pub struct ScriptedPages {
    owner: String,
    behavior: PagesBehavior,
    calls: Arc<Mutex<Vec<(String, PagesSource)>>>,
}

impl ScriptedPages {
    pub fn new(owner: impl Into<String>, behavior: PagesBehavior) -> Self {
        Self {
            owner: owner.into(),
            behavior,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<(String, PagesSource)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl PagesApi for ScriptedPages {
    async fn enable_pages(&self, repo: &str, source: &PagesSource) -> github::Result<PagesStatus> {
        lock(&self.calls).push((repo.to_string(), source.clone()));

        match self.behavior {
            PagesBehavior::Enable => Ok(PagesStatus::Enabled),
            PagesBehavior::AlreadyEnabled => Ok(PagesStatus::AlreadyEnabled),
            PagesBehavior::FailWith(status) => Err(GitHubError::Api {
                status,
                message: "pages unavailable".to_string(),
            }),
        }
    }

    fn pages_url(&self, repo: &str) -> String {
        pages_url(&self.owner, repo)
    }
}

// =============================================================================
// Notification transport
// =============================================================================

#[derive(Debug, Clone)]
pub enum TransportReply {
    Status(u16),
    Fail(String),
    /// Never answers; the caller's timeout decides
    Hang,
}

#[derive(Debug, Clone)]
pub struct Attempt {
    pub endpoint: String,
    pub body: serde_json::Value,
    pub at: Instant,
    pub timeout: Duration,
}

/// Transport that replays scripted replies, then repeats `fallback`.
#[derive(Clone)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<TransportReply>>>,
    fallback: TransportReply,
    attempts: Arc<Mutex<Vec<Attempt>>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<TransportReply>, fallback: TransportReply) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            fallback,
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn always(reply: TransportReply) -> Self {
        Self::new(Vec::new(), reply)
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        lock(&self.attempts).clone()
    }
}

#[async_trait]
impl NotificationTransport for ScriptedTransport {
    async fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        lock(&self.attempts).push(Attempt {
            endpoint: endpoint.to_string(),
            body: body.clone(),
            at: Instant::now(),
            timeout,
        });

        let reply = lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            TransportReply::Status(status) => Ok(TransportResponse {
                status,
                body: String::new(),
            }),
            TransportReply::Fail(message) => Err(TransportError(message)),
            TransportReply::Hang => {
                std::future::pending::<()>().await;
                Err(TransportError("unreachable".to_string()))
            }
        }
    }
}
