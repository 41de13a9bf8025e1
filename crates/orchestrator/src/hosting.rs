use std::sync::Arc;

use github::{PagesApi, PagesSource};
use tracing::{info, warn};

/// Turns on static hosting for a repository. Never fails the round.
pub struct HostingEnabler {
    pages: Arc<dyn PagesApi>,
    source: PagesSource,
}

impl HostingEnabler {
    pub fn new(pages: Arc<dyn PagesApi>, branch: impl Into<String>) -> Self {
        Self {
            pages,
            source: PagesSource::root(branch),
        }
    }

    /// Requests hosting from the branch root and returns the public URL,
    /// whether or not the request succeeded.
    pub async fn enable(&self, repo: &str) -> String {
        match self.pages.enable_pages(repo, &self.source).await {
            Ok(status) => {
                info!(
                    repo = %repo,
                    branch = %self.source.branch,
                    status = status.as_str(),
                    "Hosting ready"
                );
            }
            Err(e) => {
                warn!(
                    repo = %repo,
                    status = ?e.status(),
                    error = %e,
                    "Could not enable hosting, continuing"
                );
            }
        }

        self.pages.pages_url(repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PagesBehavior, ScriptedPages};

    async fn enable_with(behavior: PagesBehavior) -> (String, ScriptedPages) {
        let pages = ScriptedPages::new("octo", behavior);
        let url = HostingEnabler::new(Arc::new(pages.clone()), "main")
            .enable("demo")
            .await;
        (url, pages)
    }

    #[tokio::test]
    async fn test_enable_requests_branch_root() {
        let (url, pages) = enable_with(PagesBehavior::Enable).await;

        assert_eq!(url, "https://octo.github.io/demo/");
        assert_eq!(
            pages.calls(),
            vec![("demo".to_string(), PagesSource::root("main"))]
        );
    }

    #[tokio::test]
    async fn test_already_enabled_is_success() {
        let (url, _) = enable_with(PagesBehavior::AlreadyEnabled).await;
        assert_eq!(url, "https://octo.github.io/demo/");
    }

    #[tokio::test]
    async fn test_failure_still_returns_url() {
        let (url, pages) = enable_with(PagesBehavior::FailWith(500)).await;
        assert_eq!(url, "https://octo.github.io/demo/");
        assert_eq!(pages.calls().len(), 1);
    }
}
