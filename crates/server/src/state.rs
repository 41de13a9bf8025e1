use std::path::PathBuf;
use std::sync::Arc;

use orchestrator::TaskDispatcher;

#[derive(Clone)]
pub struct AppState {
    secret: Arc<str>,
    pub dispatcher: TaskDispatcher,
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(secret: impl Into<String>, dispatcher: TaskDispatcher) -> Self {
        Self {
            secret: Arc::from(secret.into()),
            dispatcher,
            static_dir: None,
        }
    }

    pub fn with_static_dir(mut self, static_dir: PathBuf) -> Self {
        self.static_dir = Some(static_dir);
        self
    }

    pub fn secret_matches(&self, candidate: &str) -> bool {
        !self.secret.is_empty() && *self.secret == *candidate
    }
}
