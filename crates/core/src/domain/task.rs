use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::error::{CoreError, Result};

static TASK_ID_PATTERN: OnceLock<Regex> = OnceLock::new();

fn task_id_pattern() -> &'static Regex {
    TASK_ID_PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._-]{1,100}$").expect("task id pattern is a valid regex")
    })
}

/// Workflow phase of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Round {
    /// Round 1: initial build and deployment
    Initial,
    /// Round 2: revision of the previously published artifact
    Revision,
}

impl Round {
    pub fn from_number(number: u64) -> Option<Self> {
        match number {
            1 => Some(Self::Initial),
            2 => Some(Self::Revision),
            _ => None,
        }
    }

    pub fn number(&self) -> u64 {
        match self {
            Self::Initial => 1,
            Self::Revision => 2,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Round {}", self.number())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// An accepted unit of work. Immutable once it has passed intake.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskRequest {
    pub email: String,
    pub secret: String,
    /// Task identifier, also used as the repository name
    pub task: String,
    /// Raw round number; unknown values are tolerated here and ignored downstream
    pub round: u64,
    pub nonce: String,
    pub brief: String,
    pub evaluation_url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl TaskRequest {
    pub fn round(&self) -> Option<Round> {
        Round::from_number(self.round)
    }

    pub fn validate(&self) -> Result<()> {
        validate_task_id(&self.task)?;

        if self.brief.trim().is_empty() {
            return Err(CoreError::Validation("Brief cannot be empty".to_string()));
        }

        let url = Url::parse(&self.evaluation_url).map_err(|e| {
            CoreError::InvalidEvaluationUrl {
                url: self.evaluation_url.clone(),
                reason: e.to_string(),
            }
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::InvalidEvaluationUrl {
                url: self.evaluation_url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        Ok(())
    }
}

impl fmt::Debug for TaskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRequest")
            .field("email", &self.email)
            .field("secret", &"<redacted>")
            .field("task", &self.task)
            .field("round", &self.round)
            .field("nonce", &self.nonce)
            .field("brief", &self.brief)
            .field("evaluation_url", &self.evaluation_url)
            .field("attachments", &self.attachments)
            .finish()
    }
}

pub fn validate_task_id(task: &str) -> Result<()> {
    if task == "." || task == ".." || !task_id_pattern().is_match(task) {
        return Err(CoreError::InvalidTaskId(task.to_string()));
    }
    Ok(())
}
