use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::task::{Round, TaskRequest};

/// Outcome of publishing one round. Produced once per round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PublicationResult {
    pub repo_url: String,
    /// Commit of the readme write, the result-of-record for the round
    pub commit_sha: String,
    pub pages_url: String,
}

/// Body POSTed to the evaluator. Field names are part of the external protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EvaluationPayload {
    pub email: String,
    pub task: String,
    pub round: u64,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

impl EvaluationPayload {
    pub fn new(request: &TaskRequest, round: Round, publication: &PublicationResult) -> Self {
        Self {
            email: request.email.clone(),
            task: request.task.clone(),
            round: round.number(),
            nonce: request.nonce.clone(),
            repo_url: publication.repo_url.clone(),
            commit_sha: publication.commit_sha.clone(),
            pages_url: publication.pages_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_wire_fields() {
        let request = TaskRequest {
            email: "student@example.com".to_string(),
            secret: "s3cret".to_string(),
            task: "demo-app".to_string(),
            round: 1,
            nonce: "abc".to_string(),
            brief: "a todo list".to_string(),
            evaluation_url: "https://eval.example/cb".to_string(),
            attachments: vec![],
        };
        let publication = PublicationResult {
            repo_url: "https://github.com/octo/demo-app".to_string(),
            commit_sha: "deadbeef".to_string(),
            pages_url: "https://octo.github.io/demo-app/".to_string(),
        };

        let payload = EvaluationPayload::new(&request, Round::Initial, &publication);
        let value = serde_json::to_value(&payload).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["commit_sha", "email", "nonce", "pages_url", "repo_url", "round", "task"]
        );
        assert_eq!(value["round"], 1);
        assert_eq!(value["commit_sha"], "deadbeef");
        assert!(!value.to_string().contains("s3cret"));
    }
}
