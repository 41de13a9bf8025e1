use std::sync::Arc;

use chrono::{Datelike, Utc};
use generator::{ContentGenerator, GenerationRequest};
use github::{ContentStore, PagesApi};
use pagesmith_core::{EvaluationPayload, PublicationResult, Round, TaskRequest};
use tracing::{debug, info, warn};

use crate::delivery::{NotificationTransport, RetryDelivery, RetryPolicy};
use crate::documents::{
    excerpt, mit_license, readme_content, ARTIFACT_PATH, LICENSE_PATH, README_PATH,
};
use crate::error::Result;
use crate::hosting::HostingEnabler;
use crate::publication::{ArtifactFiles, ArtifactPublisher, PublishFile, RepositorySpec};
use crate::state_machine::{RoundState, RoundStateMachine, RoundStep};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Branch that receives every write and serves the hosted site
    pub branch: String,
    pub delivery: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            branch: "main".to_string(),
            delivery: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoundReport {
    pub round: Round,
    pub publication: PublicationResult,
    pub delivered: bool,
    /// States visited, in order
    pub states: Vec<RoundState>,
}

#[derive(Debug, Clone)]
pub enum RoundOutcome {
    /// Round number outside the known workflow; nothing was done
    Skipped { round: u64 },
    Completed(RoundReport),
}

pub struct RoundOrchestrator {
    generator: Arc<dyn ContentGenerator>,
    publisher: ArtifactPublisher,
    hosting: HostingEnabler,
    delivery: RetryDelivery,
}

impl RoundOrchestrator {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        store: Arc<dyn ContentStore>,
        pages: Arc<dyn PagesApi>,
        transport: Arc<dyn NotificationTransport>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            generator,
            publisher: ArtifactPublisher::new(store, config.branch.clone()),
            hosting: HostingEnabler::new(pages, config.branch),
            delivery: RetryDelivery::new(transport, config.delivery),
        }
    }

    /// Runs one round to completion. Any failing state aborts the states
    /// after it; notification failure does not.
    pub async fn run(&self, request: &TaskRequest) -> Result<RoundOutcome> {
        let Some(round) = request.round() else {
            warn!(task = %request.task, round = request.round, "Unknown round, ignoring request");
            return Ok(RoundOutcome::Skipped {
                round: request.round,
            });
        };
        request.validate()?;

        info!(task = %request.task, round = round.number(), "Starting round");

        let mut states = Vec::new();
        let mut step = RoundStep::initial(round);

        loop {
            let state = step.state();
            debug!(task = %request.task, state = %state, "Entering state");
            states.push(state);

            step = match step {
                RoundStep::GenerateInitial => {
                    let generation =
                        GenerationRequest::initial(&request.brief, request.attachments.clone());
                    let artifact = self.generator.generate(&generation).await?;
                    RoundStep::PublishCreate { artifact }
                }
                RoundStep::PublishCreate { artifact } => {
                    let files = self.initial_files(request, artifact);
                    let publication = self
                        .publisher
                        .publish(&repository_spec(request), Round::Initial, &files)
                        .await?;
                    RoundStep::EnableHosting { publication }
                }
                RoundStep::EnableHosting { publication } => {
                    let pages_url = self.hosting.enable(&request.task).await;
                    RoundStep::Notify {
                        publication: PublicationResult {
                            pages_url,
                            ..publication
                        },
                    }
                }
                RoundStep::FetchPrior => {
                    let prior = self
                        .publisher
                        .fetch_prior(&request.task, ARTIFACT_PATH)
                        .await?;
                    RoundStep::GenerateRevision {
                        prior_content: prior.content,
                        prior_token: prior.token,
                    }
                }
                RoundStep::GenerateRevision {
                    prior_content,
                    prior_token,
                } => {
                    let generation = GenerationRequest::revision(
                        &request.brief,
                        request.attachments.clone(),
                        prior_content,
                    );
                    let artifact = self.generator.generate(&generation).await?;
                    RoundStep::PublishUpdate {
                        artifact,
                        prior_token,
                    }
                }
                RoundStep::PublishUpdate {
                    artifact,
                    prior_token,
                } => {
                    let mut files = self.revision_files(request, artifact);
                    files.artifact = files.artifact.with_token(prior_token);
                    let publication = self
                        .publisher
                        .publish(&repository_spec(request), Round::Revision, &files)
                        .await?;
                    RoundStep::Notify { publication }
                }
                RoundStep::Notify { publication } => {
                    let payload = EvaluationPayload::new(request, round, &publication);
                    let delivered = self
                        .delivery
                        .deliver(&request.evaluation_url, &payload)
                        .await;
                    RoundStep::Done {
                        publication,
                        delivered,
                    }
                }
                RoundStep::Done {
                    publication,
                    delivered,
                } => {
                    info!(
                        task = %request.task,
                        round = round.number(),
                        repo_url = %publication.repo_url,
                        commit = %publication.commit_sha,
                        pages_url = %publication.pages_url,
                        delivered,
                        "Round complete"
                    );
                    return Ok(RoundOutcome::Completed(RoundReport {
                        round,
                        publication,
                        delivered,
                        states,
                    }));
                }
            };

            debug_assert!(
                RoundStateMachine::can_transition(round, state, step.state()),
                "illegal transition {state} -> {}",
                step.state()
            );
        }
    }

    fn initial_files(&self, request: &TaskRequest, artifact: String) -> ArtifactFiles {
        let now = Utc::now();

        ArtifactFiles {
            artifact: PublishFile::new(
                ARTIFACT_PATH,
                artifact,
                "Initial commit: Add index.html",
                "Update index.html",
            ),
            license: Some(PublishFile::new(
                LICENSE_PATH,
                mit_license(self.publisher.owner(), now.year()),
                "Add MIT License",
                "Update LICENSE",
            )),
            readme: PublishFile::new(
                README_PATH,
                readme_content(&request.task, &request.brief, Round::Initial, now.date_naive()),
                "Add comprehensive README",
                "Update README",
            ),
        }
    }

    fn revision_files(&self, request: &TaskRequest, artifact: String) -> ArtifactFiles {
        let artifact_message = format!(
            "Round 2: Update application - {}",
            excerpt(&request.brief, 50)
        );
        let readme = readme_content(
            &request.task,
            &request.brief,
            Round::Revision,
            Utc::now().date_naive(),
        );

        ArtifactFiles {
            artifact: PublishFile::new(
                ARTIFACT_PATH,
                artifact,
                artifact_message.clone(),
                artifact_message,
            ),
            license: None,
            readme: PublishFile::new(
                README_PATH,
                readme,
                "Update README for Round 2",
                "Update README for Round 2",
            ),
        }
    }
}

fn repository_spec(request: &TaskRequest) -> RepositorySpec {
    RepositorySpec {
        name: request.task.clone(),
        description: format!("Web application: {}", excerpt(&request.brief, 100)),
    }
}
