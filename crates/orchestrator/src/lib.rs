//! Round orchestration: turns an accepted task request into a generated,
//! published, hosted artifact and notifies the evaluator.
//!
//! - [`RoundOrchestrator`] drives one round through its states
//! - [`ArtifactPublisher`] writes the file set with create-or-update semantics
//! - [`HostingEnabler`] turns on static hosting, best effort
//! - [`RetryDelivery`] posts the evaluation payload until a deadline
//! - [`TaskDispatcher`] runs rounds in the background, one per task at a time

pub mod delivery;
pub mod dispatcher;
pub mod documents;
pub mod error;
pub mod executor;
pub mod hosting;
pub mod publication;
pub mod resources;
pub mod state_machine;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use delivery::{
    Backoff, HttpTransport, NotificationTransport, RetryDelivery, RetryPolicy, TransportError,
    TransportResponse,
};
pub use dispatcher::TaskDispatcher;
pub use error::{OrchestratorError, Result};
pub use executor::{OrchestratorConfig, RoundOrchestrator, RoundOutcome, RoundReport};
pub use hosting::HostingEnabler;
pub use publication::{ArtifactFiles, ArtifactPublisher, PublishFile, RepositorySpec, TokenSource};
pub use resources::{TaskLockGuard, TaskLocks};
pub use state_machine::{RoundState, RoundStateMachine, RoundStep};
