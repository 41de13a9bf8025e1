pub mod domain;
pub mod error;

pub use domain::publication::{EvaluationPayload, PublicationResult};
pub use domain::task::{Attachment, Round, TaskRequest};
pub use error::{CoreError, Result};
