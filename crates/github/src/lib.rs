pub mod client;
pub mod error;
pub mod store;
pub mod types;

pub use client::GitHubClient;
pub use error::{GitHubError, Result};
pub use store::{ContentStore, PagesApi};
pub use types::{
    pages_url, CommitRef, FileWrite, NewRepository, PagesSource, PagesStatus, RemoteFile,
    Repository, VersionToken,
};
