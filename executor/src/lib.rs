pub mod client;
pub mod error;
pub mod github;
pub mod guard;

pub use client::{CommitClient, CommitReceipt, CommitRequest};
pub use error::CommitError;
pub use guard::CommitGuard;
