//! Git command invocation for branchmirror.

pub mod remote_url;
pub mod runner;

pub use runner::{GitCommand, GitRunner};
