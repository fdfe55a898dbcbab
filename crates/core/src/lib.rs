//! branchmirror core library.
//!
//! Foundational components for directory-to-branch mirroring:
//!
//! - [`config`]: TOML configuration with environment resolution
//! - [`directive`]: mapping line parsing and validation
//! - [`expand`]: glob expansion of wildcard directives
//! - [`detect`]: per-mapping sync decisions
//! - [`git`]: git CLI invocation and remote URL derivation
//! - [`mirror`]: the branch-recreation executor
//! - [`sync_engine`]: orchestration of a full run

pub mod config;
pub mod detect;
pub mod directive;
pub mod errors;
pub mod expand;
pub mod git;
pub mod mirror;
pub mod sync_engine;

// Re-exports for the common entry points.
pub use config::MirrorConfig;
pub use directive::{ConcreteMapping, Directive};
pub use errors::CoreError;
pub use sync_engine::{SyncEngine, SyncStats};
