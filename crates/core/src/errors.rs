//! Comprehensive error types for the branchmirror core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Directive(#[from] DirectiveError),

    #[error(transparent)]
    Expand(#[from] ExpandError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Directive errors
// ---------------------------------------------------------------------------

/// Errors from parsing a single mapping directive line.
///
/// All of these are recoverable: the engine logs a warning and skips the
/// offending line without stopping the run.
#[derive(Debug, Error)]
pub enum DirectiveError {
    /// The source side is empty after trimming.
    #[error("invalid mapping '{line}': source pattern is empty")]
    EmptySource { line: String },

    /// The `->` separator is missing, or the target side is empty after
    /// trimming.
    #[error("invalid mapping '{line}': target pattern is empty")]
    EmptyTarget { line: String },

    /// The target pattern consumes more captures than the source provides.
    #[error(
        "invalid mapping '{line}': target pattern consumes {required} wildcard \
         captures but source pattern provides {available}"
    )]
    CaptureMismatch {
        line: String,
        available: usize,
        required: usize,
    },
}

// ---------------------------------------------------------------------------
// Expansion errors
// ---------------------------------------------------------------------------

/// Errors from glob pattern compilation and filesystem expansion.
#[derive(Debug, Error)]
pub enum ExpandError {
    /// The translated pattern did not compile to a valid regex.
    #[error("invalid glob pattern '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },

    /// I/O failure while walking the directory tree.
    #[error("expansion I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from git CLI invocations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` binary was not found on `$PATH`.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// A git command exited with a non-zero status. `command` is the
    /// redacted rendering (secrets replaced by `***`).
    #[error("git command failed (exit {exit_code}): {command}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// Generic I/O wrapper (spawn failures other than a missing binary).
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing { var: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Sync errors
// ---------------------------------------------------------------------------

/// Errors from the mirror sync executor.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The mapped source directory does not exist on disk.
    #[error("source directory not found: {path}")]
    SourceDirMissing { path: String },

    /// Underlying git error during the publish sequence.
    #[error("sync git error: {0}")]
    GitError(#[from] GitError),

    /// I/O failure while removing freshly created repository metadata.
    #[error("sync I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
