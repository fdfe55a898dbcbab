//! Change detection for concrete mappings.
//!
//! Before publishing, the engine decides per mapping whether a sync is
//! warranted:
//!
//! 1. When the unchanged check is disabled, every mapping syncs.
//! 2. A branch-existence probe runs first; an existing target branch forces
//!    a sync without consulting the diff.
//! 3. Otherwise a diff probe compares the last two revisions under the
//!    mapped path.
//!
//! A mapping is skipped only when the target branch is absent AND the path
//! is unchanged. Both probes answer through their exit code; any code
//! outside the expected pair is reported as inconclusive, and inconclusive
//! probes sync rather than silently skipping.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::directive::ConcreteMapping;
use crate::errors::GitError;
use crate::git::{GitCommand, GitRunner};

// ---------------------------------------------------------------------------
// Probe answers
// ---------------------------------------------------------------------------

/// Answer of the branch-existence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchPresence {
    /// `refs/heads/<branch>` resolves locally.
    Exists,
    /// The ref does not resolve.
    Absent,
    /// The probe exited with an unexpected status code.
    Indeterminate(i32),
}

/// Answer of the path-diff probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathChange {
    /// The last two revisions differ under the path.
    Changed,
    /// No differences under the path.
    Unchanged,
    /// The probe exited with an unexpected status code (shallow clone,
    /// missing parent revision, bad pathspec).
    Indeterminate(i32),
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why a mapping is synced or skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// The unchanged check is disabled; every mapping syncs.
    Forced,
    /// The target branch already exists, so it must be kept up to date.
    BranchExists,
    /// The mapped path changed in the latest revision.
    PathChanged,
    /// A probe answered with an unexpected status; sync to be safe.
    ProbeInconclusive,
    /// Branch absent and path unchanged; nothing to publish.
    Unchanged,
}

impl SyncDecision {
    /// Whether the mapping should be published.
    pub fn should_sync(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    /// Stable lowercase label for logs and run reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Forced => "forced",
            Self::BranchExists => "branch-exists",
            Self::PathChanged => "path-changed",
            Self::ProbeInconclusive => "probe-inconclusive",
            Self::Unchanged => "unchanged",
        }
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Decides per mapping whether to publish. Probes run in the workspace
/// root, which must itself be a git checkout.
pub struct ChangeDetector {
    root: PathBuf,
    skip_unchanged_check: bool,
}

impl ChangeDetector {
    pub fn new(root: impl Into<PathBuf>, skip_unchanged_check: bool) -> Self {
        Self {
            root: root.into(),
            skip_unchanged_check,
        }
    }

    /// Decide whether `mapping` should sync. Only spawn failures are
    /// errors; unexpected probe statuses degrade to
    /// [`SyncDecision::ProbeInconclusive`].
    pub async fn decide(&self, mapping: &ConcreteMapping) -> Result<SyncDecision, GitError> {
        if self.skip_unchanged_check {
            debug!(source_dir = %mapping.source_dir, "unchanged check disabled");
            return Ok(SyncDecision::Forced);
        }

        match self.branch_presence(&mapping.target_branch).await? {
            BranchPresence::Exists => Ok(SyncDecision::BranchExists),
            BranchPresence::Indeterminate(code) => {
                warn!(
                    exit_code = code,
                    target_branch = %mapping.target_branch,
                    "branch probe inconclusive, syncing anyway"
                );
                Ok(SyncDecision::ProbeInconclusive)
            }
            BranchPresence::Absent => match self.path_change(&mapping.source_dir).await? {
                PathChange::Changed => Ok(SyncDecision::PathChanged),
                PathChange::Unchanged => Ok(SyncDecision::Unchanged),
                PathChange::Indeterminate(code) => {
                    warn!(
                        exit_code = code,
                        source_dir = %mapping.source_dir,
                        "diff probe inconclusive, syncing anyway"
                    );
                    Ok(SyncDecision::ProbeInconclusive)
                }
            },
        }
    }

    /// Probe whether the target branch exists locally.
    pub async fn branch_presence(&self, branch: &str) -> Result<BranchPresence, GitError> {
        let runner = GitRunner::new(&self.root);
        let code = runner.probe(&branch_probe(branch)).await?;
        Ok(match code {
            0 => BranchPresence::Exists,
            1 => BranchPresence::Absent,
            other => BranchPresence::Indeterminate(other),
        })
    }

    /// Probe whether the mapped path changed between the last two
    /// revisions.
    pub async fn path_change(&self, source_dir: &str) -> Result<PathChange, GitError> {
        let runner = GitRunner::new(&self.root);
        let code = runner.probe(&diff_probe(source_dir)).await?;
        Ok(match code {
            0 => PathChange::Unchanged,
            1 => PathChange::Changed,
            other => PathChange::Indeterminate(other),
        })
    }
}

/// `git rev-parse --verify --quiet refs/heads/<branch>`: exit 0 when the
/// ref resolves, 1 when it does not.
pub(crate) fn branch_probe(branch: &str) -> GitCommand {
    let refname = format!("refs/heads/{}", branch);
    GitCommand::new(["rev-parse", "--verify", "--quiet", refname.as_str()])
}

/// `git diff --quiet HEAD HEAD~1 -- <pathspec>`: exit 0 when the path is
/// unchanged, 1 when it changed.
pub(crate) fn diff_probe(source_dir: &str) -> GitCommand {
    let pathspec = resolve_pathspec(source_dir);
    GitCommand::new(["diff", "--quiet", "HEAD", "HEAD~1", "--", pathspec.as_str()])
}

/// Pathspec for the diff probe: the source dir without its leading slash.
/// The root mapping `/` resolves to `.`, never an empty pathspec.
pub fn resolve_pathspec(source_dir: &str) -> String {
    let rel = source_dir.trim_start_matches('/');
    if rel.is_empty() {
        ".".to_string()
    } else {
        rel.to_string()
    }
}
