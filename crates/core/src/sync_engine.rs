//! Directory-to-branch mirroring engine.
//!
//! [`SyncEngine`] drives one full run:
//!
//! 1. Seed a work queue with the configured map lines.
//! 2. Pop lines front-to-back; malformed ones are warned about and
//!    skipped.
//! 3. Wildcard directives expand against the filesystem; the resulting
//!    concrete lines go back on the front of the queue, so expansions are
//!    processed depth-first before anything that came after them.
//! 4. Each concrete mapping gets a sync decision, then the executor
//!    publishes it.
//!
//! Processing is strictly sequential: every git invocation completes
//! before the next begins, and executor failures abort the run with the
//! rest of the queue untouched.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::MirrorConfig;
use crate::detect::ChangeDetector;
use crate::directive::{ConcreteMapping, Directive};
use crate::errors::CoreError;
use crate::expand::GlobExpander;
use crate::mirror::MirrorSync;

// ---------------------------------------------------------------------------
// Run statistics
// ---------------------------------------------------------------------------

/// Statistics for a single mirroring run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// Mappings published.
    pub synced_count: usize,
    /// Mappings skipped as unchanged.
    pub skipped_count: usize,
    /// Malformed map lines dropped with a warning.
    pub invalid_count: usize,
    /// Wildcard directives expanded against the filesystem.
    pub expanded_count: usize,
    /// Per-mapping decisions, in processing order.
    pub outcomes: Vec<MappingOutcome>,
    pub started_at: String,
    pub completed_at: Option<String>,
}

/// Decision record for one concrete mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingOutcome {
    pub source_dir: String,
    pub target_branch: String,
    /// Decision label: `forced`, `branch-exists`, `path-changed`,
    /// `probe-inconclusive`, or `unchanged`.
    pub action: String,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Orchestrates parse, expansion, change detection, and publishing for one
/// workspace root.
pub struct SyncEngine {
    config: MirrorConfig,
    root: PathBuf,
}

impl SyncEngine {
    pub fn new(config: MirrorConfig, root: impl Into<PathBuf>) -> Self {
        let engine = Self {
            config,
            root: root.into(),
        };
        info!(root = %engine.root.display(), "initializing sync engine");
        engine
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Execute one full mirroring run.
    pub async fn run(&self) -> Result<SyncStats, CoreError> {
        let mut stats = SyncStats {
            started_at: Utc::now().to_rfc3339(),
            ..Default::default()
        };

        let detector = ChangeDetector::new(&self.root, self.config.mirror.skip_unchanged_check);
        let executor = MirrorSync::new(&self.config, &self.root, self.config.mirror.dry_run);
        let expander = GlobExpander::new(&self.root);

        let mut queue = queue_from_map(&self.config.mirror.map);
        let mut expanded: HashSet<(String, String)> = HashSet::new();

        while let Some(line) = queue.pop_front() {
            let directive = match Directive::parse(&line) {
                Ok(directive) => directive,
                Err(e) => {
                    warn!(line = %line, error = %e, "skipping invalid mapping directive");
                    stats.invalid_count += 1;
                    continue;
                }
            };

            if directive.has_wildcards() {
                // A directory whose name itself contains `*` re-emits its
                // own line on expansion; expand each source/target pair
                // once. Distinct directives sharing a source still expand
                // independently.
                let key = (
                    directive.source_pattern.clone(),
                    directive.target_pattern.clone(),
                );
                if !expanded.insert(key) {
                    warn!(
                        source = %directive.source_pattern,
                        target = %directive.target_pattern,
                        "wildcard directive re-queued by its own expansion, dropping"
                    );
                    continue;
                }
                let lines = expander.expand(&directive)?;
                debug!(
                    pattern = %directive.source_pattern,
                    count = lines.len(),
                    "spliced expansion results into work queue"
                );
                stats.expanded_count += 1;
                for line in lines.into_iter().rev() {
                    queue.push_front(line);
                }
                continue;
            }

            let mapping = directive.into_concrete();
            let decision = detector.decide(&mapping).await?;
            stats.outcomes.push(MappingOutcome {
                source_dir: mapping.source_dir.clone(),
                target_branch: mapping.target_branch.clone(),
                action: decision.label().to_string(),
            });

            if !decision.should_sync() {
                info!(source_dir = %mapping.source_dir, "directory unchanged, skipping");
                stats.skipped_count += 1;
                continue;
            }

            info!(
                source_dir = %mapping.source_dir,
                target_branch = %mapping.target_branch,
                reason = decision.label(),
                "syncing directory to branch"
            );
            executor.sync(&mapping).await?;
            stats.synced_count += 1;
        }

        stats.completed_at = Some(Utc::now().to_rfc3339());
        info!(
            synced = stats.synced_count,
            skipped = stats.skipped_count,
            invalid = stats.invalid_count,
            "mirroring run completed"
        );
        Ok(stats)
    }

    /// Parse and expand the map without probing or publishing: the list of
    /// concrete mappings a run would consider, in processing order.
    pub fn resolve_mappings(&self) -> Result<Vec<ConcreteMapping>, CoreError> {
        let expander = GlobExpander::new(&self.root);
        let mut queue = queue_from_map(&self.config.mirror.map);
        let mut expanded: HashSet<(String, String)> = HashSet::new();
        let mut mappings = Vec::new();

        while let Some(line) = queue.pop_front() {
            let directive = match Directive::parse(&line) {
                Ok(directive) => directive,
                Err(e) => {
                    warn!(line = %line, error = %e, "skipping invalid mapping directive");
                    continue;
                }
            };
            if directive.has_wildcards() {
                let key = (
                    directive.source_pattern.clone(),
                    directive.target_pattern.clone(),
                );
                if !expanded.insert(key) {
                    continue;
                }
                for line in expander.expand(&directive)?.into_iter().rev() {
                    queue.push_front(line);
                }
                continue;
            }
            mappings.push(directive.into_concrete());
        }
        Ok(mappings)
    }
}

/// Seed the work queue from the multiline map input, dropping blank lines.
fn queue_from_map(map: &str) -> VecDeque<String> {
    map.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
