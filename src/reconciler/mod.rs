//! Drives a desired-state document to convergence against a [`RemoteStore`].
//!
//! Groups are handled one at a time in document order. A group is always
//! resolved to a remote identifier (found by name, or created) before any of
//! its checks are submitted. Checks are then created or replaced by name.
//! Nothing is ever deleted.

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::{CheckEntry, DesiredEntry, GroupSpec, RemoteCheck, RemoteGroup};
use crate::remote::RemoteStore;

mod locks;
mod report;

use locks::NameLocks;
pub use report::{CheckReport, GroupReport, Outcome, RunSummary, SummaryCounts};

/// Conditions that stop the whole run. Everything reconciled before the
/// failure stays in place; `summary` describes it.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Failed to resolve group '{group}': {reason}")]
    GroupUnresolved {
        group: String,
        reason: String,
        summary: RunSummary,
    },
    #[error("Conflict: {count} remote groups are named '{group}'")]
    DuplicateGroup {
        group: String,
        count: usize,
        summary: RunSummary,
    },
}

impl ReconcileError {
    pub fn summary(&self) -> &RunSummary {
        match self {
            ReconcileError::GroupUnresolved { summary, .. }
            | ReconcileError::DuplicateGroup { summary, .. } => summary,
        }
    }
}

enum GroupResolution {
    Resolved { id: i64, outcome: Outcome },
    Unresolved(String),
    Duplicate(usize),
}

/// Looks up the single record called `name`.
/// `Err(count)` when the remote side holds more than one.
fn find_by_name<'a, T>(
    records: &'a [T],
    name: &str,
    name_of: impl Fn(&T) -> &str,
) -> Result<Option<&'a T>, usize> {
    let mut matches = records.iter().filter(|record| name_of(*record) == name);
    let first = matches.next();
    let extra = matches.count();
    if extra > 0 {
        return Err(extra + 1);
    }
    Ok(first)
}

pub struct Reconciler<S> {
    store: S,
    locks: NameLocks,
    max_concurrent_checks: usize,
}

impl<S: RemoteStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: NameLocks::new(),
            max_concurrent_checks: 1,
        }
    }

    /// Allows up to `limit` checks of the same group to be in flight at once.
    /// Submissions sharing a name are still serialized.
    pub fn with_max_concurrent_checks(mut self, limit: usize) -> Self {
        self.max_concurrent_checks = limit.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn run(&self, groups: &[GroupSpec]) -> Result<RunSummary, ReconcileError> {
        let mut summary = RunSummary::default();

        for group in groups {
            let (group_id, outcome) = match self.resolve_group(group).await {
                GroupResolution::Resolved { id, outcome } => (id, outcome),
                GroupResolution::Unresolved(reason) => {
                    error!(
                        group = %group.name,
                        reason = %reason,
                        "Failed to extract group id. Aborting run."
                    );
                    return Err(ReconcileError::GroupUnresolved {
                        group: group.name.clone(),
                        reason,
                        summary,
                    });
                }
                GroupResolution::Duplicate(count) => {
                    error!(
                        group = %group.name,
                        count,
                        "Group name is not unique on the remote side. Aborting run."
                    );
                    return Err(ReconcileError::DuplicateGroup {
                        group: group.name.clone(),
                        count,
                        summary,
                    });
                }
            };

            let checks: Vec<CheckReport> = stream::iter(group.entries.iter())
                .map(|entry| self.reconcile_entry(entry, group_id))
                .buffered(self.max_concurrent_checks)
                .collect()
                .await;

            summary.groups.push(GroupReport {
                name: group.name.clone(),
                group_id,
                outcome,
                checks,
            });
        }

        Ok(summary)
    }

    async fn resolve_group(&self, group: &GroupSpec) -> GroupResolution {
        let existing = match self.store.list_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                warn!(
                    group = %group.name,
                    error = %e,
                    "Failed to list groups. Treating as none found."
                );
                Vec::new()
            }
        };

        match find_by_name(&existing, &group.name, |g: &RemoteGroup| g.name.as_str()) {
            Err(count) => GroupResolution::Duplicate(count),
            Ok(Some(found)) => match found.resolved_id() {
                Some(id) => {
                    info!(group = %group.name, id, "Group already exists.");
                    if found.public.is_some_and(|public| public != group.public) {
                        warn!(
                            group = %group.name,
                            id,
                            "Group visibility differs from the document. Leaving it unchanged."
                        );
                    }
                    GroupResolution::Resolved {
                        id,
                        outcome: Outcome::Matched,
                    }
                }
                None => GroupResolution::Unresolved(
                    "existing group has no identifier".to_string(),
                ),
            },
            Ok(None) => match self.store.create_group(&group.name, group.public).await {
                Ok(created) => match created.resolved_id() {
                    Some(id) => {
                        info!(group = %group.name, id, "Created group.");
                        GroupResolution::Resolved {
                            id,
                            outcome: Outcome::Created,
                        }
                    }
                    None => GroupResolution::Unresolved(
                        "create succeeded but no identifier was returned".to_string(),
                    ),
                },
                Err(e) => GroupResolution::Unresolved(e.to_string()),
            },
        }
    }

    async fn reconcile_entry(&self, entry: &DesiredEntry, group_id: i64) -> CheckReport {
        match entry {
            DesiredEntry::Valid(check) => CheckReport {
                name: Some(check.name.clone()),
                outcome: self.reconcile_check(check.clone(), group_id).await,
            },
            DesiredEntry::Malformed { name, reason } => {
                error!(
                    check = ?name,
                    reason = %reason,
                    "Skipping entry that is not a valid check."
                );
                CheckReport {
                    name: name.clone(),
                    outcome: Outcome::Skipped(reason.clone()),
                }
            }
        }
    }

    async fn reconcile_check(&self, entry: CheckEntry, group_id: i64) -> Outcome {
        if let Some(declared) = entry.group_id.filter(|declared| *declared != group_id) {
            warn!(
                check = %entry.name,
                declared,
                group_id,
                "Ignoring group_id set in the document."
            );
        }
        let spec = entry.resolve(group_id);
        debug!(check = ?spec, "Resolved check.");

        let _guard = self.locks.acquire(&spec.name).await;

        let existing = match self.store.list_checks().await {
            Ok(checks) => checks,
            Err(e) => {
                error!(check = %spec.name, error = %e, "Failed to list checks.");
                return Outcome::Failed(format!("listing checks failed: {e}"));
            }
        };

        match find_by_name(&existing, &spec.name, |c: &RemoteCheck| c.name.as_str()) {
            Err(count) => {
                error!(check = %spec.name, count, "Check name is not unique on the remote side.");
                Outcome::Failed(format!("{count} remote checks share this name"))
            }
            Ok(Some(found)) => {
                info!(check = %spec.name, id = found.id, "Check already exists. Replacing.");
                match self.store.update_check(found.id, &spec.to_body()).await {
                    Ok(_) => Outcome::Updated,
                    Err(e) => {
                        error!(
                            check = %spec.name,
                            id = found.id,
                            error = %e,
                            "Failed to update check."
                        );
                        Outcome::Failed(e.to_string())
                    }
                }
            }
            Ok(None) => match self.store.create_check(&spec).await {
                Ok(()) => {
                    info!(check = %spec.name, group_id, "Created check.");
                    Outcome::Created
                }
                Err(e) => {
                    error!(check = %spec.name, error = %e, "Failed to create check.");
                    Outcome::Failed(e.to_string())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_name_first_and_only() {
        let names = ["a", "b", "c"];
        assert_eq!(find_by_name(&names, "b", |n| *n), Ok(Some(&"b")));
        assert_eq!(find_by_name(&names, "z", |n| *n), Ok(None));
    }

    #[test]
    fn test_find_by_name_reports_duplicates() {
        let names = ["a", "b", "a", "a"];
        assert_eq!(find_by_name(&names, "a", |n| *n), Err(3));
    }
}
