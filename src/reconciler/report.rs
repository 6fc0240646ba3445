use std::fmt;

/// What happened to a single group or check during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    /// An existing group was found by name and reused as-is.
    Matched,
    Skipped(String),
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created => write!(f, "created"),
            Outcome::Updated => write!(f, "updated"),
            Outcome::Matched => write!(f, "matched"),
            Outcome::Skipped(reason) => write!(f, "skipped: {reason}"),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// `None` when a malformed entry did not even carry a usable name.
    pub name: Option<String>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub name: String,
    pub group_id: i64,
    pub outcome: Outcome,
    pub checks: Vec<CheckReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryCounts {
    pub created: usize,
    pub updated: usize,
    pub matched: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SummaryCounts {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Matched => self.matched += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Per-entity results of a reconciliation run, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub groups: Vec<GroupReport>,
}

impl RunSummary {
    pub fn group_counts(&self) -> SummaryCounts {
        let mut counts = SummaryCounts::default();
        for group in &self.groups {
            counts.record(&group.outcome);
        }
        counts
    }

    pub fn check_counts(&self) -> SummaryCounts {
        let mut counts = SummaryCounts::default();
        for check in self.checks() {
            counts.record(&check.outcome);
        }
        counts
    }

    pub fn checks(&self) -> impl Iterator<Item = &CheckReport> {
        self.groups.iter().flat_map(|group| group.checks.iter())
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckReport> {
        self.checks()
            .filter(|check| matches!(check.outcome, Outcome::Failed(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed_checks().next().is_some()
    }
}
