//! Report types shared by batch operations and the CLI.
//!
//! Reports are plain data: they carry the message the grader should see,
//! including any captured external-tool output, and never the error objects
//! themselves.

/// What happened to one student during a batch step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The step changed something (created, removed, installed, extracted).
    Applied(String),
    /// Nothing to do; the desired state already held or the item was not eligible.
    Skipped(String),
    /// The step failed; the message includes the underlying diagnostics verbatim.
    Failed(String),
}

impl ItemOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ItemOutcome::Failed(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ItemOutcome::Applied(msg) | ItemOutcome::Skipped(msg) | ItemOutcome::Failed(msg) => {
                msg
            }
        }
    }
}

/// Outcome for a single student (or archive) in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub student: String,
    pub outcome: ItemOutcome,
}

/// Ordered record of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    /// One entry per processed item, in processing order.
    pub items: Vec<ItemReport>,
    /// True when a fail-fast batch stopped at a failure.
    pub halted: bool,
}

impl BatchReport {
    pub fn push(&mut self, student: impl Into<String>, outcome: ItemOutcome) {
        self.items.push(ItemReport {
            student: student.into(),
            outcome,
        });
    }

    pub fn has_failures(&self) -> bool {
        self.halted || self.items.iter().any(|item| item.outcome.is_failure())
    }

    /// Students (or archive names) that were processed, in order.
    pub fn processed(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.student.as_str()).collect()
    }

    pub fn failed(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| item.outcome.is_failure())
            .map(|item| item.student.as_str())
            .collect()
    }
}
