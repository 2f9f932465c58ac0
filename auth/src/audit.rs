//! Audit logging for step-up decisions.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Outcome of a step-up attempt or use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepUpOutcome {
    Granted,
    Denied,
    Expired,
}

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepUpAuditEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub principal: String,
    /// What the step-up was asked for ("confirm" for issuance, otherwise the
    /// request path the token was presented on).
    pub action: String,
    pub outcome: StepUpOutcome,
}

impl StepUpAuditEntry {
    pub fn new(principal: impl Into<String>, action: impl Into<String>, outcome: StepUpOutcome) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            principal: principal.into(),
            action: action.into(),
            outcome,
        }
    }
}

/// Thread-safe bounded audit log for step-up decisions.
#[derive(Debug)]
pub struct StepUpAudit {
    entries: RwLock<VecDeque<StepUpAuditEntry>>,
    max_entries: usize,
}

impl StepUpAudit {
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(max_entries.min(1024))),
            max_entries,
        }
    }

    pub fn record(&self, entry: StepUpAuditEntry) {
        let mut entries = self.entries.write();
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn record_outcome(
        &self,
        principal: &str,
        action: &str,
        outcome: StepUpOutcome,
    ) {
        self.record(StepUpAuditEntry::new(principal, action, outcome));
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<StepUpAuditEntry> {
        let entries = self.entries.read();
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_newest_entries_within_capacity() {
        let audit = StepUpAudit::with_capacity(3);
        for i in 0..5 {
            audit.record_outcome("Admin", &format!("action-{i}"), StepUpOutcome::Granted);
        }

        assert_eq!(audit.len(), 3);
        let recent = audit.recent(10);
        assert_eq!(recent[0].action, "action-4");
        assert_eq!(recent[2].action, "action-2");
    }

    #[test]
    fn recent_honors_limit() {
        let audit = StepUpAudit::with_capacity(100);
        for _ in 0..10 {
            audit.record_outcome("Admin", "confirm", StepUpOutcome::Denied);
        }
        assert_eq!(audit.recent(4).len(), 4);
    }
}
