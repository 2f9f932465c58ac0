//! Append-only transaction ledger.
//!
//! One entry per completed return, written by the workflow and never updated
//! or deleted afterwards. Reads are newest-first and optionally filtered for
//! the history report.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crib_store::{HistoryEntry, HistoryStore, LoanRecord, ToolId};
use serde::Deserialize;

use crate::error::CribResult;

/// Query filter for the history report. All fields are conjunctive; an empty
/// filter returns everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryFilter {
    /// Employee badge number, exact match.
    pub emp_id: Option<String>,
    pub tool_id: Option<ToolId>,
    /// Inclusive lower bound on the return date.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the return date.
    pub to: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    fn matches(&self, entry: &HistoryEntry) -> bool {
        if let Some(emp_id) = &self.emp_id {
            if &entry.emp_id != emp_id {
                return false;
            }
        }
        if let Some(tool_id) = &self.tool_id {
            if &entry.tool_id != tool_id {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.returned_date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.returned_date > to {
                return false;
            }
        }
        true
    }
}

pub struct HistoryLedger {
    history: Arc<dyn HistoryStore>,
}

impl HistoryLedger {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self { history }
    }

    /// Snapshots a just-closed loan into the ledger.
    pub async fn append(
        &self,
        loan: &LoanRecord,
        returned_date: DateTime<Utc>,
    ) -> CribResult<HistoryEntry> {
        let entry = HistoryEntry::from_closed_loan(loan, returned_date);
        Ok(self.history.append_history(entry).await?)
    }

    /// Entries matching the filter, newest first.
    pub async fn list(&self, filter: &HistoryFilter) -> CribResult<Vec<HistoryEntry>> {
        let mut entries = self.history.list_history().await?;
        entries.retain(|entry| filter.matches(entry));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use crib_store::{
        CategoryId, Employee, HistoryId, LoanId, LoanStatus, MemoryStore, NewEmployee, UnitId,
    };

    use super::*;

    fn closed_loan(emp_id: &str, tool_id: &ToolId, issued: DateTime<Utc>) -> LoanRecord {
        let employee = Employee::new(NewEmployee {
            emp_id: emp_id.into(),
            emp_name: "Asha".into(),
            group: "Fitting".into(),
            destination: "Bay 4".into(),
        });
        LoanRecord {
            id: LoanId::new(),
            emp_id: employee.emp_id,
            emp_name: employee.emp_name,
            group: employee.group,
            destination: employee.destination,
            tool_id: tool_id.clone(),
            tool_name: "Hammer".into(),
            unit_id: UnitId::new(),
            unit_code: "HAMMERQ1".into(),
            category_id: CategoryId::new(),
            category_name: "Hand Tools".into(),
            issued_date: issued,
            status: LoanStatus::Issued,
            remarks: None,
            returned_date: None,
            return_remarks: None,
            created_at: issued,
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn filter_narrows_by_employee_tool_and_window() {
        let store = Arc::new(MemoryStore::new());
        let ledger = HistoryLedger::new(store.clone());
        let hammer = ToolId::new();
        let wrench = ToolId::new();

        ledger
            .append(&closed_loan("E1", &hammer, day(1)), day(3))
            .await
            .unwrap();
        ledger
            .append(&closed_loan("E2", &hammer, day(2)), day(8))
            .await
            .unwrap();
        ledger
            .append(&closed_loan("E1", &wrench, day(5)), day(12))
            .await
            .unwrap();

        let all = ledger.list(&HistoryFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let by_emp = ledger
            .list(&HistoryFilter {
                emp_id: Some("E1".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_emp.len(), 2);
        assert!(by_emp.iter().all(|e| e.emp_id == "E1"));

        let by_tool = ledger
            .list(&HistoryFilter {
                tool_id: Some(wrench.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_tool.len(), 1);

        let by_window = ledger
            .list(&HistoryFilter {
                from: Some(day(4)),
                to: Some(day(10)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_window.len(), 1);
        assert_eq!(by_window[0].emp_id, "E2");
    }

    #[tokio::test]
    async fn entries_come_back_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let ledger = HistoryLedger::new(store.clone());
        let tool = ToolId::new();

        for d in 1..=3 {
            ledger
                .append(&closed_loan("E1", &tool, day(d)), day(d + 1))
                .await
                .unwrap();
        }

        let all = ledger.list(&HistoryFilter::default()).await.unwrap();
        let ids: Vec<&HistoryId> = all.iter().map(|e| &e.id).collect();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(ids.len(), 3);
    }
}
