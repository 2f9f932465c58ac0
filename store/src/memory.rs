//! In-memory storage backend.
//!
//! Backs every inventory collection with a [`DashMap`] and publishes one
//! [`ChangeEvent`] per mutation on a broadcast channel. Conditional writes
//! (`transition_unit`, `close_loan`, `remove_unit`) hold the map entry while
//! checking and mutating, so two racing writers serialize and exactly one of
//! them observes the expected state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use crate::core::*;

const EVENT_CAPACITY: usize = 256;

pub const COLLECTION_CATEGORIES: &str = "categories";
pub const COLLECTION_EMPLOYEES: &str = "employees";
pub const COLLECTION_TOOLS: &str = "tools";
pub const COLLECTION_UNITS: &str = "tool_units";
pub const COLLECTION_OUTWARD: &str = "outward";
pub const COLLECTION_HISTORY: &str = "history";

/// In-memory implementation of every collection store.
#[derive(Debug)]
pub struct MemoryStore {
    categories: DashMap<CategoryId, Category>,
    employees: DashMap<EmployeeId, Employee>,
    tools: DashMap<ToolId, ToolDefinition>,
    units: DashMap<UnitId, ToolUnit>,
    loans: DashMap<LoanId, LoanRecord>,
    history: DashMap<HistoryId, HistoryEntry>,
    events: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            categories: DashMap::new(),
            employees: DashMap::new(),
            tools: DashMap::new(),
            units: DashMap::new(),
            loans: DashMap::new(),
            history: DashMap::new(),
            events,
        }
    }

    /// Live subscription to storage mutations. Slow receivers observe
    /// `Lagged` rather than blocking writers.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Handle to the change feed, for wiring subscribers without holding the
    /// whole store.
    pub fn change_feed(&self) -> broadcast::Sender<ChangeEvent> {
        self.events.clone()
    }

    fn publish(&self, collection: &'static str, kind: ChangeKind, id: impl std::fmt::Display) {
        // send only fails when nobody is subscribed, which is fine.
        let _ = self.events.send(ChangeEvent::new(collection, kind, id));
    }
}

/// Newest-first ordering used by every listing (`created_at` descending),
/// matching what the admin screens expect.
fn sort_newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn create_category(&self, category: Category) -> StoreResult<Category> {
        self.categories
            .insert(category.id.clone(), category.clone());
        self.publish(COLLECTION_CATEGORIES, ChangeKind::Created, &category.id);
        Ok(category)
    }

    async fn get_category(&self, id: &CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.categories.get(id).map(|c| c.clone()))
    }

    async fn update_category(&self, id: &CategoryId, input: NewCategory) -> StoreResult<Category> {
        let mut entry = self
            .categories
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(COLLECTION_CATEGORIES, id))?;
        entry.category_name = input.category_name;
        entry.description = input.description;
        let updated = entry.clone();
        drop(entry);
        self.publish(COLLECTION_CATEGORIES, ChangeKind::Updated, id);
        Ok(updated)
    }

    async fn delete_category(&self, id: &CategoryId) -> StoreResult<bool> {
        let removed = self.categories.remove(id).is_some();
        if removed {
            self.publish(COLLECTION_CATEGORIES, ChangeKind::Deleted, id);
        }
        Ok(removed)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let mut all: Vec<Category> = self.categories.iter().map(|c| c.clone()).collect();
        sort_newest_first(&mut all, |c| c.created_at);
        Ok(all)
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn create_employee(&self, employee: Employee) -> StoreResult<Employee> {
        self.employees.insert(employee.id.clone(), employee.clone());
        self.publish(COLLECTION_EMPLOYEES, ChangeKind::Created, &employee.id);
        Ok(employee)
    }

    async fn get_employee(&self, id: &EmployeeId) -> StoreResult<Option<Employee>> {
        Ok(self.employees.get(id).map(|e| e.clone()))
    }

    async fn update_employee(&self, id: &EmployeeId, input: NewEmployee) -> StoreResult<Employee> {
        let mut entry = self
            .employees
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(COLLECTION_EMPLOYEES, id))?;
        entry.emp_id = input.emp_id;
        entry.emp_name = input.emp_name;
        entry.group = input.group;
        entry.destination = input.destination;
        let updated = entry.clone();
        drop(entry);
        self.publish(COLLECTION_EMPLOYEES, ChangeKind::Updated, id);
        Ok(updated)
    }

    async fn delete_employee(&self, id: &EmployeeId) -> StoreResult<bool> {
        let removed = self.employees.remove(id).is_some();
        if removed {
            self.publish(COLLECTION_EMPLOYEES, ChangeKind::Deleted, id);
        }
        Ok(removed)
    }

    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        let mut all: Vec<Employee> = self.employees.iter().map(|e| e.clone()).collect();
        sort_newest_first(&mut all, |e| e.created_at);
        Ok(all)
    }
}

#[async_trait]
impl ToolStore for MemoryStore {
    async fn create_tool(&self, tool: ToolDefinition) -> StoreResult<ToolDefinition> {
        self.tools.insert(tool.id.clone(), tool.clone());
        self.publish(COLLECTION_TOOLS, ChangeKind::Created, &tool.id);
        Ok(tool)
    }

    async fn get_tool(&self, id: &ToolId) -> StoreResult<Option<ToolDefinition>> {
        Ok(self.tools.get(id).map(|t| t.clone()))
    }

    async fn update_tool(&self, id: &ToolId, patch: ToolPatch) -> StoreResult<ToolDefinition> {
        let mut entry = self
            .tools
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(COLLECTION_TOOLS, id))?;
        entry.tool_name = patch.tool_name;
        entry.category_id = patch.category_id;
        entry.category_name = patch.category_name;
        entry.image_url = patch.image_url;
        let updated = entry.clone();
        drop(entry);
        self.publish(COLLECTION_TOOLS, ChangeKind::Updated, id);
        Ok(updated)
    }

    async fn set_total_quantity(&self, id: &ToolId, quantity: u32) -> StoreResult<ToolDefinition> {
        let mut entry = self
            .tools
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(COLLECTION_TOOLS, id))?;
        entry.total_quantity = quantity;
        let updated = entry.clone();
        drop(entry);
        self.publish(COLLECTION_TOOLS, ChangeKind::Updated, id);
        Ok(updated)
    }

    async fn delete_tool(&self, id: &ToolId) -> StoreResult<bool> {
        let removed = self.tools.remove(id).is_some();
        if removed {
            self.publish(COLLECTION_TOOLS, ChangeKind::Deleted, id);
        }
        Ok(removed)
    }

    async fn list_tools(&self) -> StoreResult<Vec<ToolDefinition>> {
        let mut all: Vec<ToolDefinition> = self.tools.iter().map(|t| t.clone()).collect();
        sort_newest_first(&mut all, |t| t.created_at);
        Ok(all)
    }

    async fn reserve_unit_ordinals(&self, id: &ToolId, count: u64) -> StoreResult<u64> {
        let mut entry = self
            .tools
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(COLLECTION_TOOLS, id))?;
        let first = entry.units_created + 1;
        entry.units_created += count;
        drop(entry);
        self.publish(COLLECTION_TOOLS, ChangeKind::Updated, id);
        Ok(first)
    }
}

#[async_trait]
impl UnitStore for MemoryStore {
    async fn insert_units(&self, units: Vec<ToolUnit>) -> StoreResult<()> {
        for unit in units {
            let id = unit.id.clone();
            self.units.insert(id.clone(), unit);
            self.publish(COLLECTION_UNITS, ChangeKind::Created, &id);
        }
        Ok(())
    }

    async fn get_unit(&self, id: &UnitId) -> StoreResult<Option<ToolUnit>> {
        Ok(self.units.get(id).map(|u| u.clone()))
    }

    async fn list_units(&self, tool_id: &ToolId) -> StoreResult<Vec<ToolUnit>> {
        let mut all: Vec<ToolUnit> = self
            .units
            .iter()
            .filter(|u| &u.tool_id == tool_id)
            .map(|u| u.clone())
            .collect();
        sort_newest_first(&mut all, |u| u.created_at);
        Ok(all)
    }

    async fn list_all_units(&self) -> StoreResult<Vec<ToolUnit>> {
        let mut all: Vec<ToolUnit> = self.units.iter().map(|u| u.clone()).collect();
        sort_newest_first(&mut all, |u| u.created_at);
        Ok(all)
    }

    async fn transition_unit(
        &self,
        id: &UnitId,
        expected: UnitStatus,
        expected_version: u64,
        next: UnitStatus,
    ) -> StoreResult<ToolUnit> {
        // The entry guard is held across check and write; concurrent callers
        // for the same unit serialize here.
        let mut entry = self
            .units
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(COLLECTION_UNITS, id))?;
        if entry.version != expected_version {
            debug!(unit = %id, expected_version, actual = entry.version, "unit version conflict");
            return Err(StoreError::VersionConflict {
                collection: COLLECTION_UNITS,
                id: id.to_string(),
                expected: expected_version,
                actual: entry.version,
            });
        }
        if entry.status != expected {
            debug!(unit = %id, %expected, actual = %entry.status, "unit status conflict");
            return Err(StoreError::StatusConflict {
                collection: COLLECTION_UNITS,
                id: id.to_string(),
                expected: expected.to_string(),
                actual: entry.status.to_string(),
            });
        }
        entry.status = next;
        entry.version += 1;
        let updated = entry.clone();
        drop(entry);
        self.publish(COLLECTION_UNITS, ChangeKind::Updated, id);
        Ok(updated)
    }

    async fn remove_unit(&self, id: &UnitId, expected: UnitStatus) -> StoreResult<()> {
        let removed = self.units.remove_if(id, |_, unit| unit.status == expected);
        match removed {
            Some(_) => {
                self.publish(COLLECTION_UNITS, ChangeKind::Deleted, id);
                Ok(())
            }
            None => match self.units.get(id) {
                Some(unit) => Err(StoreError::StatusConflict {
                    collection: COLLECTION_UNITS,
                    id: id.to_string(),
                    expected: expected.to_string(),
                    actual: unit.status.to_string(),
                }),
                None => Err(StoreError::not_found(COLLECTION_UNITS, id)),
            },
        }
    }

    async fn purge_units(&self, tool_id: &ToolId) -> StoreResult<usize> {
        let ids: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| &u.tool_id == tool_id)
            .map(|u| u.id.clone())
            .collect();
        let mut removed = 0;
        for id in ids {
            if self.units.remove(&id).is_some() {
                self.publish(COLLECTION_UNITS, ChangeKind::Deleted, &id);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn create_loan(&self, loan: LoanRecord) -> StoreResult<LoanRecord> {
        self.loans.insert(loan.id.clone(), loan.clone());
        self.publish(COLLECTION_OUTWARD, ChangeKind::Created, &loan.id);
        Ok(loan)
    }

    async fn get_loan(&self, id: &LoanId) -> StoreResult<Option<LoanRecord>> {
        Ok(self.loans.get(id).map(|l| l.clone()))
    }

    async fn list_loans(&self, status: Option<LoanStatus>) -> StoreResult<Vec<LoanRecord>> {
        let mut all: Vec<LoanRecord> = self
            .loans
            .iter()
            .filter(|l| status.is_none_or(|s| l.status == s))
            .map(|l| l.clone())
            .collect();
        sort_newest_first(&mut all, |l| l.created_at);
        Ok(all)
    }

    async fn open_loan_for_unit(&self, unit_id: &UnitId) -> StoreResult<Option<LoanRecord>> {
        Ok(self
            .loans
            .iter()
            .find(|l| l.is_open() && &l.unit_id == unit_id)
            .map(|l| l.clone()))
    }

    async fn has_open_loans(&self, emp_id: &str) -> StoreResult<bool> {
        Ok(self.loans.iter().any(|l| l.is_open() && l.emp_id == emp_id))
    }

    async fn close_loan(
        &self,
        id: &LoanId,
        returned_date: DateTime<Utc>,
        return_remarks: Option<String>,
    ) -> StoreResult<LoanRecord> {
        let mut entry = self
            .loans
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(COLLECTION_OUTWARD, id))?;
        if entry.status != LoanStatus::Issued {
            return Err(StoreError::StatusConflict {
                collection: COLLECTION_OUTWARD,
                id: id.to_string(),
                expected: LoanStatus::Issued.to_string(),
                actual: entry.status.to_string(),
            });
        }
        entry.status = LoanStatus::Returned;
        entry.returned_date = Some(returned_date);
        entry.return_remarks = return_remarks;
        let closed = entry.clone();
        drop(entry);
        self.publish(COLLECTION_OUTWARD, ChangeKind::Updated, id);
        Ok(closed)
    }

    async fn reopen_loan(&self, id: &LoanId) -> StoreResult<LoanRecord> {
        let mut entry = self
            .loans
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(COLLECTION_OUTWARD, id))?;
        entry.status = LoanStatus::Issued;
        entry.returned_date = None;
        entry.return_remarks = None;
        let reopened = entry.clone();
        drop(entry);
        self.publish(COLLECTION_OUTWARD, ChangeKind::Updated, id);
        Ok(reopened)
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn append_history(&self, entry: HistoryEntry) -> StoreResult<HistoryEntry> {
        self.history.insert(entry.id.clone(), entry.clone());
        self.publish(COLLECTION_HISTORY, ChangeKind::Created, &entry.id);
        Ok(entry)
    }

    async fn list_history(&self) -> StoreResult<Vec<HistoryEntry>> {
        let mut all: Vec<HistoryEntry> = self.history.iter().map(|h| h.clone()).collect();
        sort_newest_first(&mut all, |h| h.created_at);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    async fn tool_with_category(store: &MemoryStore) -> ToolDefinition {
        let category = Category::new(NewCategory {
            category_name: "Hand Tools".into(),
            description: None,
        });
        let tool = ToolDefinition::new(
            NewTool {
                tool_name: "Hammer".into(),
                category_id: category.id.clone(),
                total_quantity: 0,
                image_url: None,
            },
            category.category_name.clone(),
        );
        store.create_category(category).await.unwrap();
        store.create_tool(tool.clone()).await.unwrap();
        tool
    }

    #[tokio::test]
    async fn transition_bumps_version_and_checks_expected_status() {
        let store = MemoryStore::new();
        let tool = tool_with_category(&store).await;
        let unit = ToolUnit::new(&tool, "HAMMERQ1");
        store.insert_units(vec![unit.clone()]).await.unwrap();

        let issued = store
            .transition_unit(&unit.id, UnitStatus::Available, 0, UnitStatus::Issued)
            .await
            .unwrap();
        assert_eq!(issued.status, UnitStatus::Issued);
        assert_eq!(issued.version, 1);

        // Same guard again: stale version and wrong status both refuse.
        let err = store
            .transition_unit(&unit.id, UnitStatus::Available, 0, UnitStatus::Issued)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        let err = store
            .transition_unit(&unit.id, UnitStatus::Available, 1, UnitStatus::Issued)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StatusConflict { .. }));
    }

    #[tokio::test]
    async fn concurrent_transitions_admit_exactly_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let tool = tool_with_category(&store).await;
        let unit = ToolUnit::new(&tool, "HAMMERQ1");
        store.insert_units(vec![unit.clone()]).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let id = unit.id.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .transition_unit(&id, UnitStatus::Available, 0, UnitStatus::Issued)
                    .await
            }));
        }

        let mut wins = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1, "exactly one concurrent transition may succeed");
    }

    #[tokio::test]
    async fn remove_unit_refuses_unexpected_status() {
        let store = MemoryStore::new();
        let tool = tool_with_category(&store).await;
        let unit = ToolUnit::new(&tool, "HAMMERQ1");
        store.insert_units(vec![unit.clone()]).await.unwrap();
        store
            .transition_unit(&unit.id, UnitStatus::Available, 0, UnitStatus::Issued)
            .await
            .unwrap();

        let err = store
            .remove_unit(&unit.id, UnitStatus::Available)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StatusConflict { .. }));
        assert!(store.get_unit(&unit.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn close_loan_is_single_shot() {
        let store = MemoryStore::new();
        let tool = tool_with_category(&store).await;
        let unit = ToolUnit::new(&tool, "HAMMERQ1");
        let employee = Employee::new(NewEmployee {
            emp_id: "E1".into(),
            emp_name: "Asha".into(),
            group: "Fitting".into(),
            destination: "Bay 4".into(),
        });
        let loan = LoanRecord::new(&employee, &unit, None);
        store.create_loan(loan.clone()).await.unwrap();

        let closed = store
            .close_loan(&loan.id, Utc::now(), Some("fine".into()))
            .await
            .unwrap();
        assert_eq!(closed.status, LoanStatus::Returned);
        assert_eq!(closed.return_remarks.as_deref(), Some("fine"));

        let err = store
            .close_loan(&loan.id, Utc::now(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StatusConflict { .. }));
    }

    #[tokio::test]
    async fn reserve_ordinals_is_monotonic() {
        let store = MemoryStore::new();
        let tool = tool_with_category(&store).await;

        assert_eq!(store.reserve_unit_ordinals(&tool.id, 3).await.unwrap(), 1);
        assert_eq!(store.reserve_unit_ordinals(&tool.id, 2).await.unwrap(), 4);
        let stored = store.get_tool(&tool.id).await.unwrap().unwrap();
        assert_eq!(stored.units_created, 5);
    }

    #[tokio::test]
    async fn mutations_reach_subscribers() {
        let store = MemoryStore::new();
        let mut feed = store.subscribe();
        let tool = tool_with_category(&store).await;

        let event = feed.recv().await.unwrap();
        assert_eq!(event.collection, COLLECTION_CATEGORIES);
        assert_eq!(event.kind, ChangeKind::Created);

        let event = feed.recv().await.unwrap();
        assert_eq!(event.collection, COLLECTION_TOOLS);
        assert_eq!(event.id, tool.id.to_string());
    }
}
