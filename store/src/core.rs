// core.rs
//
// Core types for the crib store.
// Contains all traits, record types, error types, and IDs for the inventory
// collections.
//
// Structure:
// 1. IDs and shared error type
// 2. Reference records (categories, employees)
// 3. Tool definitions and tool units
// 4. Loans ("outward") and history
// 5. Change feed

use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// PART 1: IDs and shared error type
// ============================================================================

macro_rules! document_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

document_id!(
    /// Identifier of a tool category document.
    CategoryId
);
document_id!(
    /// Identifier of an employee document.
    EmployeeId
);
document_id!(
    /// Identifier of a tool definition document.
    ToolId
);
document_id!(
    /// Identifier of a tool unit document.
    UnitId
);
document_id!(
    /// Identifier of a loan ("outward") document.
    LoanId
);
document_id!(
    /// Identifier of a history document.
    HistoryId
);

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type shared by all collection stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{collection} document not found: {id}")]
    NotFound {
        collection: &'static str,
        id: String,
    },

    /// A conditional write found the document in a different status than the
    /// caller expected. The caller's view of the document is stale.
    #[error("{collection} {id} is '{actual}', expected '{expected}'")]
    StatusConflict {
        collection: &'static str,
        id: String,
        expected: String,
        actual: String,
    },

    /// A version-guarded write lost the race to another writer.
    #[error("{collection} {id} was modified concurrently (version {actual}, expected {expected})")]
    VersionConflict {
        collection: &'static str,
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("storage error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(collection: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            collection,
            id: id.to_string(),
        }
    }
}

// ============================================================================
// PART 2: Reference records (categories, employees)
// ============================================================================

/// A tool category ("Hand Tools", "Power Tools", ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub category_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input payload for creating or replacing a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub category_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Category {
    pub fn new(input: NewCategory) -> Self {
        Self {
            id: CategoryId::new(),
            category_name: input.category_name,
            description: input.description,
            created_at: Utc::now(),
        }
    }
}

/// An employee who can borrow tool units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    /// Badge number, distinct from the document id.
    pub emp_id: String,
    pub emp_name: String,
    pub group: String,
    pub destination: String,
    pub created_at: DateTime<Utc>,
}

/// Input payload for creating or replacing an employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmployee {
    pub emp_id: String,
    pub emp_name: String,
    pub group: String,
    pub destination: String,
}

impl Employee {
    pub fn new(input: NewEmployee) -> Self {
        Self {
            id: EmployeeId::new(),
            emp_id: input.emp_id,
            emp_name: input.emp_name,
            group: input.group,
            destination: input.destination,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait CategoryStore: Send + Sync + 'static {
    async fn create_category(&self, category: Category) -> StoreResult<Category>;
    async fn get_category(&self, id: &CategoryId) -> StoreResult<Option<Category>>;
    /// Replaces name/description, keeping id and created_at.
    async fn update_category(&self, id: &CategoryId, input: NewCategory) -> StoreResult<Category>;
    async fn delete_category(&self, id: &CategoryId) -> StoreResult<bool>;
    /// All categories, newest first.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
}

#[async_trait]
pub trait EmployeeStore: Send + Sync + 'static {
    async fn create_employee(&self, employee: Employee) -> StoreResult<Employee>;
    async fn get_employee(&self, id: &EmployeeId) -> StoreResult<Option<Employee>>;
    async fn update_employee(&self, id: &EmployeeId, input: NewEmployee) -> StoreResult<Employee>;
    async fn delete_employee(&self, id: &EmployeeId) -> StoreResult<bool>;
    /// All employees, newest first.
    async fn list_employees(&self) -> StoreResult<Vec<Employee>>;
}

// ============================================================================
// PART 3: Tool definitions and tool units
// ============================================================================

/// A named kind of tool with a declared quantity of physical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub id: ToolId,
    pub tool_name: String,
    pub category_id: CategoryId,
    /// Denormalized for display, refreshed when the category changes.
    pub category_name: String,
    pub total_quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Lifetime count of units ever created for this definition. Unit codes
    /// take their ordinal from this counter, never from a live unit count, so
    /// codes stay unique across shrink/regrow cycles.
    #[serde(default)]
    pub units_created: u64,
    pub created_at: DateTime<Utc>,
}

/// Input payload for creating a tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTool {
    pub tool_name: String,
    pub category_id: CategoryId,
    pub total_quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ToolDefinition {
    pub fn new(input: NewTool, category_name: impl Into<String>) -> Self {
        Self {
            id: ToolId::new(),
            tool_name: input.tool_name,
            category_id: input.category_id,
            category_name: category_name.into(),
            total_quantity: input.total_quantity,
            image_url: input.image_url,
            units_created: 0,
            created_at: Utc::now(),
        }
    }
}

/// Full-replace payload for updating a tool definition's descriptive fields.
/// Quantity changes go through the registry, not through this patch.
#[derive(Debug, Clone)]
pub struct ToolPatch {
    pub tool_name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub image_url: Option<String>,
}

/// Status of one physical tool unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Available,
    Issued,
    Maintenance,
}

impl Display for UnitStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnitStatus::Available => "available",
            UnitStatus::Issued => "issued",
            UnitStatus::Maintenance => "maintenance",
        };
        f.write_str(s)
    }
}

/// One physical, individually tracked instance of a tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUnit {
    pub id: UnitId,
    pub tool_id: ToolId,
    pub tool_name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    /// Human-readable code like `HAMMERQ3`, unique for the lifetime of the
    /// owning definition.
    pub unit_code: String,
    pub status: UnitStatus,
    /// Optimistic-concurrency token, bumped on every write.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl ToolUnit {
    pub fn new(tool: &ToolDefinition, unit_code: impl Into<String>) -> Self {
        Self {
            id: UnitId::new(),
            tool_id: tool.id.clone(),
            tool_name: tool.tool_name.clone(),
            category_id: tool.category_id.clone(),
            category_name: tool.category_name.clone(),
            unit_code: unit_code.into(),
            status: UnitStatus::Available,
            version: 0,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait ToolStore: Send + Sync + 'static {
    async fn create_tool(&self, tool: ToolDefinition) -> StoreResult<ToolDefinition>;
    async fn get_tool(&self, id: &ToolId) -> StoreResult<Option<ToolDefinition>>;
    async fn update_tool(&self, id: &ToolId, patch: ToolPatch) -> StoreResult<ToolDefinition>;
    /// Sets the declared quantity after the registry has reconciled units.
    async fn set_total_quantity(&self, id: &ToolId, quantity: u32) -> StoreResult<ToolDefinition>;
    async fn delete_tool(&self, id: &ToolId) -> StoreResult<bool>;
    /// All tool definitions, newest first.
    async fn list_tools(&self) -> StoreResult<Vec<ToolDefinition>>;
    /// Atomically advances the definition's lifetime unit counter by `count`
    /// and returns the first reserved ordinal (1-based).
    async fn reserve_unit_ordinals(&self, id: &ToolId, count: u64) -> StoreResult<u64>;
}

#[async_trait]
pub trait UnitStore: Send + Sync + 'static {
    async fn insert_units(&self, units: Vec<ToolUnit>) -> StoreResult<()>;
    async fn get_unit(&self, id: &UnitId) -> StoreResult<Option<ToolUnit>>;
    /// Units of one definition, newest first.
    async fn list_units(&self, tool_id: &ToolId) -> StoreResult<Vec<ToolUnit>>;
    /// All units, newest first.
    async fn list_all_units(&self) -> StoreResult<Vec<ToolUnit>>;
    /// Version-guarded status transition. Fails with `StatusConflict` when the
    /// unit is not in `expected` status and with `VersionConflict` when another
    /// writer got there first; on success the stored version is bumped and the
    /// updated unit returned.
    async fn transition_unit(
        &self,
        id: &UnitId,
        expected: UnitStatus,
        expected_version: u64,
        next: UnitStatus,
    ) -> StoreResult<ToolUnit>;
    /// Deletes the unit only while it is in `expected` status.
    async fn remove_unit(&self, id: &UnitId, expected: UnitStatus) -> StoreResult<()>;
    /// Unconditionally deletes every unit of a definition. Callers must have
    /// verified that nothing is issued.
    async fn purge_units(&self, tool_id: &ToolId) -> StoreResult<usize>;
}

// ============================================================================
// PART 4: Loans ("outward") and history
// ============================================================================

/// Status of a loan record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Issued,
    Returned,
}

impl Display for LoanStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LoanStatus::Issued => "issued",
            LoanStatus::Returned => "returned",
        };
        f.write_str(s)
    }
}

/// One borrowing of exactly one tool unit by one employee.
///
/// Employee and tool fields are snapshots taken at issue time; they are not
/// re-synced if the source records change later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: LoanId,
    pub emp_id: String,
    pub emp_name: String,
    pub group: String,
    pub destination: String,
    pub tool_id: ToolId,
    pub tool_name: String,
    pub unit_id: UnitId,
    pub unit_code: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub issued_date: DateTime<Utc>,
    pub status: LoanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LoanRecord {
    pub fn new(employee: &Employee, unit: &ToolUnit, remarks: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: LoanId::new(),
            emp_id: employee.emp_id.clone(),
            emp_name: employee.emp_name.clone(),
            group: employee.group.clone(),
            destination: employee.destination.clone(),
            tool_id: unit.tool_id.clone(),
            tool_name: unit.tool_name.clone(),
            unit_id: unit.id.clone(),
            unit_code: unit.unit_code.clone(),
            category_id: unit.category_id.clone(),
            category_name: unit.category_name.clone(),
            issued_date: now,
            status: LoanStatus::Issued,
            remarks,
            returned_date: None,
            return_remarks: None,
            created_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == LoanStatus::Issued
    }
}

/// Immutable snapshot of a closed loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryId,
    pub tool_id: ToolId,
    pub tool_name: String,
    pub unit_id: UnitId,
    pub unit_code: String,
    pub emp_id: String,
    pub emp_name: String,
    pub group: String,
    pub destination: String,
    pub issued_date: DateTime<Utc>,
    pub returned_date: DateTime<Utc>,
    /// Whole days between issue and return, rounded up, floored at zero.
    pub duration_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Builds the ledger snapshot for a loan that has just been closed.
    pub fn from_closed_loan(loan: &LoanRecord, returned_date: DateTime<Utc>) -> Self {
        Self {
            id: HistoryId::new(),
            tool_id: loan.tool_id.clone(),
            tool_name: loan.tool_name.clone(),
            unit_id: loan.unit_id.clone(),
            unit_code: loan.unit_code.clone(),
            emp_id: loan.emp_id.clone(),
            emp_name: loan.emp_name.clone(),
            group: loan.group.clone(),
            destination: loan.destination.clone(),
            issued_date: loan.issued_date,
            returned_date,
            duration_days: duration_days(loan.issued_date, returned_date),
            remarks: loan.return_remarks.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Whole days between two instants, rounded up. Same-instant returns zero;
/// a negative span (clock skew) is clamped to zero rather than going negative.
pub fn duration_days(issued: DateTime<Utc>, returned: DateTime<Utc>) -> i64 {
    const DAY_SECS: i64 = 24 * 60 * 60;
    let secs = (returned - issued).num_seconds();
    if secs <= 0 {
        return 0;
    }
    (secs + DAY_SECS - 1) / DAY_SECS
}

#[async_trait]
pub trait LoanStore: Send + Sync + 'static {
    async fn create_loan(&self, loan: LoanRecord) -> StoreResult<LoanRecord>;
    async fn get_loan(&self, id: &LoanId) -> StoreResult<Option<LoanRecord>>;
    /// Loans, newest first, optionally filtered by status.
    async fn list_loans(&self, status: Option<LoanStatus>) -> StoreResult<Vec<LoanRecord>>;
    /// The open loan referencing a unit, if any. At most one exists.
    async fn open_loan_for_unit(&self, unit_id: &UnitId) -> StoreResult<Option<LoanRecord>>;
    /// True if the employee holds at least one open loan.
    async fn has_open_loans(&self, emp_id: &str) -> StoreResult<bool>;
    /// Conditionally closes an open loan, stamping the return timestamp and
    /// remarks. Fails with `StatusConflict` when the loan is already returned.
    async fn close_loan(
        &self,
        id: &LoanId,
        returned_date: DateTime<Utc>,
        return_remarks: Option<String>,
    ) -> StoreResult<LoanRecord>;
    /// Compensation path: reopens a loan closed earlier in a failed
    /// multi-write transition.
    async fn reopen_loan(&self, id: &LoanId) -> StoreResult<LoanRecord>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync + 'static {
    /// Appends one closed-loan snapshot. There is deliberately no update or
    /// delete counterpart.
    async fn append_history(&self, entry: HistoryEntry) -> StoreResult<HistoryEntry>;
    /// All entries, newest first.
    async fn list_history(&self) -> StoreResult<Vec<HistoryEntry>>;
}

// ============================================================================
// PART 5: Change feed
// ============================================================================

/// Kind of mutation carried by a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// One storage mutation, published to live subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub collection: &'static str,
    pub kind: ChangeKind,
    pub id: String,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(collection: &'static str, kind: ChangeKind, id: impl Display) -> Self {
        Self {
            collection,
            kind,
            id: id.to_string(),
            at: Utc::now(),
        }
    }
}
