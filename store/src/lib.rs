//! Storage layer for the tool crib inventory collections.
//!
//! Provides typed per-collection stores for:
//! - Categories and employees (reference records)
//! - Tool definitions and tool units
//! - Loans ("outward") and the history ledger
//!
//! Supported backends:
//! - Memory (default)
//!
//! Conditional writes (`UnitStore::transition_unit`, `LoanStore::close_loan`)
//! are the transaction boundary the issue/return workflow builds on: each is
//! atomic with respect to other writers of the same document.

mod core;
mod memory;

pub use core::{
    duration_days, Category, CategoryId, CategoryStore, ChangeEvent, ChangeKind, Employee,
    EmployeeId, EmployeeStore, HistoryEntry, HistoryId, HistoryStore, LoanId, LoanRecord,
    LoanStatus, LoanStore, NewCategory, NewEmployee, NewTool, StoreError, StoreResult,
    ToolDefinition, ToolId, ToolPatch, ToolStore, ToolUnit, UnitId, UnitStatus, UnitStore,
};
pub use memory::{
    MemoryStore, COLLECTION_CATEGORIES, COLLECTION_EMPLOYEES, COLLECTION_HISTORY,
    COLLECTION_OUTWARD, COLLECTION_TOOLS, COLLECTION_UNITS,
};
