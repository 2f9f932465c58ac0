//! Dashboard aggregates.
//!
//! Everything here is computed on demand from the live collections; nothing
//! is cached or incrementally maintained. At crib scale a full scan per
//! request is cheaper than keeping counters honest across the workflow's
//! compensation paths.

use std::collections::HashMap;
use std::sync::Arc;

use crib_store::{
    CategoryId, CategoryStore, EmployeeStore, LoanStatus, LoanStore, ToolId, ToolStore,
    UnitStatus, UnitStore,
};
use serde::Serialize;

use crate::error::CribResult;

/// Unit counts split by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnitCounts {
    pub total: usize,
    pub available: usize,
    pub issued: usize,
    pub maintenance: usize,
}

impl UnitCounts {
    fn bump(&mut self, status: UnitStatus) {
        self.total += 1;
        match status {
            UnitStatus::Available => self.available += 1,
            UnitStatus::Issued => self.issued += 1,
            UnitStatus::Maintenance => self.maintenance += 1,
        }
    }
}

/// Per-definition availability row.
#[derive(Debug, Clone, Serialize)]
pub struct ToolAvailability {
    pub tool_id: ToolId,
    pub tool_name: String,
    pub category_name: String,
    #[serde(flatten)]
    pub units: UnitCounts,
    /// Share of units currently available, 0-100. Zero for definitions with
    /// no units on record.
    pub available_pct: u8,
}

fn availability_pct(counts: &UnitCounts) -> u8 {
    if counts.total == 0 {
        return 0;
    }
    ((counts.available * 100) / counts.total) as u8
}

/// Per-category rollup.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryBreakdown {
    pub category_id: CategoryId,
    pub category_name: String,
    pub tools: usize,
    #[serde(flatten)]
    pub units: UnitCounts,
}

/// The full dashboard payload.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub categories: usize,
    pub tools: usize,
    pub employees: usize,
    pub open_loans: usize,
    pub units: UnitCounts,
    pub by_category: Vec<CategoryBreakdown>,
    pub by_tool: Vec<ToolAvailability>,
    /// Definitions with units on record but none currently available.
    pub out_of_stock: Vec<ToolAvailability>,
}

pub struct Dashboard {
    categories: Arc<dyn CategoryStore>,
    employees: Arc<dyn EmployeeStore>,
    tools: Arc<dyn ToolStore>,
    units: Arc<dyn UnitStore>,
    loans: Arc<dyn LoanStore>,
}

impl Dashboard {
    pub fn new(
        categories: Arc<dyn CategoryStore>,
        employees: Arc<dyn EmployeeStore>,
        tools: Arc<dyn ToolStore>,
        units: Arc<dyn UnitStore>,
        loans: Arc<dyn LoanStore>,
    ) -> Self {
        Self {
            categories,
            employees,
            tools,
            units,
            loans,
        }
    }

    pub async fn summary(&self) -> CribResult<DashboardSummary> {
        let categories = self.categories.list_categories().await?;
        let employees = self.employees.list_employees().await?;
        let tools = self.tools.list_tools().await?;
        let units = self.units.list_all_units().await?;
        let open_loans = self.loans.list_loans(Some(LoanStatus::Issued)).await?;

        let mut totals = UnitCounts::default();
        let mut per_tool: HashMap<&ToolId, UnitCounts> = HashMap::new();
        for unit in &units {
            totals.bump(unit.status);
            per_tool.entry(&unit.tool_id).or_default().bump(unit.status);
        }

        let mut by_tool = Vec::with_capacity(tools.len());
        let mut by_category: HashMap<&CategoryId, CategoryBreakdown> = HashMap::new();
        for tool in &tools {
            let counts = per_tool.get(&tool.id).copied().unwrap_or_default();
            by_tool.push(ToolAvailability {
                tool_id: tool.id.clone(),
                tool_name: tool.tool_name.clone(),
                category_name: tool.category_name.clone(),
                units: counts,
                available_pct: availability_pct(&counts),
            });

            let entry = by_category
                .entry(&tool.category_id)
                .or_insert_with(|| CategoryBreakdown {
                    category_id: tool.category_id.clone(),
                    category_name: tool.category_name.clone(),
                    tools: 0,
                    units: UnitCounts::default(),
                });
            entry.tools += 1;
            entry.units.total += counts.total;
            entry.units.available += counts.available;
            entry.units.issued += counts.issued;
            entry.units.maintenance += counts.maintenance;
        }

        let out_of_stock = by_tool
            .iter()
            .filter(|row| row.units.total > 0 && row.units.available == 0)
            .cloned()
            .collect();

        let mut by_category: Vec<CategoryBreakdown> = by_category.into_values().collect();
        by_category.sort_by(|a, b| a.category_name.cmp(&b.category_name));

        Ok(DashboardSummary {
            categories: categories.len(),
            tools: tools.len(),
            employees: employees.len(),
            open_loans: open_loans.len(),
            units: totals,
            by_category,
            by_tool,
            out_of_stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use crib_store::{
        Category, Employee, MemoryStore, NewCategory, NewEmployee, NewTool, ToolDefinition,
    };

    use super::*;
    use crate::{registry::UnitRegistry, workflow::IssueReturnWorkflow};
    use crate::ledger::HistoryLedger;

    async fn seed_tool(
        store: &Arc<MemoryStore>,
        registry: &UnitRegistry,
        category: &Category,
        name: &str,
        quantity: u32,
    ) -> ToolDefinition {
        let tool = ToolDefinition::new(
            NewTool {
                tool_name: name.into(),
                category_id: category.id.clone(),
                total_quantity: 0,
                image_url: None,
            },
            category.category_name.clone(),
        );
        store.create_tool(tool.clone()).await.unwrap();
        registry.set_quantity(&tool.id, quantity).await.unwrap();
        tool
    }

    #[tokio::test]
    async fn summary_counts_units_loans_and_stockouts() {
        let store = Arc::new(MemoryStore::new());
        let registry = UnitRegistry::new(store.clone(), store.clone());
        let ledger = Arc::new(HistoryLedger::new(store.clone()));
        let workflow =
            IssueReturnWorkflow::new(store.clone(), store.clone(), store.clone(), ledger);
        let dashboard = Dashboard::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        );

        let category = Category::new(NewCategory {
            category_name: "Hand Tools".into(),
            description: None,
        });
        store.create_category(category.clone()).await.unwrap();
        let hammer = seed_tool(&store, &registry, &category, "Hammer", 2).await;
        let chisel = seed_tool(&store, &registry, &category, "Chisel", 1).await;

        let employee = Employee::new(NewEmployee {
            emp_id: "E1".into(),
            emp_name: "Asha".into(),
            group: "Fitting".into(),
            destination: "Bay 4".into(),
        });
        store.create_employee(employee.clone()).await.unwrap();

        // Issue the only chisel and put one hammer in maintenance.
        let chisel_unit = store.list_units(&chisel.id).await.unwrap().remove(0);
        workflow
            .issue_one(&employee.id, &chisel_unit.id, None)
            .await
            .unwrap();
        let hammer_unit = store.list_units(&hammer.id).await.unwrap().remove(0);
        registry.mark_maintenance(&hammer_unit.id).await.unwrap();

        let summary = dashboard.summary().await.unwrap();
        assert_eq!(summary.categories, 1);
        assert_eq!(summary.tools, 2);
        assert_eq!(summary.employees, 1);
        assert_eq!(summary.open_loans, 1);
        assert_eq!(
            summary.units,
            UnitCounts {
                total: 3,
                available: 1,
                issued: 1,
                maintenance: 1
            }
        );

        assert_eq!(summary.by_category.len(), 1);
        assert_eq!(summary.by_category[0].tools, 2);
        assert_eq!(summary.by_category[0].units.total, 3);

        // The chisel is fully issued, so it is the one stockout.
        assert_eq!(summary.out_of_stock.len(), 1);
        assert_eq!(summary.out_of_stock[0].tool_name, "Chisel");
        assert_eq!(summary.out_of_stock[0].available_pct, 0);

        let hammer_row = summary
            .by_tool
            .iter()
            .find(|row| row.tool_name == "Hammer")
            .unwrap();
        assert_eq!(hammer_row.available_pct, 50);
    }

    #[tokio::test]
    async fn definition_without_units_is_not_a_stockout() {
        let store = Arc::new(MemoryStore::new());
        let registry = UnitRegistry::new(store.clone(), store.clone());
        let dashboard = Dashboard::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        );

        let category = Category::new(NewCategory {
            category_name: "Hand Tools".into(),
            description: None,
        });
        store.create_category(category.clone()).await.unwrap();
        seed_tool(&store, &registry, &category, "Pry Bar", 0).await;

        let summary = dashboard.summary().await.unwrap();
        assert_eq!(summary.tools, 1);
        assert_eq!(summary.units.total, 0);
        assert!(summary.out_of_stock.is_empty());
        assert_eq!(summary.by_tool.len(), 1);
        assert_eq!(summary.by_tool[0].units.total, 0);
    }
}
