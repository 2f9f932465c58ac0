//! Catalog maintenance: categories, employees, and tool definitions.
//!
//! Plain CRUD with the referential guards the stores themselves do not
//! enforce. Deletes check for dependents first; quantity changes are routed
//! through the unit registry so the physical units stay reconciled with the
//! declared count.

use std::sync::Arc;

use crib_store::{
    Category, CategoryId, CategoryStore, Employee, EmployeeId, EmployeeStore, LoanStore,
    NewCategory, NewEmployee, NewTool, ToolDefinition, ToolId, ToolPatch, ToolStore, ToolUnit,
    UnitStore,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::{CribError, CribResult},
    registry::UnitRegistry,
};

/// Update payload for a tool definition. Quantity is optional; when present
/// the unit registry grows or shrinks the physical units to match.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolUpdate {
    pub tool_name: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub total_quantity: Option<u32>,
}

/// A tool definition together with its live units, for detail views.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDetail {
    #[serde(flatten)]
    pub tool: ToolDefinition,
    pub units: Vec<ToolUnit>,
}

pub struct Catalog {
    categories: Arc<dyn CategoryStore>,
    employees: Arc<dyn EmployeeStore>,
    tools: Arc<dyn ToolStore>,
    units: Arc<dyn UnitStore>,
    loans: Arc<dyn LoanStore>,
    registry: Arc<UnitRegistry>,
}

impl Catalog {
    pub fn new(
        categories: Arc<dyn CategoryStore>,
        employees: Arc<dyn EmployeeStore>,
        tools: Arc<dyn ToolStore>,
        units: Arc<dyn UnitStore>,
        loans: Arc<dyn LoanStore>,
        registry: Arc<UnitRegistry>,
    ) -> Self {
        Self {
            categories,
            employees,
            tools,
            units,
            loans,
            registry,
        }
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn create_category(&self, input: NewCategory) -> CribResult<Category> {
        require_text("category_name", &input.category_name)?;
        Ok(self.categories.create_category(Category::new(input)).await?)
    }

    pub async fn list_categories(&self) -> CribResult<Vec<Category>> {
        Ok(self.categories.list_categories().await?)
    }

    /// Renames a category and refreshes the denormalized name on every tool
    /// definition that points at it. Units and loans keep their issue-time
    /// snapshots.
    pub async fn update_category(
        &self,
        id: &CategoryId,
        input: NewCategory,
    ) -> CribResult<Category> {
        require_text("category_name", &input.category_name)?;
        let updated = self.categories.update_category(id, input).await?;

        for tool in self.tools.list_tools().await? {
            if &tool.category_id == id && tool.category_name != updated.category_name {
                self.tools
                    .update_tool(
                        &tool.id,
                        ToolPatch {
                            tool_name: tool.tool_name,
                            category_id: tool.category_id,
                            category_name: updated.category_name.clone(),
                            image_url: tool.image_url,
                        },
                    )
                    .await?;
            }
        }
        Ok(updated)
    }

    /// Deletes a category; refused while any tool definition references it.
    pub async fn delete_category(&self, id: &CategoryId) -> CribResult<()> {
        let in_use = self
            .tools
            .list_tools()
            .await?
            .iter()
            .any(|tool| &tool.category_id == id);
        if in_use {
            return Err(CribError::validation(
                "category_in_use",
                "category still has tools; delete or reassign them first",
            ));
        }
        if !self.categories.delete_category(id).await? {
            return Err(CribError::not_found("category", id));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Employees
    // ------------------------------------------------------------------

    pub async fn create_employee(&self, input: NewEmployee) -> CribResult<Employee> {
        require_text("emp_id", &input.emp_id)?;
        require_text("emp_name", &input.emp_name)?;
        Ok(self.employees.create_employee(Employee::new(input)).await?)
    }

    pub async fn list_employees(&self) -> CribResult<Vec<Employee>> {
        Ok(self.employees.list_employees().await?)
    }

    pub async fn update_employee(
        &self,
        id: &EmployeeId,
        input: NewEmployee,
    ) -> CribResult<Employee> {
        require_text("emp_id", &input.emp_id)?;
        require_text("emp_name", &input.emp_name)?;
        Ok(self.employees.update_employee(id, input).await?)
    }

    /// Deletes an employee; refused while they hold an open loan.
    pub async fn delete_employee(&self, id: &EmployeeId) -> CribResult<()> {
        let employee = self
            .employees
            .get_employee(id)
            .await?
            .ok_or_else(|| CribError::not_found("employee", id))?;
        if self.loans.has_open_loans(&employee.emp_id).await? {
            return Err(CribError::validation(
                "employee_has_open_loans",
                "employee still holds issued tools; process their returns first",
            ));
        }
        self.employees.delete_employee(id).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tool definitions
    // ------------------------------------------------------------------

    /// Creates a definition and mints its initial units in one go.
    pub async fn create_tool(&self, input: NewTool) -> CribResult<ToolDefinition> {
        require_text("tool_name", &input.tool_name)?;
        let category = self
            .categories
            .get_category(&input.category_id)
            .await?
            .ok_or_else(|| CribError::not_found("category", &input.category_id))?;

        let quantity = input.total_quantity;
        let tool = ToolDefinition::new(input, category.category_name);
        let tool = self.tools.create_tool(tool).await?;
        if quantity > 0 {
            self.registry.create_units(&tool, quantity).await?;
        }
        info!(tool = %tool.tool_name, quantity, "tool created");
        // Re-read so the returned definition carries the advanced unit counter.
        Ok(self
            .tools
            .get_tool(&tool.id)
            .await?
            .unwrap_or(tool))
    }

    pub async fn list_tools(&self) -> CribResult<Vec<ToolDefinition>> {
        Ok(self.tools.list_tools().await?)
    }

    pub async fn tool_detail(&self, id: &ToolId) -> CribResult<ToolDetail> {
        let tool = self
            .tools
            .get_tool(id)
            .await?
            .ok_or_else(|| CribError::not_found("tool", id))?;
        let units = self.units.list_units(id).await?;
        Ok(ToolDetail { tool, units })
    }

    /// Updates descriptive fields and, when a quantity is given, reconciles
    /// units through the registry.
    pub async fn update_tool(&self, id: &ToolId, input: ToolUpdate) -> CribResult<ToolDefinition> {
        require_text("tool_name", &input.tool_name)?;
        let category = self
            .categories
            .get_category(&input.category_id)
            .await?
            .ok_or_else(|| CribError::not_found("category", &input.category_id))?;

        let tool = self
            .tools
            .update_tool(
                id,
                ToolPatch {
                    tool_name: input.tool_name,
                    category_id: category.id,
                    category_name: category.category_name,
                    image_url: input.image_url,
                },
            )
            .await?;

        if let Some(target) = input.total_quantity {
            self.registry.set_quantity(id, target).await?;
            return Ok(self
                .tools
                .get_tool(id)
                .await?
                .ok_or_else(|| CribError::not_found("tool", id))?);
        }
        Ok(tool)
    }

    /// Deletes a definition and all its units. Refused while any unit is
    /// issued; open loans would otherwise dangle.
    pub async fn delete_tool(&self, id: &ToolId) -> CribResult<()> {
        if self.tools.get_tool(id).await?.is_none() {
            return Err(CribError::not_found("tool", id));
        }
        let purged = self.registry.purge_for_delete(id).await?;
        self.tools.delete_tool(id).await?;
        info!(tool = %id, purged, "tool deleted");
        Ok(())
    }
}

fn require_text(field: &'static str, value: &str) -> CribResult<()> {
    if value.trim().is_empty() {
        return Err(CribError::Validation {
            code: "missing_field",
            message: format!("{field} must not be empty"),
        });
    }
    Ok(())
}
