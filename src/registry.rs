//! Inventory unit registry.
//!
//! Owns the set of tool units behind each tool definition: unit creation when
//! the declared quantity grows, removal when it shrinks, and the guarded
//! maintenance transitions. Unit codes take their ordinal from the
//! definition's persisted lifetime counter, so a shrink-then-regrow cycle can
//! never mint a duplicate code.

use std::sync::Arc;

use crib_store::{
    StoreError, ToolDefinition, ToolId, ToolStore, ToolUnit, UnitId, UnitStatus, UnitStore,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CribError, CribResult};

/// Result of reconciling a definition's units against a new declared quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuantityReport {
    pub created: u32,
    pub removed: u32,
    /// Units that should have been removed but are out on loan. They are
    /// never forcibly reclaimed; the deficit is reported, not swallowed.
    pub deficit: u32,
    /// Actual unit count after reconciliation.
    pub actual: u32,
}

pub struct UnitRegistry {
    tools: Arc<dyn ToolStore>,
    units: Arc<dyn UnitStore>,
}

impl UnitRegistry {
    pub fn new(tools: Arc<dyn ToolStore>, units: Arc<dyn UnitStore>) -> Self {
        Self { tools, units }
    }

    /// Creates `count` available units for a definition, reserving their
    /// ordinals from the lifetime counter before any unit write.
    pub async fn create_units(
        &self,
        tool: &ToolDefinition,
        count: u32,
    ) -> CribResult<Vec<ToolUnit>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let first = self
            .tools
            .reserve_unit_ordinals(&tool.id, u64::from(count))
            .await?;
        let units: Vec<ToolUnit> = (0..u64::from(count))
            .map(|i| ToolUnit::new(tool, unit_code(&tool.tool_name, first + i)))
            .collect();
        self.units.insert_units(units.clone()).await?;
        info!(tool = %tool.tool_name, count, "units created");
        Ok(units)
    }

    /// Reconciles a definition's actual units with a new declared quantity
    /// and records the resulting count on the definition.
    pub async fn set_quantity(&self, tool_id: &ToolId, target: u32) -> CribResult<QuantityReport> {
        let tool = self
            .tools
            .get_tool(tool_id)
            .await?
            .ok_or_else(|| CribError::not_found("tool", tool_id))?;
        let existing = self.units.list_units(tool_id).await?;
        let current = existing.len() as u32;

        let mut report = QuantityReport::default();
        if target > current {
            report.created = target - current;
            self.create_units(&tool, report.created).await?;
        } else if target < current {
            let (removed, deficit) = self.remove_surplus(existing, current - target).await?;
            report.removed = removed;
            report.deficit = deficit;
        }

        report.actual = current + report.created - report.removed;
        self.tools
            .set_total_quantity(tool_id, report.actual)
            .await?;
        if report.deficit > 0 {
            warn!(
                tool = %tool.tool_name,
                deficit = report.deficit,
                "quantity shrink left issued units in the field"
            );
        }
        Ok(report)
    }

    /// Removes up to `surplus` units, preferring available ones, then
    /// maintenance. Issued units are never reclaimed; anything that cannot be
    /// removed is returned as the deficit.
    async fn remove_surplus(
        &self,
        mut units: Vec<ToolUnit>,
        surplus: u32,
    ) -> CribResult<(u32, u32)> {
        // available first, then maintenance; issued units sort last and are
        // skipped by the removal guard anyway.
        units.sort_by_key(|u| match u.status {
            UnitStatus::Available => 0,
            UnitStatus::Maintenance => 1,
            UnitStatus::Issued => 2,
        });

        let mut removed = 0;
        for unit in units {
            if removed == surplus {
                break;
            }
            if unit.status == UnitStatus::Issued {
                break;
            }
            match self.units.remove_unit(&unit.id, unit.status).await {
                Ok(()) => removed += 1,
                // The unit's status moved under us (issued mid-shrink); leave
                // it and keep going.
                Err(StoreError::StatusConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok((removed, surplus - removed))
    }

    /// Every unit across all definitions, newest first.
    pub async fn list_all_units(&self) -> CribResult<Vec<ToolUnit>> {
        Ok(self.units.list_all_units().await?)
    }

    /// Takes an available unit out of circulation for maintenance.
    pub async fn mark_maintenance(&self, unit_id: &UnitId) -> CribResult<ToolUnit> {
        let unit = self.fetch(unit_id).await?;
        match unit.status {
            UnitStatus::Available => {}
            UnitStatus::Issued => {
                return Err(CribError::validation(
                    "unit_issued",
                    format!("unit {} is out on loan and cannot enter maintenance", unit.unit_code),
                ))
            }
            UnitStatus::Maintenance => return Ok(unit),
        }
        self.transition(&unit, UnitStatus::Available, UnitStatus::Maintenance)
            .await
    }

    /// Puts a maintenance unit back into circulation.
    pub async fn clear_maintenance(&self, unit_id: &UnitId) -> CribResult<ToolUnit> {
        let unit = self.fetch(unit_id).await?;
        match unit.status {
            UnitStatus::Maintenance => {}
            UnitStatus::Available => return Ok(unit),
            UnitStatus::Issued => {
                return Err(CribError::validation(
                    "unit_issued",
                    format!("unit {} is out on loan", unit.unit_code),
                ))
            }
        }
        self.transition(&unit, UnitStatus::Maintenance, UnitStatus::Available)
            .await
    }

    /// Deletes every unit of a definition ahead of the definition itself.
    /// Refused while any unit is out on loan.
    pub async fn purge_for_delete(&self, tool_id: &ToolId) -> CribResult<usize> {
        let units = self.units.list_units(tool_id).await?;
        if units.iter().any(|u| u.status == UnitStatus::Issued) {
            return Err(CribError::validation(
                "tool_has_issued_units",
                "tool has units out on loan; process their returns first",
            ));
        }
        Ok(self.units.purge_units(tool_id).await?)
    }

    async fn fetch(&self, unit_id: &UnitId) -> CribResult<ToolUnit> {
        self.units
            .get_unit(unit_id)
            .await?
            .ok_or_else(|| CribError::not_found("tool unit", unit_id))
    }

    async fn transition(
        &self,
        unit: &ToolUnit,
        expected: UnitStatus,
        next: UnitStatus,
    ) -> CribResult<ToolUnit> {
        self.units
            .transition_unit(&unit.id, expected, unit.version, next)
            .await
            .map_err(|err| match err {
                StoreError::StatusConflict { .. } | StoreError::VersionConflict { .. } => {
                    CribError::UnitConflict {
                        unit_code: unit.unit_code.clone(),
                    }
                }
                other => other.into(),
            })
    }
}

/// `HAMMERQ3`-style unit code: uppercased name with whitespace stripped, `Q`,
/// then the lifetime ordinal.
pub fn unit_code(tool_name: &str, ordinal: u64) -> String {
    let slug: String = tool_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();
    format!("{slug}Q{ordinal}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crib_store::{Category, CategoryStore, MemoryStore, NewCategory, NewTool};

    use super::*;

    async fn setup() -> (Arc<MemoryStore>, UnitRegistry, ToolDefinition) {
        let store = Arc::new(MemoryStore::new());
        let registry = UnitRegistry::new(store.clone(), store.clone());

        let category = Category::new(NewCategory {
            category_name: "Hand Tools".into(),
            description: None,
        });
        let tool = ToolDefinition::new(
            NewTool {
                tool_name: "Claw Hammer".into(),
                category_id: category.id.clone(),
                total_quantity: 0,
                image_url: None,
            },
            category.category_name.clone(),
        );
        store.create_category(category).await.unwrap();
        store.create_tool(tool.clone()).await.unwrap();
        (store, registry, tool)
    }

    #[test]
    fn unit_code_strips_whitespace_and_uppercases() {
        assert_eq!(unit_code("Claw Hammer", 1), "CLAWHAMMERQ1");
        assert_eq!(unit_code("hammer", 12), "HAMMERQ12");
    }

    #[tokio::test]
    async fn set_quantity_creates_sequential_codes() {
        let (store, registry, tool) = setup().await;
        let report = registry.set_quantity(&tool.id, 3).await.unwrap();
        assert_eq!(report.created, 3);
        assert_eq!(report.actual, 3);

        let mut codes: Vec<String> = store
            .list_units(&tool.id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.unit_code)
            .collect();
        codes.sort();
        assert_eq!(codes, ["CLAWHAMMERQ1", "CLAWHAMMERQ2", "CLAWHAMMERQ3"]);
        assert_eq!(
            store.get_tool(&tool.id).await.unwrap().unwrap().total_quantity,
            3
        );
    }

    #[tokio::test]
    async fn codes_stay_unique_across_shrink_and_regrow() {
        let (store, registry, tool) = setup().await;
        registry.set_quantity(&tool.id, 3).await.unwrap();
        registry.set_quantity(&tool.id, 1).await.unwrap();
        registry.set_quantity(&tool.id, 4).await.unwrap();

        let codes: Vec<String> = store
            .list_units(&tool.id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.unit_code)
            .collect();
        let unique: HashSet<&String> = codes.iter().collect();
        assert_eq!(codes.len(), 4);
        assert_eq!(unique.len(), 4, "unit codes must never repeat: {codes:?}");
        // Ordinals 4..=6 were minted even though only three units ever
        // coexisted; the counter never rewinds.
        assert!(codes.iter().any(|c| c == "CLAWHAMMERQ6"));
    }

    #[tokio::test]
    async fn shrink_skips_issued_units_and_reports_deficit() {
        let (store, registry, tool) = setup().await;
        registry.set_quantity(&tool.id, 3).await.unwrap();

        let units = store.list_units(&tool.id).await.unwrap();
        store
            .transition_unit(&units[0].id, UnitStatus::Available, 0, UnitStatus::Issued)
            .await
            .unwrap();
        store
            .transition_unit(&units[1].id, UnitStatus::Available, 0, UnitStatus::Issued)
            .await
            .unwrap();

        let report = registry.set_quantity(&tool.id, 0).await.unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(report.deficit, 2);
        assert_eq!(report.actual, 2);
        assert_eq!(store.list_units(&tool.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn maintenance_round_trip() {
        let (store, registry, tool) = setup().await;
        registry.set_quantity(&tool.id, 1).await.unwrap();
        let unit = store.list_units(&tool.id).await.unwrap().remove(0);

        let unit = registry.mark_maintenance(&unit.id).await.unwrap();
        assert_eq!(unit.status, UnitStatus::Maintenance);
        // Marking twice is a no-op, not an error.
        let unit = registry.mark_maintenance(&unit.id).await.unwrap();
        assert_eq!(unit.status, UnitStatus::Maintenance);

        let unit = registry.clear_maintenance(&unit.id).await.unwrap();
        assert_eq!(unit.status, UnitStatus::Available);
    }

    #[tokio::test]
    async fn issued_unit_cannot_enter_maintenance() {
        let (store, registry, tool) = setup().await;
        registry.set_quantity(&tool.id, 1).await.unwrap();
        let unit = store.list_units(&tool.id).await.unwrap().remove(0);
        store
            .transition_unit(&unit.id, UnitStatus::Available, 0, UnitStatus::Issued)
            .await
            .unwrap();

        let err = registry.mark_maintenance(&unit.id).await.unwrap_err();
        assert_eq!(err.code(), "unit_issued");
    }

    #[tokio::test]
    async fn purge_refuses_while_units_are_issued() {
        let (store, registry, tool) = setup().await;
        registry.set_quantity(&tool.id, 2).await.unwrap();
        let unit = store.list_units(&tool.id).await.unwrap().remove(0);
        store
            .transition_unit(&unit.id, UnitStatus::Available, 0, UnitStatus::Issued)
            .await
            .unwrap();

        let err = registry.purge_for_delete(&tool.id).await.unwrap_err();
        assert_eq!(err.code(), "tool_has_issued_units");
        assert_eq!(store.list_units(&tool.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn maintenance_units_are_removed_after_available_ones() {
        let (store, registry, tool) = setup().await;
        registry.set_quantity(&tool.id, 3).await.unwrap();
        let units = store.list_units(&tool.id).await.unwrap();
        registry.mark_maintenance(&units[0].id).await.unwrap();

        // Removing two: one available and the maintenance one both go.
        let report = registry.set_quantity(&tool.id, 1).await.unwrap();
        assert_eq!(report.removed, 2);
        assert_eq!(report.deficit, 0);
    }
}
