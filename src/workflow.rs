//! Issue ("outward") and return ("inward") workflow.
//!
//! The only state machine in the system. A unit cycles
//! `available -> issued -> available`; every transition is a version-guarded
//! compare-and-swap on the unit plus a loan write and, on return, one ledger
//! append. The unit CAS is the commit point: of two racing issues for the
//! same unit exactly one lands, and a loan or ledger write that fails after
//! the CAS is compensated so the transition is all-or-nothing.

use std::sync::Arc;

use chrono::Utc;
use crib_store::{
    EmployeeId, EmployeeStore, LoanId, LoanRecord, LoanStatus, LoanStore, StoreError, ToolUnit,
    UnitId, UnitStatus, UnitStore,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    error::{CribError, CribResult},
    ledger::HistoryLedger,
};

/// One (employee, unit) tuple of a batch issue submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
    pub employee_id: EmployeeId,
    pub unit_id: UnitId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Per-tuple outcome of a batch issue. Partial success is reported tuple by
/// tuple, never collapsed into a single verdict.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IssueOutcome {
    Issued { loan: LoanRecord },
    Rejected { code: String, message: String },
}

/// Per-loan outcome of a batch return.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReturnOutcome {
    Returned { loan: LoanRecord },
    /// The loan was already closed; nothing was written.
    AlreadyReturned { loan_id: LoanId },
    Rejected { code: String, message: String },
}

pub struct IssueReturnWorkflow {
    employees: Arc<dyn EmployeeStore>,
    units: Arc<dyn UnitStore>,
    loans: Arc<dyn LoanStore>,
    ledger: Arc<HistoryLedger>,
}

impl IssueReturnWorkflow {
    pub fn new(
        employees: Arc<dyn EmployeeStore>,
        units: Arc<dyn UnitStore>,
        loans: Arc<dyn LoanStore>,
        ledger: Arc<HistoryLedger>,
    ) -> Self {
        Self {
            employees,
            units,
            loans,
            ledger,
        }
    }

    /// Issues one available unit to one employee.
    ///
    /// Write order: unit CAS first, loan second. The CAS rejects the second
    /// of two concurrent issues; a loan-write failure rolls the unit back.
    pub async fn issue_one(
        &self,
        employee_id: &EmployeeId,
        unit_id: &UnitId,
        remarks: Option<String>,
    ) -> CribResult<LoanRecord> {
        let employee = self
            .employees
            .get_employee(employee_id)
            .await?
            .ok_or_else(|| CribError::not_found("employee", employee_id))?;
        let unit = self
            .units
            .get_unit(unit_id)
            .await?
            .ok_or_else(|| CribError::not_found("tool unit", unit_id))?;

        let issued = self.claim_unit(&unit).await?;
        let loan = LoanRecord::new(&employee, &issued, remarks);
        match self.loans.create_loan(loan).await {
            Ok(loan) => {
                info!(
                    unit = %loan.unit_code,
                    employee = %loan.emp_name,
                    loan = %loan.id,
                    "unit issued"
                );
                Ok(loan)
            }
            Err(err) => {
                // Compensate the CAS so the unit is not stranded as issued
                // without a loan.
                self.release_unit(&issued).await;
                Err(err.into())
            }
        }
    }

    /// Processes a batch of issue tuples sequentially, reporting each tuple's
    /// outcome. A rejection does not stop the rest of the batch.
    pub async fn issue(&self, requests: Vec<IssueRequest>) -> Vec<IssueOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            let outcome = match self
                .issue_one(&request.employee_id, &request.unit_id, request.remarks)
                .await
            {
                Ok(loan) => IssueOutcome::Issued { loan },
                Err(err) => {
                    warn!(unit = %request.unit_id, error = %err, "issue rejected");
                    IssueOutcome::Rejected {
                        code: err.code().to_string(),
                        message: err.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Returns one loan: closes it, frees its unit, appends one ledger entry.
    ///
    /// Closing the loan is the commit point; re-submitting a return for an
    /// already-closed loan is a no-op. Failures after the commit point are
    /// compensated back so no half-returned state survives.
    pub async fn return_one(
        &self,
        loan_id: &LoanId,
        remarks: Option<String>,
    ) -> CribResult<ReturnOutcome> {
        let loan = self
            .loans
            .get_loan(loan_id)
            .await?
            .ok_or_else(|| CribError::not_found("loan", loan_id))?;
        if loan.status == LoanStatus::Returned {
            return Ok(ReturnOutcome::AlreadyReturned {
                loan_id: loan_id.clone(),
            });
        }

        let returned_date = Utc::now();
        let closed = match self
            .loans
            .close_loan(loan_id, returned_date, remarks)
            .await
        {
            Ok(closed) => closed,
            // Lost a race with another return of the same loan: their return
            // stands, ours is the no-op.
            Err(StoreError::StatusConflict { .. }) => {
                return Ok(ReturnOutcome::AlreadyReturned {
                    loan_id: loan_id.clone(),
                })
            }
            Err(err) => return Err(err.into()),
        };

        let unit = match self.units.get_unit(&closed.unit_id).await? {
            Some(unit) => unit,
            None => {
                // Unit vanished while issued; the loan closure still counts,
                // and the ledger still gets its entry.
                warn!(unit = %closed.unit_id, loan = %closed.id, "returned unit no longer exists");
                self.ledger.append(&closed, returned_date).await?;
                return Ok(ReturnOutcome::Returned { loan: closed });
            }
        };

        if let Err(err) = self
            .units
            .transition_unit(&unit.id, UnitStatus::Issued, unit.version, UnitStatus::Available)
            .await
        {
            // Roll the loan back open; the whole return did not happen.
            if let Err(reopen_err) = self.loans.reopen_loan(&closed.id).await {
                error!(loan = %closed.id, error = %reopen_err, "compensation failed; loan stuck returned");
            }
            return Err(match err {
                StoreError::StatusConflict { .. } | StoreError::VersionConflict { .. } => {
                    CribError::UnitConflict {
                        unit_code: unit.unit_code.clone(),
                    }
                }
                other => other.into(),
            });
        }

        match self.ledger.append(&closed, returned_date).await {
            Ok(_) => {
                info!(
                    unit = %closed.unit_code,
                    employee = %closed.emp_name,
                    loan = %closed.id,
                    "unit returned"
                );
                Ok(ReturnOutcome::Returned { loan: closed })
            }
            Err(err) => {
                // Compensate both earlier writes.
                let fresh = self.units.get_unit(&unit.id).await.ok().flatten();
                if let Some(fresh) = fresh {
                    if self
                        .units
                        .transition_unit(
                            &fresh.id,
                            UnitStatus::Available,
                            fresh.version,
                            UnitStatus::Issued,
                        )
                        .await
                        .is_err()
                    {
                        error!(unit = %fresh.unit_code, "compensation failed; unit stuck available");
                    }
                }
                if let Err(reopen_err) = self.loans.reopen_loan(&closed.id).await {
                    error!(loan = %closed.id, error = %reopen_err, "compensation failed; loan stuck returned");
                }
                Err(err)
            }
        }
    }

    /// Processes a batch of returns sequentially with per-loan outcomes.
    pub async fn return_loans(
        &self,
        loan_ids: Vec<LoanId>,
        remarks: Option<String>,
    ) -> Vec<ReturnOutcome> {
        let mut outcomes = Vec::with_capacity(loan_ids.len());
        for loan_id in loan_ids {
            let outcome = match self.return_one(&loan_id, remarks.clone()).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(loan = %loan_id, error = %err, "return rejected");
                    ReturnOutcome::Rejected {
                        code: err.code().to_string(),
                        message: err.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Version-guarded `available -> issued`. Any conflict surfaces as the
    /// unit having just become unavailable.
    async fn claim_unit(&self, unit: &ToolUnit) -> CribResult<ToolUnit> {
        if unit.status != UnitStatus::Available {
            return Err(CribError::UnitUnavailable {
                unit_code: unit.unit_code.clone(),
                actual: unit.status.to_string(),
            });
        }
        self.units
            .transition_unit(&unit.id, UnitStatus::Available, unit.version, UnitStatus::Issued)
            .await
            .map_err(|err| match err {
                StoreError::StatusConflict { actual, .. } => CribError::UnitUnavailable {
                    unit_code: unit.unit_code.clone(),
                    actual,
                },
                StoreError::VersionConflict { .. } => CribError::UnitUnavailable {
                    unit_code: unit.unit_code.clone(),
                    actual: "contended".to_string(),
                },
                other => other.into(),
            })
    }

    /// Best-effort compensation for a failed issue: puts the unit back to
    /// available. Failure here is logged, not propagated — the caller is
    /// already reporting the primary error.
    async fn release_unit(&self, issued: &ToolUnit) {
        if let Err(err) = self
            .units
            .transition_unit(
                &issued.id,
                UnitStatus::Issued,
                issued.version,
                UnitStatus::Available,
            )
            .await
        {
            error!(unit = %issued.unit_code, error = %err, "issue compensation failed");
        }
    }

    /// The open loan for a unit, if any. Exposed for invariant checks.
    pub async fn open_loan_for_unit(&self, unit_id: &UnitId) -> CribResult<Option<LoanRecord>> {
        Ok(self.loans.open_loan_for_unit(unit_id).await?)
    }

    /// Loans newest first, optionally narrowed to one status.
    pub async fn list_loans(&self, status: Option<LoanStatus>) -> CribResult<Vec<LoanRecord>> {
        Ok(self.loans.list_loans(status).await?)
    }
}
