//! Sale-status x CRM-stage state machine for units.
//!
//! The stored stage follows the status until an operator assigns one explicitly;
//! from then on `crm_stage_explicit` pins it.

use std::str::FromStr;

use crate::entities::project_unit::{self, CrmStage, UnitStatus};
use crate::errors::ServiceError;

/// Stage implied by a sale status when no explicit stage exists.
pub fn derive_stage(status: UnitStatus, explicit_stage: Option<CrmStage>) -> CrmStage {
    if let Some(stage) = explicit_stage {
        return stage;
    }
    match status {
        UnitStatus::Sold => CrmStage::Completed,
        UnitStatus::Booked => CrmStage::Active,
        UnitStatus::Available | UnitStatus::Hold => CrmStage::Visitor,
    }
}

/// Stage a unit currently presents on boards.
pub fn effective_stage(unit: &project_unit::Model) -> CrmStage {
    derive_stage(
        unit.status,
        unit.crm_stage_explicit.then_some(unit.crm_stage),
    )
}

pub fn parse_stage(raw: &str) -> Result<CrmStage, ServiceError> {
    CrmStage::from_str(raw.trim())
        .map_err(|_| ServiceError::InvalidInput(format!("Invalid stage: {}", raw)))
}

pub fn parse_status(raw: &str) -> Result<UnitStatus, ServiceError> {
    UnitStatus::from_str(raw.trim())
        .map_err(|_| ServiceError::InvalidInput(format!("Invalid unit status: {}", raw)))
}

/// Assigns an operator-chosen stage. Invalid values leave the unit untouched.
pub fn set_stage(unit: &mut project_unit::Model, raw: &str) -> Result<CrmStage, ServiceError> {
    let stage = parse_stage(raw)?;
    unit.crm_stage = stage;
    unit.crm_stage_explicit = true;
    Ok(stage)
}

/// Outcome of a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: UnitStatus,
    pub to: UnitStatus,
    pub stage: CrmStage,
}

impl StatusChange {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Moves a unit to `next`, re-deriving the stored stage unless it is pinned.
///
/// Every status is reachable from every other.
pub fn apply_status(unit: &mut project_unit::Model, next: UnitStatus) -> StatusChange {
    let from = unit.status;
    unit.status = next;
    if !unit.crm_stage_explicit {
        unit.crm_stage = derive_stage(next, None);
    }

    StatusChange {
        from,
        to: next,
        stage: unit.crm_stage,
    }
}

/// Column metadata for the kanban board, in pipeline order.
pub fn stage_columns() -> [(CrmStage, &'static str, &'static str); 3] {
    [
        (CrmStage::Visitor, "Visitor", "No payments; early interest"),
        (CrmStage::Active, "Active", "Paying or in progress"),
        (CrmStage::Completed, "Completed", "Fully paid / closed"),
    ]
}
