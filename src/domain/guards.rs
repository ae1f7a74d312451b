//! Invariant guards.
//!
//! Pure validation functions, each raising one specific error code. Every
//! guard runs before the corresponding store mutation; a failing guard
//! leaves both the entity store and the event log untouched.

use crate::core::error::{ErrorCode, LedgerError};
use crate::core::time::parse_iso;
use crate::domain::types::{Bridge, HolderKind, RoleAssignment, Rsg, Window};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

fn parsed(window: &Window) -> Result<(DateTime<Utc>, DateTime<Utc>), LedgerError> {
    Ok((parse_iso(&window.from)?, parse_iso(&window.to)?))
}

/// `WIN.INVALID` unless `from < to`.
pub fn guard_window(window: &Window) -> Result<(), LedgerError> {
    let (from, to) = parsed(window)?;
    if from >= to {
        return Err(LedgerError::domain(
            ErrorCode::WindowInvalid,
            format!("window {}..{} is empty (from must precede to)", window.from, window.to),
        ));
    }
    Ok(())
}

/// `RSG.MALFORMED` when a transition endpoint is undeclared or an
/// enactable state is not in `states`.
pub fn guard_rsg_well_formed(rsg: &Rsg) -> Result<(), LedgerError> {
    let states: BTreeSet<&str> = rsg.states.iter().map(String::as_str).collect();
    for transition in &rsg.transitions {
        for endpoint in [&transition.from, &transition.to] {
            if !states.contains(endpoint.as_str()) {
                return Err(LedgerError::domain(
                    ErrorCode::RsgMalformed,
                    format!("transition endpoint '{}' is not a declared state", endpoint),
                ));
            }
        }
    }
    for state in &rsg.enactable {
        if !states.contains(state.as_str()) {
            return Err(LedgerError::domain(
                ErrorCode::RsgMalformed,
                format!("enactable state '{}' is not a declared state", state),
            ));
        }
    }
    Ok(())
}

/// `RSG.NOT_ENACTABLE` unless the asserted state allows Work.
pub fn guard_enactable(rsg: &Rsg, asserted_state: &str, at: &str) -> Result<(), LedgerError> {
    if !rsg.enactable.iter().any(|s| s == asserted_state) {
        return Err(LedgerError::domain(
            ErrorCode::NotEnactable,
            format!("role state '{}' is not enactable at {}", asserted_state, at),
        ));
    }
    Ok(())
}

/// `WIN.INVALID` unless `at` lies in the assignment's half-open window.
pub fn guard_work_window(ra: &RoleAssignment, at: &str) -> Result<(), LedgerError> {
    let at_ts = parse_iso(at)?;
    let (from, to) = parsed(&ra.window)?;
    if at_ts < from || at_ts >= to {
        return Err(LedgerError::domain(
            ErrorCode::WindowInvalid,
            format!(
                "work time {} not within window {}..{}",
                at, ra.window.from, ra.window.to
            ),
        ));
    }
    Ok(())
}

/// `ELIG.VIOLATION` for episteme holders: they may never perform Work.
pub fn guard_eligibility(holder: HolderKind) -> Result<(), LedgerError> {
    if holder == HolderKind::Episteme {
        return Err(LedgerError::domain(
            ErrorCode::EligibilityViolation,
            "episteme holder cannot perform Work",
        ));
    }
    Ok(())
}

fn windows_overlap(a: &Window, b: &Window) -> Result<bool, LedgerError> {
    let (a0, a1) = parsed(a)?;
    let (b0, b1) = parsed(b)?;
    Ok(!(a1 <= b0 || a0 >= b1))
}

/// `SOD.CONFLICT` when the same holder already holds a mutually
/// incompatible role in an overlapping window.
pub fn guard_separation_of_duties(
    existing: &[RoleAssignment],
    new_assignment: &RoleAssignment,
    incompatible_roles: &[String],
) -> Result<(), LedgerError> {
    if !incompatible_roles.contains(&new_assignment.role) {
        return Ok(());
    }
    let holder = new_assignment.holder_key();
    for assignment in existing.iter().filter(|a| a.holder_key() == holder) {
        if incompatible_roles.contains(&assignment.role)
            && windows_overlap(&assignment.window, &new_assignment.window)?
        {
            return Err(LedgerError::domain(
                ErrorCode::SodConflict,
                format!(
                    "holder '{}' already holds incompatible role '{}' in an overlapping window",
                    holder, assignment.role
                ),
            ));
        }
    }
    Ok(())
}

/// `BRIDGE.CL_TOO_LOW` when a bridge's congruence level is below the
/// required floor.
pub fn guard_bridge_cl(bridge: &Bridge, required_cl: f64) -> Result<(), LedgerError> {
    if bridge.cl < required_cl {
        return Err(LedgerError::domain(
            ErrorCode::BridgeClTooLow,
            format!("bridge CL {} below required {}", bridge.cl, required_cl),
        ));
    }
    Ok(())
}

/// `CG.MIXED_SCALE` when more than one distinct unit appears in a single
/// aggregation.
pub fn guard_mixed_scale(units: Option<&[String]>) -> Result<(), LedgerError> {
    let Some(units) = units else {
        return Ok(());
    };
    let unique: BTreeSet<&str> = units.iter().map(String::as_str).collect();
    if unique.len() > 1 {
        return Err(LedgerError::domain(
            ErrorCode::MixedScale,
            format!(
                "mixed or incompatible units: {}",
                unique.into_iter().collect::<Vec<_>>().join(", ")
            ),
        ));
    }
    Ok(())
}

/// `Γ.MISTYPED` when the holon collection is empty or no explicit
/// boundary has been declared for the fold.
pub fn guard_gamma_typing(
    holons: &[serde_json::Value],
    has_boundary: bool,
) -> Result<(), LedgerError> {
    if holons.is_empty() || !has_boundary {
        return Err(LedgerError::domain(
            ErrorCode::GammaMistyped,
            "gamma fold over non-holons or without a declared boundary",
        ));
    }
    Ok(())
}
