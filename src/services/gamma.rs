//! Gamma aggregation: a typed structural fold over holon collections.
//!
//! The fold body is deliberately a placeholder: it validates typing and
//! scale, records the fold kind, and reports a count plus a fixed
//! invariant-preservation record. Real per-kind semantics are an
//! extension point; nothing downstream may assume more than the count.

use crate::core::error::LedgerError;
use crate::domain::guards::{guard_gamma_typing, guard_mixed_scale};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoldKind {
    /// Link-weighted.
    WLNK,
    /// Commutative.
    COMM,
    /// Local.
    LOC,
    /// Monotone.
    MONO,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GammaInput {
    pub ctx: String,
    pub holons: Vec<serde_json::Value>,
    pub fold: FoldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GammaWhole {
    pub fold: FoldKind,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GammaInvariants {
    pub preserved: Vec<String>,
    pub fold: FoldKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct GammaAggregate {
    pub whole: GammaWhole,
    pub invariants: GammaInvariants,
}

pub fn gamma_aggregate(input: &GammaInput) -> Result<GammaAggregate, LedgerError> {
    // Boundary metadata is not modeled yet; folds are accepted as
    // explicitly bounded until it is.
    let has_boundary = true;
    guard_gamma_typing(&input.holons, has_boundary)?;
    guard_mixed_scale(input.units.as_deref())?;

    Ok(GammaAggregate {
        whole: GammaWhole {
            fold: input.fold,
            count: input.holons.len(),
        },
        invariants: GammaInvariants {
            preserved: vec!["identity".to_string(), "boundary".to_string()],
            fold: input.fold,
        },
    })
}
