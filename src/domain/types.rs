//! Typed domain records.
//!
//! Every entity is immutable-by-replacement: updates rewrite the whole
//! record and bump `updated_at` while the store preserves `created_at`.
//! Timestamps are ISO-8601 strings; windows are half-open `[from, to)`.

use crate::core::store::Entity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Half-open time window `[from, to)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolderKind {
    System,
    /// A non-actor epistemic entity: may hold a role, may never perform
    /// Work.
    Episteme,
}

impl std::fmt::Display for HolderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HolderKind::System => f.write_str("system"),
            HolderKind::Episteme => f.write_str("episteme"),
        }
    }
}

/// A named semantic namespace with an edition tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub name: String,
    pub edition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossary: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invariants: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Role character set (freeform trait list).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rcs {
    pub chars: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
}

/// Role state graph: the finite-state model governing which states a
/// role may be asserted into and from which Work may be enacted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rsg {
    pub states: Vec<String>,
    pub transitions: Vec<Transition>,
    pub enactable: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleAlgebra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub le: Option<Vec<String>>,
    /// Role names that are mutually exclusive for one holder in
    /// overlapping windows (separation of duties).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incompatible: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundles: Option<Vec<Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub ctx: String,
    pub role: String,
    pub rcs: Rcs,
    pub rsg: Rsg,
    pub algebra: RoleAlgebra,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: String,
    pub holder: HolderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_ref: Option<String>,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    pub ctx: String,
    pub window: Window,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl RoleAssignment {
    /// Holder identity used for separation-of-duties comparison.
    pub fn holder_key(&self) -> &str {
        self.holder_ref.as_deref().unwrap_or(match self.holder {
            HolderKind::System => "system",
            HolderKind::Episteme => "episteme",
        })
    }
}

/// A timestamped claim that a role assignment is in a given state.
/// Append-only; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateAssertion {
    pub id: String,
    pub ra: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist_evidence: Option<Vec<String>>,
    pub at: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodStep {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability_thresholds: Option<BTreeMap<String, f64>>,
}

/// A named, versioned procedure of ordered steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDescription {
    pub id: String,
    pub ctx: String,
    /// Human-readable `name@rev`.
    pub md: String,
    pub steps: Vec<MethodStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_service: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Vec<String>>,
}

/// One enactment of a method step by a role assignment. Created on
/// start; the completion fields are filled exactly once on end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    pub id: String,
    pub md: String,
    pub step_id: String,
    /// Role assignment id of the performer.
    pub performed_by: String,
    pub started_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub links: WorkLinks,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// A named offering within a context. Immutable once versioned; a new
/// version is a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub ctx: String,
    pub name: String,
    pub provider_role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_role: Option<String>,
    pub claim_scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_spec: Option<String>,
    pub acceptance_spec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub version: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// A holder's declared measured performance on a task family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub id: String,
    pub holder: HolderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_ref: Option<String>,
    pub ctx: String,
    pub task_family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measures: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qual_window: Option<Window>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Binds Work to an episteme ref acting in an evidence role. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceLink {
    pub id: String,
    pub work: String,
    pub episteme: String,
    pub evidence_role: String,
    pub ctx: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeEnd {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plane: Option<String>,
    pub ctx: String,
}

impl BridgeEnd {
    /// Display label used when deriving the bridge id.
    pub fn label(&self) -> &str {
        self.role
            .as_deref()
            .or(self.kind.as_deref())
            .or(self.plane.as_deref())
            .unwrap_or("end")
    }
}

/// A lossy mapping between two context-scoped endpoints; `cl` is the
/// congruence level in `[0, 1]` used to penalize cross-context evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bridge {
    pub id: String,
    pub from: BridgeEnd,
    pub to: BridgeEnd,
    pub cl: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_notes: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleProbe {
    pub s: String,
    pub points: u32,
}

/// Explore/exploit tuning record, context-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEE {
    pub id: String,
    pub explore_share: f64,
    /// `ParetoOnly` or a named alternative dominance rule.
    pub dominance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_probe: Option<ScaleProbe>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Append-only design-rationale record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrrRecord {
    pub id: String,
    pub change: String,
    pub context: String,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consequences: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

macro_rules! impl_entity {
    ($ty:ty, $collection:literal) => {
        impl Entity for $ty {
            const COLLECTION: &'static str = $collection;
            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

impl_entity!(Context, "contexts");
impl_entity!(Role, "roles");
impl_entity!(RoleAssignment, "role_assignments");
impl_entity!(StateAssertion, "state_assertions");
impl_entity!(MethodDescription, "methods");
impl_entity!(Work, "work");
impl_entity!(Service, "services");
impl_entity!(Capability, "capabilities");
impl_entity!(EvidenceLink, "evidence_links");
impl_entity!(Bridge, "bridges");
impl_entity!(PolicyEE, "policies");
impl_entity!(DrrRecord, "drr_records");
