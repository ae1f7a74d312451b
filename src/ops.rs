//! The ledger's operation surface.
//!
//! [`Ledger`] is the single storage handle for a process: construct it
//! once, share it by reference, and call [`Ledger::shutdown`] to drain
//! in-flight writes before exit. Every mutation follows the same
//! corridor: identifier factory → guards → entity store → event log.
//! A failing guard leaves both the store and the event log untouched.

use crate::core::config::{BackendKind, LedgerConfig};
use crate::core::error::{ErrorCode, LedgerError};
use crate::core::event_log::{EventEnvelope, EventLog, EventRecord, EventType, LogStats};
use crate::core::ids;
use crate::core::json_store::JsonStore;
use crate::core::sqlite_store::SqliteStore;
use crate::core::store::{CollectionStat, Entity, EntityStore};
use crate::core::{schemas, time};
use crate::domain::guards;
use crate::domain::types::{
    Bridge, BridgeEnd, Capability, Context, DrrRecord, EvidenceLink, HolderKind,
    MethodDescription, MethodStep, PolicyEE, Rcs, Role, RoleAlgebra, RoleAssignment, Rsg,
    ScaleProbe, Service, StateAssertion, Window, Work, WorkLinks,
};
use crate::services::capability::{Admission, StepSpec, check_capability};
use crate::services::gamma::{GammaAggregate, GammaInput, gamma_aggregate};
use crate::services::nqd::{NqdInput, NqdPortfolio, nqd_generate};
use crate::services::parity::{Candidate, ParityResult, parity_run};
use crate::services::service::evaluate_service;
use crate::services::trust::{TrustInput, TrustScore, compute_trust_score};
use serde_json::json;
use std::collections::BTreeMap;

/// Envelope context for operations that are not scoped to one Context.
const GLOBAL_CTX: &str = "global";

pub struct Ledger {
    backend: Box<dyn EntityStore>,
    events: EventLog,
    read_only: bool,
}

// ----- operation inputs -----

#[derive(Debug, Clone, Default)]
pub struct ContextInput {
    pub name: String,
    pub edition: String,
    pub glossary: Option<BTreeMap<String, String>>,
    pub invariants: Option<Vec<String>>,
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct RoleInput {
    pub ctx: String,
    pub role: String,
    pub rcs: Rcs,
    pub rsg: Rsg,
    pub algebra: RoleAlgebra,
}

#[derive(Debug, Clone)]
pub struct AssignRoleInput {
    pub holder: HolderKind,
    pub holder_ref: Option<String>,
    pub role: String,
    pub ctx: String,
    pub window: Window,
}

#[derive(Debug, Clone)]
pub struct AssertStateInput {
    pub ra: String,
    pub state: String,
    pub evidence: Option<Vec<String>>,
    pub at: String,
}

#[derive(Debug, Clone)]
pub struct MethodInput {
    pub ctx: String,
    pub name: String,
    pub rev: String,
    pub steps: Vec<MethodStep>,
    pub references: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct StartWorkInput {
    pub md: String,
    pub step_id: String,
    /// Role assignment id of the performer.
    pub performed_by: String,
    pub at: String,
}

#[derive(Debug, Clone, Default)]
pub struct EndWorkInput {
    pub work: String,
    pub outcome: String,
    pub observations: Option<Vec<String>>,
    pub resources: Option<BTreeMap<String, serde_json::Value>>,
    pub links: Option<WorkLinks>,
}

#[derive(Debug, Clone)]
pub struct LinkEvidenceInput {
    pub work: String,
    pub episteme: String,
    pub evidence_role: String,
    pub ctx: String,
}

#[derive(Debug, Clone)]
pub struct DeclareCapabilityInput {
    pub holder: HolderKind,
    pub holder_ref: Option<String>,
    pub ctx: String,
    pub task_family: String,
    pub work_scope: Option<String>,
    pub measures: Option<BTreeMap<String, f64>>,
    pub qual_window: Option<Window>,
}

#[derive(Debug, Clone)]
pub struct DefineServiceInput {
    pub ctx: String,
    pub name: String,
    pub provider_role: String,
    pub consumer_role: Option<String>,
    pub claim_scope: String,
    pub access_spec: Option<String>,
    pub acceptance_spec: String,
    pub unit: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct DefineBridgeInput {
    pub from: BridgeEnd,
    pub to: BridgeEnd,
    pub cl: f64,
    pub loss_notes: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct PolicyInput {
    pub policy_id: String,
    pub explore_share: f64,
    pub dominance: String,
    pub scale_probe: Option<ScaleProbe>,
}

#[derive(Debug, Clone)]
pub struct DrrInput {
    pub change: String,
    pub context: String,
    pub rationale: String,
    pub alternatives: Option<Vec<String>>,
    pub consequences: Option<Vec<String>>,
    pub refs: Option<Vec<String>>,
}

// ----- handle -----

impl Ledger {
    pub fn open(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let backend: Box<dyn EntityStore> = match config.backend {
            BackendKind::Sqlite => Box::new(SqliteStore::open(
                &config.data_dir.join(schemas::LEDGER_DB_NAME),
            )?),
            BackendKind::Json => Box::new(JsonStore::open(&config.data_dir)?),
        };
        let events = EventLog::open(
            &config.data_dir,
            config.event_log.max_bytes,
            config.event_log.retention,
        )?;
        Ok(Self {
            backend,
            events,
            read_only: config.read_only,
        })
    }

    /// Drain in-flight writes and release the storage handle.
    pub fn shutdown(self) {
        self.backend.drain();
    }

    fn guard_writable(&self) -> Result<(), LedgerError> {
        if self.read_only {
            return Err(LedgerError::domain(
                ErrorCode::ReadOnly,
                "ledger is configured read-only",
            ));
        }
        Ok(())
    }

    fn record(
        &self,
        event_type: EventType,
        envelope: EventEnvelope,
        payload: serde_json::Value,
    ) -> Result<(), LedgerError> {
        // A read-only ledger performs no writes at all, audit included.
        if self.read_only {
            return Ok(());
        }
        self.events
            .append(&EventRecord::new(event_type, envelope, payload))
    }

    // ----- typed store access -----

    pub fn list<T: Entity>(&self) -> Result<Vec<T>, LedgerError> {
        let mut out = Vec::new();
        for value in self.backend.list(T::COLLECTION)? {
            match serde_json::from_value::<T>(value) {
                Ok(item) => out.push(item),
                Err(e) => eprintln!(
                    "warning: skipping malformed record in '{}': {}",
                    T::COLLECTION,
                    e
                ),
            }
        }
        Ok(out)
    }

    pub fn get<T: Entity>(&self, id: &str) -> Result<Option<T>, LedgerError> {
        match self.backend.get(T::COLLECTION, id)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn require<T: Entity>(&self, id: &str) -> Result<T, LedgerError> {
        self.get::<T>(id)?
            .ok_or_else(|| LedgerError::not_found(format!("{} '{}'", T::COLLECTION, id)))
    }

    fn put<T: Entity>(&self, item: &T) -> Result<T, LedgerError> {
        let value = serde_json::to_value(item)?;
        let stored = self.backend.upsert(T::COLLECTION, item.id(), value)?;
        Ok(serde_json::from_value(stored)?)
    }

    fn require_context(&self, ctx_id: &str) -> Result<Context, LedgerError> {
        self.require::<Context>(ctx_id)
    }

    // ----- contexts and roles -----

    /// Idempotent by `(name, edition)`: the id is derived from both, so
    /// re-upserting replaces the record in place.
    pub fn upsert_context(&self, input: ContextInput) -> Result<Context, LedgerError> {
        self.guard_writable()?;
        let id = ids::ctx_id(&input.name, &input.edition);
        let context = Context {
            id: id.clone(),
            name: input.name,
            edition: input.edition,
            glossary: input.glossary,
            invariants: input.invariants,
            roles: input.roles,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let stored = self.put(&context)?;
        self.record(
            EventType::ContextUpserted,
            EventEnvelope::for_ctx(id),
            json!({ "name": stored.name, "edition": stored.edition }),
        )?;
        Ok(stored)
    }

    pub fn upsert_role(&self, input: RoleInput) -> Result<Role, LedgerError> {
        self.guard_writable()?;
        self.require_context(&input.ctx)?;
        guards::guard_rsg_well_formed(&input.rsg)?;
        let id = ids::role_id(&input.role, &input.ctx);
        let role = Role {
            id: id.clone(),
            ctx: input.ctx.clone(),
            role: input.role,
            rcs: input.rcs,
            rsg: input.rsg,
            algebra: input.algebra,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let stored = self.put(&role)?;
        self.record(
            EventType::RoleUpserted,
            EventEnvelope::for_ctx(input.ctx),
            json!({ "role": stored.role, "id": id }),
        )?;
        Ok(stored)
    }

    pub fn assign_role(&self, input: AssignRoleInput) -> Result<RoleAssignment, LedgerError> {
        self.guard_writable()?;
        self.require_context(&input.ctx)?;
        guards::guard_window(&input.window)?;

        let role_record = self.get::<Role>(&ids::role_id(&input.role, &input.ctx))?;
        let holder_label = input
            .holder_ref
            .clone()
            .unwrap_or_else(|| input.holder.to_string());
        let assignment = RoleAssignment {
            id: ids::ra_id(
                &holder_label,
                &input.role,
                &input.ctx,
                &input.window.from,
                &input.window.to,
            ),
            holder: input.holder,
            holder_ref: input.holder_ref,
            role: input.role,
            role_id: role_record.as_ref().map(|r| r.id.clone()),
            ctx: input.ctx.clone(),
            window: input.window,
            created_at: String::new(),
            updated_at: String::new(),
        };

        // Separation of duties applies when the role record declares
        // incompatibilities.
        if let Some(role) = &role_record {
            if let Some(incompatible) = &role.algebra.incompatible {
                let existing: Vec<RoleAssignment> = self.list()?;
                guards::guard_separation_of_duties(&existing, &assignment, incompatible)?;
            }
        }

        let stored = self.put(&assignment)?;
        self.record(
            EventType::RoleAssigned,
            EventEnvelope {
                ctx: input.ctx,
                performed_by: Some(holder_label),
                ..EventEnvelope::default()
            },
            json!({ "ra": stored.id, "role": stored.role, "window": stored.window }),
        )?;
        Ok(stored)
    }

    pub fn assert_state(&self, input: AssertStateInput) -> Result<StateAssertion, LedgerError> {
        self.guard_writable()?;
        let ra: RoleAssignment = self.require(&input.ra)?;
        let role_id = ra
            .role_id
            .clone()
            .unwrap_or_else(|| ids::role_id(&ra.role, &ra.ctx));
        let role: Role = self.require(&role_id)?;
        guards::guard_enactable(&role.rsg, &input.state, &input.at)?;

        let assertion = StateAssertion {
            id: ids::assertion_id(),
            ra: input.ra.clone(),
            state: input.state,
            checklist_evidence: input.evidence,
            at: input.at,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let stored = self.put(&assertion)?;
        self.record(
            EventType::StateAsserted,
            EventEnvelope {
                performed_by: Some(ra.holder_key().to_string()),
                ctx: ra.ctx,
                ..EventEnvelope::default()
            },
            json!({ "ra": input.ra, "state": stored.state, "at": stored.at }),
        )?;
        Ok(stored)
    }

    // ----- methods and work -----

    pub fn define_method(&self, input: MethodInput) -> Result<MethodDescription, LedgerError> {
        self.guard_writable()?;
        self.require_context(&input.ctx)?;
        let id = ids::md_id(&input.name, &input.rev);
        let method = MethodDescription {
            id: id.clone(),
            ctx: input.ctx,
            md: format!("{}@{}", input.name, input.rev),
            steps: input.steps,
            references: input.references,
            created_at: String::new(),
            updated_at: String::new(),
        };
        self.put(&method)
    }

    pub fn start_work(&self, input: StartWorkInput) -> Result<Work, LedgerError> {
        self.guard_writable()?;
        let ra: RoleAssignment = self.require(&input.performed_by)?;
        guards::guard_eligibility(ra.holder)?;
        guards::guard_work_window(&ra, &input.at)?;
        let method: MethodDescription = self.require(&input.md)?;
        if !method.steps.iter().any(|s| s.id == input.step_id) {
            return Err(LedgerError::not_found(format!(
                "step '{}' in {}",
                input.step_id, method.id
            )));
        }

        let work = Work {
            id: ids::work_id(),
            md: input.md,
            step_id: input.step_id,
            performed_by: input.performed_by,
            started_at: input.at.clone(),
            ended_at: None,
            outcome: None,
            observations: None,
            resources: None,
            links: WorkLinks::default(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        let stored = self.put(&work)?;
        self.record(
            EventType::WorkStarted,
            EventEnvelope {
                ctx: ra.ctx,
                performed_by: Some(stored.performed_by.clone()),
                ..EventEnvelope::default()
            },
            json!({ "work": stored.id, "md": stored.md, "step": stored.step_id, "at": input.at }),
        )?;
        Ok(stored)
    }

    /// Completion is legal exactly once; a second end fails
    /// `WORK.ALREADY_ENDED` without touching the record.
    pub fn end_work(&self, input: EndWorkInput) -> Result<Work, LedgerError> {
        self.guard_writable()?;
        let mut work: Work = self.require(&input.work)?;
        if work.ended_at.is_some() {
            return Err(LedgerError::domain(
                ErrorCode::WorkAlreadyEnded,
                format!("work '{}' already ended", work.id),
            ));
        }
        work.ended_at = Some(time::now_iso());
        work.outcome = Some(input.outcome);
        work.observations = input.observations;
        work.resources = input.resources;
        if let Some(links) = input.links {
            merge_links(&mut work.links, links);
        }
        let stored = self.put(&work)?;
        let ctx = self
            .get::<RoleAssignment>(&stored.performed_by)?
            .map(|ra| ra.ctx)
            .unwrap_or_else(|| GLOBAL_CTX.to_string());
        self.record(
            EventType::WorkEnded,
            EventEnvelope {
                ctx,
                performed_by: Some(stored.performed_by.clone()),
                ..EventEnvelope::default()
            },
            json!({ "work": stored.id, "outcome": stored.outcome }),
        )?;
        Ok(stored)
    }

    pub fn link_evidence(&self, input: LinkEvidenceInput) -> Result<EvidenceLink, LedgerError> {
        self.guard_writable()?;
        let mut work: Work = self.require(&input.work)?;
        let link = EvidenceLink {
            id: ids::evidence_link_id(&input.work, &input.episteme, &input.evidence_role),
            work: input.work.clone(),
            episteme: input.episteme,
            evidence_role: input.evidence_role,
            ctx: input.ctx.clone(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        let stored = self.put(&link)?;

        let evidence = work.links.evidence.get_or_insert_with(Vec::new);
        if !evidence.contains(&stored.id) {
            evidence.push(stored.id.clone());
            self.put(&work)?;
        }

        self.record(
            EventType::EvidenceBound,
            EventEnvelope::for_ctx(input.ctx),
            json!({ "work": stored.work, "episteme": stored.episteme, "link": stored.id }),
        )?;
        Ok(stored)
    }

    // ----- capabilities -----

    pub fn declare_capability(
        &self,
        input: DeclareCapabilityInput,
    ) -> Result<Capability, LedgerError> {
        self.guard_writable()?;
        self.require_context(&input.ctx)?;
        let holder_label = input
            .holder_ref
            .clone()
            .unwrap_or_else(|| input.holder.to_string());
        let capability = Capability {
            id: ids::capability_id(&holder_label, &input.task_family, &input.ctx),
            holder: input.holder,
            holder_ref: input.holder_ref,
            ctx: input.ctx.clone(),
            task_family: input.task_family,
            work_scope: input.work_scope,
            measures: input.measures,
            qual_window: input.qual_window,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let stored = self.put(&capability)?;
        self.record(
            EventType::CapabilityDeclared,
            EventEnvelope {
                ctx: input.ctx,
                performed_by: Some(holder_label),
                ..EventEnvelope::default()
            },
            json!({ "capability": stored.id, "task_family": stored.task_family }),
        )?;
        Ok(stored)
    }

    pub fn check_capability(
        &self,
        holder: &str,
        step: &StepSpec,
        at: &str,
    ) -> Result<Admission, LedgerError> {
        let capabilities: Vec<Capability> = self.list()?;
        check_capability(&capabilities, holder, step, at)
    }

    // ----- services -----

    pub fn define_service(&self, input: DefineServiceInput) -> Result<Service, LedgerError> {
        self.guard_writable()?;
        self.require_context(&input.ctx)?;
        let id = ids::svc_id(&input.name, &input.ctx, &input.version);
        let service = Service {
            id: id.clone(),
            ctx: input.ctx.clone(),
            name: input.name,
            provider_role: input.provider_role,
            consumer_role: input.consumer_role,
            claim_scope: input.claim_scope,
            access_spec: input.access_spec,
            acceptance_spec: input.acceptance_spec,
            unit: input.unit,
            version: input.version,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let stored = self.put(&service)?;
        self.record(
            EventType::ServiceDefined,
            EventEnvelope::for_ctx(input.ctx),
            json!({ "service": id, "version": stored.version }),
        )?;
        Ok(stored)
    }

    pub fn evaluate_service(
        &self,
        service_id: &str,
        window: &Window,
        kpis: &[String],
    ) -> Result<BTreeMap<String, f64>, LedgerError> {
        let service: Service = self.require(service_id)?;
        let work: Vec<Work> = self.list()?;
        let metrics = evaluate_service(&work, service_id, window, kpis)?;
        self.record(
            EventType::ServiceEvaluated,
            EventEnvelope::for_ctx(service.ctx.as_str()),
            json!({ "service": service_id, "window": window, "metrics": metrics }),
        )?;
        Ok(metrics)
    }

    // ----- analytics -----

    pub fn run_parity(
        &self,
        candidates: &[Candidate],
        metrics: Option<&[String]>,
    ) -> Result<ParityResult, LedgerError> {
        let result = parity_run(candidates, metrics);
        self.record(
            EventType::ParityRun,
            EventEnvelope::for_ctx(GLOBAL_CTX),
            serde_json::to_value(&result.report)?,
        )?;
        Ok(result)
    }

    pub fn score_trust(&self, input: &TrustInput) -> Result<TrustScore, LedgerError> {
        let score = compute_trust_score(input)?;
        self.record(
            EventType::TrustScored,
            EventEnvelope::for_ctx(GLOBAL_CTX),
            serde_json::to_value(&score)?,
        )?;
        Ok(score)
    }

    pub fn gamma_aggregate(&self, input: &GammaInput) -> Result<GammaAggregate, LedgerError> {
        gamma_aggregate(input)
    }

    pub fn nqd_generate(&self, input: &NqdInput) -> Result<NqdPortfolio, LedgerError> {
        Ok(nqd_generate(input))
    }

    // ----- bridges, policy, decision records -----

    pub fn define_bridge(&self, input: DefineBridgeInput) -> Result<Bridge, LedgerError> {
        self.guard_writable()?;
        let id = ids::bridge_id(
            input.from.label(),
            &input.from.ctx,
            input.to.label(),
            &input.to.ctx,
        );
        let bridge = Bridge {
            id: id.clone(),
            from: input.from,
            to: input.to,
            cl: input.cl.clamp(0.0, 1.0),
            loss_notes: input.loss_notes,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let stored = self.put(&bridge)?;
        self.record(
            EventType::BridgeDefined,
            EventEnvelope::for_ctx(stored.from.ctx.as_str()),
            json!({ "bridge": id, "cl": stored.cl }),
        )?;
        Ok(stored)
    }

    pub fn set_ee_policy(&self, input: PolicyInput) -> Result<PolicyEE, LedgerError> {
        self.guard_writable()?;
        let policy = PolicyEE {
            id: ids::policy_ee_id(&input.policy_id),
            explore_share: input.explore_share,
            dominance: input.dominance,
            scale_probe: input.scale_probe,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let stored = self.put(&policy)?;
        self.record(
            EventType::PolicySet,
            EventEnvelope::for_ctx(GLOBAL_CTX),
            json!({ "policy": stored.id, "dominance": stored.dominance }),
        )?;
        Ok(stored)
    }

    pub fn record_drr(&self, input: DrrInput) -> Result<DrrRecord, LedgerError> {
        self.guard_writable()?;
        let record = DrrRecord {
            id: ids::drr_id(),
            change: input.change,
            context: input.context,
            rationale: input.rationale,
            alternatives: input.alternatives,
            consequences: input.consequences,
            refs: input.refs,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let stored = self.put(&record)?;
        self.record(
            EventType::DrrRecorded,
            EventEnvelope::for_ctx(GLOBAL_CTX),
            json!({ "drr": stored.id, "change": stored.change }),
        )?;
        Ok(stored)
    }

    // ----- introspection -----

    /// Raw dump of a collection by name, for inspection tooling.
    pub fn dump_collection(&self, collection: &str) -> Result<Vec<serde_json::Value>, LedgerError> {
        self.backend.list(collection)
    }

    pub fn event_log_stats(&self) -> Result<LogStats, LedgerError> {
        self.events.stats()
    }

    pub fn store_stats(&self) -> Result<Vec<CollectionStat>, LedgerError> {
        self.backend.stats()
    }
}

fn merge_links(existing: &mut WorkLinks, incoming: WorkLinks) {
    if let Some(claims) = incoming.claims_service {
        let target = existing.claims_service.get_or_insert_with(Vec::new);
        for id in claims {
            if !target.contains(&id) {
                target.push(id);
            }
        }
    }
    if let Some(evidence) = incoming.evidence {
        let target = existing.evidence.get_or_insert_with(Vec::new);
        for id in evidence {
            if !target.contains(&id) {
                target.push(id);
            }
        }
    }
}
