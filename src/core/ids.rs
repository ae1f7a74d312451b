//! Identifier factory for ledger entities.
//!
//! Keys are opaque to callers but deterministic and human-readable:
//!
//! - `ctx::{name}@{edition}`
//! - `role::{role}@{ctx}`
//! - `ra::{holder}#{role}:{ctx}@{t0..t1}`
//! - `md::{name}@{rev}`
//! - `work::{ulid}` / `sa::{ulid}` / `drr::{ulid}`
//! - `svc::{name}@{ctx}@{version}`
//! - `cap::{holder}#{task_family}@{ctx}`
//! - `link::{fingerprint}`
//! - `bridge::{a}@{ctxA}->{b}@{ctxB}`
//! - `policy::E/E/{id}` / `nqd::{id}`

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use ulid::Ulid;

/// Lowercase, hyphen-separated segment; empty input becomes `_` so ids
/// never end up with zero-width components.
pub fn slug(s: &str) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    static DASHES: OnceLock<Regex> = OnceLock::new();
    let non_alnum = NON_ALNUM.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap());
    let dashes = DASHES.get_or_init(|| Regex::new(r"-+").unwrap());

    let lowered = s.trim().to_lowercase();
    let replaced = non_alnum.replace_all(&lowered, "-");
    let collapsed = dashes.replace_all(&replaced, "-");
    let out = collapsed.trim_matches('-').to_string();
    if out.is_empty() { "_".to_string() } else { out }
}

pub fn ctx_id(name: &str, edition: &str) -> String {
    format!("ctx::{}@{}", slug(name), slug(edition))
}

pub fn role_id(role: &str, ctx_id: &str) -> String {
    format!("role::{}@{}", slug(role), ctx_id)
}

pub fn ra_id(holder: &str, role: &str, ctx_id: &str, from: &str, to: &str) -> String {
    format!("ra::{}#{}:{}@{}..{}", slug(holder), slug(role), ctx_id, from, to)
}

pub fn md_id(name: &str, rev: &str) -> String {
    format!("md::{}@{}", slug(name), slug(rev))
}

pub fn work_id() -> String {
    format!("work::{}", Ulid::new())
}

pub fn assertion_id() -> String {
    format!("sa::{}", Ulid::new())
}

pub fn drr_id() -> String {
    format!("drr::{}", Ulid::new())
}

pub fn svc_id(name: &str, ctx_id: &str, version: &str) -> String {
    format!("svc::{}@{}@{}", slug(name), ctx_id, slug(version))
}

pub fn capability_id(holder: &str, task_family: &str, ctx_id: &str) -> String {
    format!("cap::{}#{}@{}", slug(holder), slug(task_family), ctx_id)
}

pub fn bridge_id(a_label: &str, a_ctx: &str, b_label: &str, b_ctx: &str) -> String {
    format!(
        "bridge::{}@{}->{}@{}",
        slug(a_label),
        a_ctx,
        slug(b_label),
        b_ctx
    )
}

pub fn policy_ee_id(id: &str) -> String {
    format!("policy::E/E/{}", slug(id))
}

pub fn nqd_id(id: &str) -> String {
    format!("nqd::{}", slug(id))
}

/// Deterministic evidence-link key: same (work, episteme, role) triple
/// always fingerprints to the same id, so re-binding is idempotent.
pub fn evidence_link_id(work: &str, episteme: &str, evidence_role: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(work);
    hasher.update("\x1f");
    hasher.update(episteme);
    hasher.update("\x1f");
    hasher.update(evidence_role);
    let digest = format!("{:x}", hasher.finalize());
    format!("link::{}", &digest[..16])
}
