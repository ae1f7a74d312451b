//! Trust scoring with temporal decay and cross-context bridge penalties.

use crate::core::error::LedgerError;
use crate::core::time::days_between;
use crate::domain::types::Window;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSpan {
    pub episteme: String,
    pub role: String,
    pub timespan: Window,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustInput {
    #[serde(default)]
    pub evidence: Vec<EvidenceSpan>,
    /// Bridge ids cited when evidence crosses contexts.
    #[serde(default)]
    pub bridges: Vec<String>,
    pub formality_f: f64,
    pub scope_g: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability_r: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustScore {
    pub f: f64,
    pub g: f64,
    pub r: f64,
    pub notes: Vec<String>,
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Score trust as of `now`.
///
/// `f` (formality) and `g` (scope) are clamped to `[0, 1]` and passed
/// through. `r` (reliability) defaults to 0.5, then is reduced by a
/// bridge penalty of `min(0.2, 0.05 × bridge_count)` and a freshness
/// penalty of `min(0.3, age_days / 365 × 0.3)` from the newest evidence
/// timespan end, re-clamping after each. Every applied penalty leaves a
/// note.
pub fn compute_trust_score_at(
    input: &TrustInput,
    now: DateTime<Utc>,
) -> Result<TrustScore, LedgerError> {
    let mut notes = Vec::new();
    let f = clamp01(input.formality_f);
    let g = clamp01(input.scope_g);
    let mut r = clamp01(input.reliability_r.unwrap_or(0.5));

    if !input.bridges.is_empty() {
        let penalty = (input.bridges.len() as f64 * 0.05).min(0.2);
        r = clamp01(r - penalty);
        notes.push(format!(
            "Applied CL penalty for {} bridge(s): -{:.2}",
            input.bridges.len(),
            penalty
        ));
    }

    let newest_end = input
        .evidence
        .iter()
        .map(|e| e.timespan.to.as_str())
        .max();
    if let Some(newest_end) = newest_end {
        let age_days = days_between(newest_end, now)?.max(0.0);
        let decay = (age_days / 365.0 * 0.3).min(0.3);
        r = clamp01(r - decay);
        notes.push(format!(
            "Applied freshness decay for {:.0} days: -{:.2}",
            age_days, decay
        ));
    }

    Ok(TrustScore { f, g, r, notes })
}

pub fn compute_trust_score(input: &TrustInput) -> Result<TrustScore, LedgerError> {
    compute_trust_score_at(input, Utc::now())
}
