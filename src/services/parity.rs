//! Pareto-frontier ranking over candidate measure maps.
//!
//! Metrics are minimized unless the name carries a trailing `+`
//! (maximize). A dominates B iff A is at least as good on every metric
//! and strictly better on at least one. The frontier is computed by the
//! pairwise scan: O(n²·m), parallelized across candidates, which is fine
//! at the intended scale of tens to low hundreds.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub metrics: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParityReport {
    pub metrics: Vec<String>,
    pub total: usize,
    pub pareto: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParityResult {
    pub report: ParityReport,
    pub pareto_set: Vec<Candidate>,
}

fn measure(candidate: &Candidate, metric: &str) -> f64 {
    let key = metric.strip_suffix('+').unwrap_or(metric);
    candidate.metrics.get(key).copied().unwrap_or(0.0)
}

pub fn dominates(a: &Candidate, b: &Candidate, metrics: &[String]) -> bool {
    let mut strictly_better = false;
    for metric in metrics {
        let maximize = metric.ends_with('+');
        let am = measure(a, metric);
        let bm = measure(b, metric);
        let (better, worse) = if maximize { (am > bm, am < bm) } else { (am < bm, am > bm) };
        if worse {
            return false;
        }
        if better {
            strictly_better = true;
        }
    }
    strictly_better
}

fn infer_metrics(candidates: &[Candidate]) -> Vec<String> {
    candidates
        .first()
        .map(|c| c.metrics.keys().cloned().collect())
        .unwrap_or_default()
}

/// Rank candidates and return the non-dominated set plus a summary
/// report. When `metrics` is omitted it is inferred from the first
/// candidate's measure keys.
pub fn parity_run(candidates: &[Candidate], metrics: Option<&[String]>) -> ParityResult {
    let metrics: Vec<String> = match metrics {
        Some(m) if !m.is_empty() => m.to_vec(),
        _ => infer_metrics(candidates),
    };

    let pareto_set: Vec<Candidate> = candidates
        .par_iter()
        .filter(|candidate| {
            !candidates
                .iter()
                .any(|other| !std::ptr::eq(*candidate, other) && dominates(other, candidate, &metrics))
        })
        .cloned()
        .collect();

    ParityResult {
        report: ParityReport {
            metrics,
            total: candidates.len(),
            pareto: pareto_set.len(),
        },
        pareto_set,
    }
}
