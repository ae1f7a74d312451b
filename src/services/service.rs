//! Service KPI evaluation over completed Work records.

use crate::core::error::LedgerError;
use crate::core::time::parse_iso;
use crate::domain::types::{Window, Work};
use std::collections::BTreeMap;

pub const KPI_LEAD_TIME: &str = "leadTime";
pub const KPI_REJECT_RATE: &str = "rejectRate";
pub const KPI_UPTIME: &str = "uptime";
pub const KPI_COST_TO_SERVE: &str = "costToServe";

fn claims_service(work: &Work, service_id: &str) -> bool {
    work.links
        .claims_service
        .as_ref()
        .is_some_and(|ids| ids.iter().any(|id| id == service_id))
}

/// Evaluate the requested KPIs over the slice of Work that claims the
/// service and whose `[started_at, ended_at]` lies within `window`.
/// Rate KPIs are 0 over an empty slice; `costToServe` is an explicit
/// placeholder (resource accounting is not modeled yet) and always 0.
pub fn evaluate_service(
    work: &[Work],
    service_id: &str,
    window: &Window,
    kpis: &[String],
) -> Result<BTreeMap<String, f64>, LedgerError> {
    let from = parse_iso(&window.from)?;
    let to = parse_iso(&window.to)?;

    let mut slice: Vec<(&Work, i64)> = Vec::new();
    for item in work.iter().filter(|w| claims_service(w, service_id)) {
        let Some(ended_at) = &item.ended_at else {
            continue;
        };
        let started = parse_iso(&item.started_at)?;
        let ended = parse_iso(ended_at)?;
        if started >= from && ended <= to {
            slice.push((item, (ended - started).num_milliseconds()));
        }
    }

    let total = slice.len();
    let outcome_fraction = |outcome: &str| -> f64 {
        if total == 0 {
            return 0.0;
        }
        let hits = slice
            .iter()
            .filter(|(w, _)| {
                w.outcome
                    .as_deref()
                    .is_some_and(|o| o.eq_ignore_ascii_case(outcome))
            })
            .count();
        hits as f64 / total as f64
    };

    let mut metrics = BTreeMap::new();
    for kpi in kpis {
        match kpi.as_str() {
            KPI_LEAD_TIME => {
                let mean = if total == 0 {
                    0.0
                } else {
                    slice.iter().map(|(_, ms)| *ms as f64).sum::<f64>() / total as f64
                };
                metrics.insert(KPI_LEAD_TIME.to_string(), mean);
            }
            KPI_REJECT_RATE => {
                metrics.insert(KPI_REJECT_RATE.to_string(), outcome_fraction("rejected"));
            }
            KPI_UPTIME => {
                metrics.insert(KPI_UPTIME.to_string(), outcome_fraction("success"));
            }
            KPI_COST_TO_SERVE => {
                metrics.insert(KPI_COST_TO_SERVE.to_string(), 0.0);
            }
            _ => {}
        }
    }
    Ok(metrics)
}
