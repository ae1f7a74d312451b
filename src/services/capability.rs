//! Capability admission: does a holder's declared measured performance
//! clear a method step's numeric thresholds?

use crate::core::error::LedgerError;
use crate::core::time::parse_iso;
use crate::domain::types::Capability;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    pub md: String,
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Admission {
    pub admissible: bool,
    pub reasons: Vec<String>,
}

/// Thresholds are met against the *maximum* declared measure across all
/// of the holder's qualifying capability records; absence reads as
/// negative infinity. Comparison is `>=`: a measure exactly at the
/// threshold admits.
pub fn check_capability(
    capabilities: &[Capability],
    holder: &str,
    step: &StepSpec,
    at: &str,
) -> Result<Admission, LedgerError> {
    let thresholds = match &step.thresholds {
        Some(t) if !t.is_empty() => t,
        _ => {
            return Ok(Admission {
                admissible: true,
                reasons: vec!["no thresholds specified".to_string()],
            });
        }
    };

    let at_ts = parse_iso(at)?;
    let mut qualifying: Vec<&Capability> = Vec::new();
    for cap in capabilities {
        let held_by = cap.holder_ref.as_deref().unwrap_or("system");
        if held_by != holder && holder != "system" {
            continue;
        }
        // A qualification window that does not contain `at` disqualifies
        // the record for this check.
        if let Some(window) = &cap.qual_window {
            let from = parse_iso(&window.from)?;
            let to = parse_iso(&window.to)?;
            if at_ts < from || at_ts >= to {
                continue;
            }
        }
        qualifying.push(cap);
    }

    let mut best: FxHashMap<&str, f64> = FxHashMap::default();
    for cap in &qualifying {
        if let Some(measures) = &cap.measures {
            for (key, value) in measures {
                let entry = best.entry(key.as_str()).or_insert(f64::NEG_INFINITY);
                if *value > *entry {
                    *entry = *value;
                }
            }
        }
    }

    let mut reasons = Vec::new();
    let mut admissible = true;
    for (key, threshold) in thresholds {
        let measured = best.get(key.as_str()).copied().unwrap_or(f64::NEG_INFINITY);
        if measured >= *threshold {
            reasons.push(format!(
                "measure {}={} meets threshold {}",
                key, measured, threshold
            ));
        } else {
            admissible = false;
            reasons.push(format!(
                "measure {}={} < threshold {}",
                key, measured, threshold
            ));
        }
    }
    if admissible {
        reasons.push("all thresholds satisfied".to_string());
    }
    Ok(Admission {
        admissible,
        reasons,
    })
}
