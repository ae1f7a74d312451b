//! Novelty/quality/diversity portfolio generation.
//!
//! Placeholder: returns an empty portfolio with an illumination gauge
//! derived from the objective triple. Kept explicit rather than invented;
//! descriptor-map-driven generation is an extension point.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NqdObjectives {
    pub n: f64,
    pub u: f64,
    pub c: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NqdInput {
    pub ctx: String,
    pub objectives: NqdObjectives,
    #[serde(default)]
    pub editions: Vec<String>,
    /// `policy::E/E/*` reference.
    pub policy: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NqdPins {
    pub editions: Vec<String>,
    pub path_slice_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NqdPortfolio {
    pub portfolio: Vec<serde_json::Value>,
    /// Gauge in `[0, 1]`.
    pub illumination: f64,
    pub pins: NqdPins,
}

pub fn nqd_generate(input: &NqdInput) -> NqdPortfolio {
    let NqdObjectives { n, u, c } = input.objectives;
    let illumination = ((n + u + c) / 3.0).clamp(0.0, 1.0);
    NqdPortfolio {
        portfolio: Vec::new(),
        illumination,
        pins: NqdPins {
            editions: input.editions.clone(),
            path_slice_id: None,
        },
    }
}
