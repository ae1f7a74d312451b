use carapace::core::error::ErrorCode;
use carapace::core::time::parse_iso;
use carapace::domain::types::{Capability, HolderKind, Window, Work, WorkLinks};
use carapace::services::capability::{StepSpec, check_capability};
use carapace::services::gamma::{FoldKind, GammaInput, gamma_aggregate};
use carapace::services::nqd::{NqdInput, NqdObjectives, nqd_generate};
use carapace::services::parity::{Candidate, parity_run};
use carapace::services::service::evaluate_service;
use carapace::services::trust::{EvidenceSpan, TrustInput, compute_trust_score_at};
use serde_json::json;

fn candidate(id: &str, pairs: &[(&str, f64)]) -> Candidate {
    Candidate {
        id: id.to_string(),
        metrics: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
    }
}

#[test]
fn pareto_frontier_regression_all_non_dominated() {
    let candidates = vec![
        candidate("a", &[("cost", 10.0), ("time", 5.0)]),
        candidate("b", &[("cost", 8.0), ("time", 6.0)]),
        candidate("c", &[("cost", 7.0), ("time", 9.0)]),
        candidate("d", &[("cost", 12.0), ("time", 4.0)]),
    ];
    let result = parity_run(&candidates, None);

    let mut frontier: Vec<&str> = result.pareto_set.iter().map(|c| c.id.as_str()).collect();
    frontier.sort();
    assert_eq!(frontier, vec!["a", "b", "c", "d"]);
    assert_eq!(result.report.total, 4);
    assert_eq!(result.report.pareto, 4);
    assert_eq!(result.report.metrics, vec!["cost", "time"]);
}

#[test]
fn pareto_excludes_dominated_candidates() {
    let candidates = vec![
        candidate("good", &[("cost", 8.0), ("time", 5.0)]),
        candidate("worse", &[("cost", 9.0), ("time", 5.0)]),
        candidate("strictly-worse", &[("cost", 10.0), ("time", 7.0)]),
    ];
    let result = parity_run(&candidates, None);
    let frontier: Vec<&str> = result.pareto_set.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(frontier, vec!["good"]);
}

#[test]
fn pareto_maximize_suffix() {
    let metrics = vec!["cost".to_string(), "quality+".to_string()];
    let candidates = vec![
        candidate("cheap-bad", &[("cost", 1.0), ("quality", 0.2)]),
        candidate("pricey-good", &[("cost", 5.0), ("quality", 0.9)]),
        candidate("pricey-bad", &[("cost", 5.0), ("quality", 0.1)]),
    ];
    let result = parity_run(&candidates, Some(&metrics));
    let mut frontier: Vec<&str> = result.pareto_set.iter().map(|c| c.id.as_str()).collect();
    frontier.sort();
    assert_eq!(frontier, vec!["cheap-bad", "pricey-good"]);
}

fn evidence(to: &str) -> EvidenceSpan {
    EvidenceSpan {
        episteme: "epi::doc".to_string(),
        role: "supports".to_string(),
        timespan: Window {
            from: "2020-01-01T00:00:00Z".to_string(),
            to: to.to_string(),
        },
    }
}

fn trust_input(evidence_spans: Vec<EvidenceSpan>, bridges: usize) -> TrustInput {
    TrustInput {
        evidence: evidence_spans,
        bridges: (0..bridges).map(|i| format!("bridge::{}", i)).collect(),
        formality_f: 0.8,
        scope_g: 0.6,
        reliability_r: None,
    }
}

#[test]
fn trust_decay_is_monotone_in_evidence_age() {
    let now = parse_iso("2026-06-01T00:00:00Z").unwrap();

    let fresh = compute_trust_score_at(&trust_input(vec![evidence("2026-06-01T00:00:00Z")], 0), now)
        .unwrap();
    let stale = compute_trust_score_at(&trust_input(vec![evidence("2025-04-27T00:00:00Z")], 0), now)
        .unwrap();
    // 400-day-old evidence scores strictly below evidence dated "now".
    assert!(stale.r < fresh.r);
    assert!((fresh.r - 0.5).abs() < 1e-9, "no decay for fresh evidence");

    let bridged =
        compute_trust_score_at(&trust_input(vec![evidence("2025-04-27T00:00:00Z")], 1), now)
            .unwrap();
    assert!(bridged.r < stale.r, "a bridge citation lowers R further");
    assert_eq!(bridged.notes.len(), 2);
}

#[test]
fn trust_penalties_are_capped() {
    let now = parse_iso("2026-06-01T00:00:00Z").unwrap();

    // 10 bridges cap at 0.2; decade-old evidence caps at 0.3.
    let score =
        compute_trust_score_at(&trust_input(vec![evidence("2016-06-01T00:00:00Z")], 10), now)
            .unwrap();
    assert!((score.r - 0.0).abs() < 1e-9);
    assert!(score.notes.iter().any(|n| n.contains("-0.20")));
    assert!(score.notes.iter().any(|n| n.contains("-0.30")));
}

#[test]
fn trust_clamps_passthrough_axes() {
    let now = parse_iso("2026-06-01T00:00:00Z").unwrap();
    let input = TrustInput {
        evidence: vec![],
        bridges: vec![],
        formality_f: 1.4,
        scope_g: -0.2,
        reliability_r: Some(0.9),
    };
    let score = compute_trust_score_at(&input, now).unwrap();
    assert!((score.f - 1.0).abs() < 1e-9);
    assert!((score.g - 0.0).abs() < 1e-9);
    assert!((score.r - 0.9).abs() < 1e-9);
    assert!(score.notes.is_empty());
}

fn capability(holder_ref: &str, measures: &[(&str, f64)], qual: Option<Window>) -> Capability {
    Capability {
        id: format!("cap::{}", holder_ref),
        holder: HolderKind::System,
        holder_ref: Some(holder_ref.to_string()),
        ctx: "ctx::demo@1".to_string(),
        task_family: "review".to_string(),
        work_scope: None,
        measures: Some(measures.iter().map(|(k, v)| (k.to_string(), *v)).collect()),
        qual_window: qual,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

fn step(thresholds: &[(&str, f64)]) -> StepSpec {
    StepSpec {
        md: "md::review@1".to_string(),
        step_id: "s1".to_string(),
        thresholds: if thresholds.is_empty() {
            None
        } else {
            Some(thresholds.iter().map(|(k, v)| (k.to_string(), *v)).collect())
        },
    }
}

const AT: &str = "2026-06-01T00:00:00Z";

#[test]
fn admission_boundary_is_inclusive() {
    let caps = vec![capability("alice", &[("accuracy", 0.9)], None)];

    let exact = check_capability(&caps, "alice", &step(&[("accuracy", 0.9)]), AT).unwrap();
    assert!(exact.admissible, "a measure exactly at the threshold admits");

    let above = check_capability(&caps, "alice", &step(&[("accuracy", 0.89)]), AT).unwrap();
    assert!(above.admissible);

    let below = check_capability(&caps, "alice", &step(&[("accuracy", 0.91)]), AT).unwrap();
    assert!(!below.admissible);
    assert!(below.reasons.iter().any(|r| r.contains("< threshold")));
}

#[test]
fn admission_without_thresholds_is_trivially_admissible() {
    let admission = check_capability(&[], "alice", &step(&[]), AT).unwrap();
    assert!(admission.admissible);
    assert_eq!(admission.reasons, vec!["no thresholds specified"]);
}

#[test]
fn admission_takes_best_measure_and_ignores_other_holders() {
    let caps = vec![
        capability("alice", &[("accuracy", 0.5)], None),
        capability("alice", &[("accuracy", 0.95)], None),
        capability("bob", &[("accuracy", 0.99)], None),
    ];
    let admission = check_capability(&caps, "alice", &step(&[("accuracy", 0.9)]), AT).unwrap();
    assert!(admission.admissible, "max across alice's records clears 0.9");

    let missing = check_capability(&caps, "carol", &step(&[("accuracy", 0.1)]), AT).unwrap();
    assert!(!missing.admissible, "no records at all reads as -inf");
}

#[test]
fn admission_excludes_expired_qualification_windows() {
    let expired = Window {
        from: "2024-01-01T00:00:00Z".to_string(),
        to: "2025-01-01T00:00:00Z".to_string(),
    };
    let caps = vec![capability("alice", &[("accuracy", 0.95)], Some(expired))];
    let admission = check_capability(&caps, "alice", &step(&[("accuracy", 0.9)]), AT).unwrap();
    assert!(!admission.admissible);
}

fn work(svc: &str, started: &str, ended: &str, outcome: &str) -> Work {
    Work {
        id: format!("work::{}-{}", started, outcome),
        md: "md::review@1".to_string(),
        step_id: "s1".to_string(),
        performed_by: "ra::alice".to_string(),
        started_at: started.to_string(),
        ended_at: Some(ended.to_string()),
        outcome: Some(outcome.to_string()),
        observations: None,
        resources: None,
        links: WorkLinks {
            claims_service: Some(vec![svc.to_string()]),
            evidence: None,
        },
        created_at: String::new(),
        updated_at: String::new(),
    }
}

#[test]
fn service_kpis_over_window_slice() {
    let svc = "svc::review@ctx::demo@1@1";
    let window = Window {
        from: "2026-01-01T00:00:00Z".to_string(),
        to: "2026-12-31T00:00:00Z".to_string(),
    };
    let records = vec![
        work(svc, "2026-02-01T00:00:00Z", "2026-02-01T00:00:01Z", "success"),
        work(svc, "2026-03-01T00:00:00Z", "2026-03-01T00:00:03Z", "rejected"),
        // Outside the window: ignored.
        work(svc, "2025-01-01T00:00:00Z", "2025-01-01T00:00:09Z", "success"),
        // Different service: ignored.
        work("svc::other@ctx::demo@1@1", "2026-02-01T00:00:00Z", "2026-02-01T00:00:05Z", "success"),
    ];

    let kpis: Vec<String> = ["leadTime", "rejectRate", "uptime", "costToServe"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let metrics = evaluate_service(&records, svc, &window, &kpis).unwrap();

    assert!((metrics["leadTime"] - 2000.0).abs() < 1e-9, "mean of 1s and 3s in ms");
    assert!((metrics["rejectRate"] - 0.5).abs() < 1e-9);
    assert!((metrics["uptime"] - 0.5).abs() < 1e-9);
    assert!((metrics["costToServe"] - 0.0).abs() < 1e-9);
}

#[test]
fn service_kpis_empty_slice_is_all_zeroes() {
    let window = Window {
        from: "2026-01-01T00:00:00Z".to_string(),
        to: "2026-12-31T00:00:00Z".to_string(),
    };
    let kpis: Vec<String> = ["leadTime", "rejectRate", "uptime"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let metrics = evaluate_service(&[], "svc::ghost@ctx::demo@1@1", &window, &kpis).unwrap();
    assert!((metrics["leadTime"] - 0.0).abs() < 1e-9);
    assert!((metrics["rejectRate"] - 0.0).abs() < 1e-9);
    assert!((metrics["uptime"] - 0.0).abs() < 1e-9);
}

#[test]
fn gamma_records_fold_and_count_only() {
    let input = GammaInput {
        ctx: "ctx::demo@1".to_string(),
        holons: vec![json!({ "id": 1 }), json!({ "id": 2 }), json!({ "id": 3 })],
        fold: FoldKind::COMM,
        units: Some(vec!["points".to_string(), "points".to_string()]),
    };
    let aggregate = gamma_aggregate(&input).unwrap();
    assert_eq!(aggregate.whole.count, 3);
    assert_eq!(aggregate.whole.fold, FoldKind::COMM);
    assert_eq!(aggregate.invariants.preserved, vec!["identity", "boundary"]);
}

#[test]
fn gamma_rejects_mixed_scales_and_empty_holons() {
    let mixed = GammaInput {
        ctx: "ctx::demo@1".to_string(),
        holons: vec![json!({})],
        fold: FoldKind::WLNK,
        units: Some(vec!["points".to_string(), "hours".to_string()]),
    };
    assert_eq!(
        gamma_aggregate(&mixed).unwrap_err().code(),
        Some(ErrorCode::MixedScale)
    );

    let empty = GammaInput {
        ctx: "ctx::demo@1".to_string(),
        holons: vec![],
        fold: FoldKind::MONO,
        units: None,
    };
    assert_eq!(
        gamma_aggregate(&empty).unwrap_err().code(),
        Some(ErrorCode::GammaMistyped)
    );
}

#[test]
fn nqd_illumination_is_clamped_objective_mean() {
    let portfolio = nqd_generate(&NqdInput {
        ctx: "ctx::demo@1".to_string(),
        objectives: NqdObjectives { n: 0.3, u: 0.6, c: 0.9 },
        editions: vec!["2026.1".to_string()],
        policy: "policy::E/E/default".to_string(),
    });
    assert!((portfolio.illumination - 0.6).abs() < 1e-9);
    assert!(portfolio.portfolio.is_empty());
    assert_eq!(portfolio.pins.editions, vec!["2026.1"]);

    let hot = nqd_generate(&NqdInput {
        ctx: "ctx::demo@1".to_string(),
        objectives: NqdObjectives { n: 2.0, u: 2.0, c: 2.0 },
        editions: vec![],
        policy: "policy::E/E/default".to_string(),
    });
    assert!((hot.illumination - 1.0).abs() < 1e-9);
}
