use carapace::core::error::ErrorCode;
use carapace::domain::guards::*;
use carapace::domain::types::{
    Bridge, BridgeEnd, HolderKind, RoleAssignment, Rsg, Transition, Window,
};
use serde_json::json;

fn window(from: &str, to: &str) -> Window {
    Window {
        from: from.to_string(),
        to: to.to_string(),
    }
}

fn assignment(holder_ref: &str, role: &str, from: &str, to: &str) -> RoleAssignment {
    RoleAssignment {
        id: format!("ra::{}#{}", holder_ref, role),
        holder: HolderKind::System,
        holder_ref: Some(holder_ref.to_string()),
        role: role.to_string(),
        role_id: None,
        ctx: "ctx::demo@1".to_string(),
        window: window(from, to),
        created_at: String::new(),
        updated_at: String::new(),
    }
}

fn review_rsg() -> Rsg {
    Rsg {
        states: vec!["idle".into(), "active".into(), "done".into()],
        transitions: vec![
            Transition { from: "idle".into(), to: "active".into() },
            Transition { from: "active".into(), to: "done".into() },
        ],
        enactable: vec!["active".into()],
    }
}

#[test]
fn window_guard_rejects_empty_and_inverted_windows() {
    assert!(guard_window(&window("2026-01-01T00:00:00Z", "2026-02-01T00:00:00Z")).is_ok());

    let inverted = guard_window(&window("2026-02-01T00:00:00Z", "2026-01-01T00:00:00Z"));
    assert_eq!(inverted.unwrap_err().code(), Some(ErrorCode::WindowInvalid));

    let empty = guard_window(&window("2026-01-01T00:00:00Z", "2026-01-01T00:00:00Z"));
    assert_eq!(empty.unwrap_err().code(), Some(ErrorCode::WindowInvalid));

    let garbage = guard_window(&window("soon", "later"));
    assert_eq!(garbage.unwrap_err().code(), Some(ErrorCode::WindowInvalid));
}

#[test]
fn rsg_well_formedness() {
    assert!(guard_rsg_well_formed(&review_rsg()).is_ok());

    let mut dangling = review_rsg();
    dangling.transitions.push(Transition {
        from: "active".into(),
        to: "archived".into(),
    });
    assert_eq!(
        guard_rsg_well_formed(&dangling).unwrap_err().code(),
        Some(ErrorCode::RsgMalformed)
    );

    let mut stray_enactable = review_rsg();
    stray_enactable.enactable.push("archived".into());
    assert_eq!(
        guard_rsg_well_formed(&stray_enactable).unwrap_err().code(),
        Some(ErrorCode::RsgMalformed)
    );
}

#[test]
fn enactable_guard() {
    let rsg = review_rsg();
    assert!(guard_enactable(&rsg, "active", "2026-01-01T00:00:00Z").is_ok());
    assert_eq!(
        guard_enactable(&rsg, "idle", "2026-01-01T00:00:00Z")
            .unwrap_err()
            .code(),
        Some(ErrorCode::NotEnactable)
    );
}

#[test]
fn work_window_is_half_open() {
    let ra = assignment("alice", "reviewer", "2026-01-01T00:00:00Z", "2026-02-01T00:00:00Z");

    assert!(guard_work_window(&ra, "2026-01-01T00:00:00Z").is_ok(), "from is inclusive");
    assert!(guard_work_window(&ra, "2026-01-15T12:00:00Z").is_ok());
    assert_eq!(
        guard_work_window(&ra, "2026-02-01T00:00:00Z").unwrap_err().code(),
        Some(ErrorCode::WindowInvalid),
        "to is exclusive"
    );
    assert_eq!(
        guard_work_window(&ra, "2025-12-31T23:59:59Z").unwrap_err().code(),
        Some(ErrorCode::WindowInvalid)
    );
}

#[test]
fn eligibility_guard_blocks_epistemes() {
    assert!(guard_eligibility(HolderKind::System).is_ok());
    assert_eq!(
        guard_eligibility(HolderKind::Episteme).unwrap_err().code(),
        Some(ErrorCode::EligibilityViolation)
    );
}

#[test]
fn separation_of_duties_on_overlapping_windows() {
    let incompatible = vec!["author".to_string(), "reviewer".to_string()];
    let existing = vec![assignment(
        "alice",
        "author",
        "2026-01-01T00:00:00Z",
        "2026-03-01T00:00:00Z",
    )];

    let overlapping = assignment("alice", "reviewer", "2026-02-01T00:00:00Z", "2026-04-01T00:00:00Z");
    assert_eq!(
        guard_separation_of_duties(&existing, &overlapping, &incompatible)
            .unwrap_err()
            .code(),
        Some(ErrorCode::SodConflict)
    );

    // Half-open windows that merely touch do not overlap.
    let touching = assignment("alice", "reviewer", "2026-03-01T00:00:00Z", "2026-04-01T00:00:00Z");
    assert!(guard_separation_of_duties(&existing, &touching, &incompatible).is_ok());

    // A different holder is free to take the incompatible role.
    let other_holder = assignment("bob", "reviewer", "2026-02-01T00:00:00Z", "2026-04-01T00:00:00Z");
    assert!(guard_separation_of_duties(&existing, &other_holder, &incompatible).is_ok());

    // Roles outside the incompatibility set never conflict.
    let unrelated = assignment("alice", "archivist", "2026-02-01T00:00:00Z", "2026-04-01T00:00:00Z");
    assert!(guard_separation_of_duties(&existing, &unrelated, &incompatible).is_ok());
}

#[test]
fn bridge_cl_guard() {
    let bridge = Bridge {
        id: "bridge::a@ctx::x@1->b@ctx::y@1".to_string(),
        from: BridgeEnd { role: Some("a".into()), kind: None, plane: None, ctx: "ctx::x@1".into() },
        to: BridgeEnd { role: Some("b".into()), kind: None, plane: None, ctx: "ctx::y@1".into() },
        cl: 0.6,
        loss_notes: None,
        created_at: String::new(),
        updated_at: String::new(),
    };
    assert!(guard_bridge_cl(&bridge, 0.5).is_ok());
    assert!(guard_bridge_cl(&bridge, 0.6).is_ok());
    assert_eq!(
        guard_bridge_cl(&bridge, 0.7).unwrap_err().code(),
        Some(ErrorCode::BridgeClTooLow)
    );
}

#[test]
fn mixed_scale_guard() {
    assert!(guard_mixed_scale(None).is_ok());
    assert!(guard_mixed_scale(Some(&[])).is_ok());
    assert!(guard_mixed_scale(Some(&["points".to_string(), "points".to_string()])).is_ok());
    assert_eq!(
        guard_mixed_scale(Some(&["points".to_string(), "hours".to_string()]))
            .unwrap_err()
            .code(),
        Some(ErrorCode::MixedScale)
    );
}

#[test]
fn gamma_typing_guard() {
    let holons = vec![json!({ "id": 1 }), json!({ "id": 2 })];
    assert!(guard_gamma_typing(&holons, true).is_ok());
    assert_eq!(
        guard_gamma_typing(&[], true).unwrap_err().code(),
        Some(ErrorCode::GammaMistyped)
    );
    assert_eq!(
        guard_gamma_typing(&holons, false).unwrap_err().code(),
        Some(ErrorCode::GammaMistyped)
    );
}
