use carapace::core::event_log::{EVENT_LOG_NAME, EventEnvelope, EventLog, EventRecord, EventType};
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn sample_event(n: usize) -> EventRecord {
    EventRecord::new(
        EventType::RoleAssigned,
        EventEnvelope::for_ctx("ctx::demo@1"),
        json!({ "n": n, "padding": "x".repeat(64) }),
    )
}

fn read_all_event_ids(data_dir: &Path, retention: usize) -> Vec<String> {
    let mut ids = Vec::new();
    let mut paths = vec![data_dir.join(EVENT_LOG_NAME)];
    for generation in 1..=retention {
        paths.push(data_dir.join(format!("{}.{}", EVENT_LOG_NAME, generation)));
    }
    for path in paths {
        if let Ok(content) = fs::read_to_string(&path) {
            for line in content.lines() {
                let record: serde_json::Value = serde_json::from_str(line).expect("valid jsonl");
                ids.push(record["event_id"].as_str().expect("event_id").to_string());
            }
        }
    }
    ids
}

#[test]
fn append_accumulates_and_reports_stats() {
    let tmp = tempdir().expect("tempdir");
    let log = EventLog::open(tmp.path(), 1024 * 1024, 5).expect("open");

    for n in 0..3 {
        log.append(&sample_event(n)).expect("append");
    }

    let stats = log.stats().expect("stats");
    assert!(stats.current_size > 0);
    assert!(stats.rotated_logs.is_empty());
    assert_eq!(stats.total_size, stats.current_size);
}

#[test]
fn rotation_keeps_every_event_exactly_once() {
    let tmp = tempdir().expect("tempdir");
    // Tiny threshold forces several rotations; retention is generous so
    // nothing ages out during the test.
    let log = EventLog::open(tmp.path(), 512, 10).expect("open");

    let appended = 20;
    for n in 0..appended {
        log.append(&sample_event(n)).expect("append");
    }

    let ids = read_all_event_ids(tmp.path(), 10);
    assert_eq!(ids.len(), appended, "no event dropped across rotations");
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), appended, "no event duplicated across rotations");

    let stats = log.stats().expect("stats");
    assert!(!stats.rotated_logs.is_empty(), "threshold crossings rotated");
    assert!(stats.current_size <= 512, "active log restarted after rotation");
}

#[test]
fn rotation_prunes_generations_beyond_retention() {
    let tmp = tempdir().expect("tempdir");
    let retention = 2;
    let log = EventLog::open(tmp.path(), 256, retention).expect("open");

    for n in 0..40 {
        log.append(&sample_event(n)).expect("append");
    }

    let stats = log.stats().expect("stats");
    assert!(stats.rotated_logs.len() <= retention);
    for rotated in &stats.rotated_logs {
        assert!(rotated.generation <= retention);
    }
    assert!(
        !tmp.path()
            .join(format!("{}.{}", EVENT_LOG_NAME, retention + 1))
            .exists(),
        "oldest generation beyond retention is deleted"
    );
}

#[test]
fn one_rotation_per_threshold_crossing() {
    let tmp = tempdir().expect("tempdir");
    let log = EventLog::open(tmp.path(), 100_000, 5).expect("open");

    // Stay under the threshold: no rotation.
    for n in 0..5 {
        log.append(&sample_event(n)).expect("append");
    }
    let stats = log.stats().expect("stats");
    assert!(stats.rotated_logs.is_empty());

    // A single crossing produces exactly one generation.
    let filler = EventRecord::new(
        EventType::TrustScored,
        EventEnvelope::for_ctx("global"),
        json!({ "padding": "y".repeat(100_000) }),
    );
    log.append(&filler).expect("append crossing");
    let stats = log.stats().expect("stats");
    assert_eq!(stats.rotated_logs.len(), 1);
    assert_eq!(stats.rotated_logs[0].generation, 1);
    assert_eq!(stats.current_size, 0);
}

#[test]
fn concurrent_appends_survive_rotation_boundaries() {
    let tmp = tempdir().expect("tempdir");
    let log = std::sync::Arc::new(EventLog::open(tmp.path(), 1024, 10).expect("open"));

    let threads = 4;
    let per_thread = 10;
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let log = std::sync::Arc::clone(&log);
            std::thread::spawn(move || {
                for n in 0..per_thread {
                    log.append(&sample_event(t * per_thread + n)).expect("append");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread join");
    }

    let ids = read_all_event_ids(tmp.path(), 10);
    assert_eq!(ids.len(), threads * per_thread);
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), threads * per_thread);
}
