use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use adhoc_core::policy::{ExecutionPolicy, RateLimits};
use adhoc_core::{ExecutionError, QuotaWindow};

use super::*;

fn policy(per_hour: u32, per_day: u32) -> ExecutionPolicy {
    ExecutionPolicy {
        max_query_duration_seconds: 300,
        max_result_rows: 10_000,
        max_result_size_mb: 100,
        allowed_engines: BTreeSet::from(["bigquery".to_string(), "trino".to_string()]),
        allowed_file_types: BTreeSet::from(["csv".to_string(), "json".to_string()]),
        max_file_size_mb: 100,
        rate_limits: RateLimits {
            queries_per_hour: per_hour,
            queries_per_day: per_day,
        },
    }
}

fn store_with(per_hour: u32, per_day: u32) -> (tempfile::TempDir, PolicyStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = PolicyStore::new(&dir.path().to_path_buf(), policy(per_hour, per_day));
    (dir, store)
}

#[test]
fn test_reserve_within_limit() {
    let (_dir, store) = store_with(3, 10);
    for _ in 0..3 {
        store.check_and_reserve("alice").unwrap();
    }
    let err = store.check_and_reserve("alice").unwrap_err();
    match err {
        ExecutionError::RateLimitExceeded {
            limit_type,
            limit,
            current_usage,
            ..
        } => {
            assert_eq!(limit_type, QuotaWindow::QueriesPerHour);
            assert_eq!(limit, 3);
            assert_eq!(current_usage, 3);
        }
        other => panic!("expected RateLimitExceeded, got {:?}", other),
    }
}

#[test]
fn test_daily_limit_rejected_with_reset_at_midnight() {
    let (_dir, store) = store_with(10, 2);
    let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();

    store.check_and_reserve_at("bob", now).unwrap();
    store.check_and_reserve_at("bob", now).unwrap();

    let err = store.check_and_reserve_at("bob", now).unwrap_err();
    match err {
        ExecutionError::RateLimitExceeded {
            limit_type,
            reset_at,
            ..
        } => {
            assert_eq!(limit_type, QuotaWindow::QueriesPerDay);
            assert_eq!(reset_at, Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap());
        }
        other => panic!("expected RateLimitExceeded, got {:?}", other),
    }
}

#[test]
fn test_hour_window_rollover_resets_counter() {
    let (_dir, store) = store_with(1, 100);
    let before = Utc.with_ymd_and_hms(2026, 3, 14, 9, 59, 59).unwrap();
    let after = Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 1).unwrap();

    store.check_and_reserve_at("carol", before).unwrap();
    assert!(store.check_and_reserve_at("carol", before).is_err());

    // One second past the hour boundary the counter starts from zero.
    store.check_and_reserve_at("carol", after).unwrap();
    let snapshot = store.get_policy_at("carol", after);
    assert_eq!(snapshot.usage.queries_this_hour, 1);
    assert_eq!(snapshot.usage.queries_today, 2);
}

#[test]
fn test_day_rollover_resets_both_counters() {
    let (_dir, store) = store_with(10, 2);
    let day_one = Utc.with_ymd_and_hms(2026, 3, 14, 23, 30, 0).unwrap();
    let day_two = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 30).unwrap();

    store.check_and_reserve_at("dave", day_one).unwrap();
    store.check_and_reserve_at("dave", day_one).unwrap();
    assert!(store.check_and_reserve_at("dave", day_one).is_err());

    store.check_and_reserve_at("dave", day_two).unwrap();
    let snapshot = store.get_policy_at("dave", day_two);
    assert_eq!(snapshot.usage.queries_this_hour, 1);
    assert_eq!(snapshot.usage.queries_today, 1);
}

#[test]
fn test_get_policy_never_mutates() {
    let (_dir, store) = store_with(5, 10);
    store.check_and_reserve("erin").unwrap();

    for _ in 0..10 {
        let snapshot = store.get_policy("erin");
        assert_eq!(snapshot.usage.queries_this_hour, 1);
        assert_eq!(snapshot.usage.queries_today, 1);
    }
}

#[test]
fn test_callers_do_not_share_counters() {
    let (_dir, store) = store_with(1, 10);
    store.check_and_reserve("frank").unwrap();
    assert!(store.check_and_reserve("frank").is_err());
    // A different caller still has a full quota.
    store.check_and_reserve("grace").unwrap();
}

#[test]
fn test_concurrent_reservations_exactly_limit_succeed() {
    let limit = 5u32;
    let attempts = 32;
    let (_dir, store) = store_with(limit, 100);
    let store = Arc::new(store);

    let handles: Vec<_> = (0..attempts)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || store.check_and_reserve("hammer").is_ok())
        })
        .collect();

    let granted = handles
        .into_iter()
        .filter(|h| h.join().unwrap())
        .count();

    assert_eq!(granted as u32, limit);
    let snapshot = store.get_policy("hammer");
    assert_eq!(snapshot.usage.queries_this_hour, limit);
}

#[test]
fn test_policies_file_overrides_default() {
    let dir = tempfile::tempdir().unwrap();
    let special = policy(99, 999);
    let map = std::collections::HashMap::from([("vip".to_string(), special)]);
    std::fs::write(
        dir.path().join("policies.json"),
        serde_json::to_string_pretty(&map).unwrap(),
    )
    .unwrap();

    let store = PolicyStore::new(&dir.path().to_path_buf(), policy(1, 2));

    assert_eq!(store.policy_for("vip").rate_limits.queries_per_hour, 99);
    assert_eq!(store.policy_for("other").rate_limits.queries_per_hour, 1);
}
