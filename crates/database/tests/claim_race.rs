//! Claim atomicity under concurrent execution.
//!
//! Uses a file-backed database in WAL mode so the racing claims arrive over
//! genuinely separate connections, the way concurrent delivery jobs hit the
//! store in production.

use chrono::{NaiveDate, TimeZone, Utc};
use database::ledger::{self, ClaimOutcome};
use database::{Database, OccasionKind};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_yield_exactly_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("race.db").display());
    let db = Database::connect(&url).await.unwrap();
    db.migrate().await.unwrap();

    let date = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 1, 16, 5, 10, 0).unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let pool = db.pool().clone();
        handles.push(tokio::spawn(async move {
            ledger::try_claim(&pool, "g1", OccasionKind::Alert, "fajr-2026-01-16", date, now).await
        }));
    }

    let mut claimed = 0;
    let mut already = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            ClaimOutcome::Claimed => claimed += 1,
            ClaimOutcome::AlreadyClaimed => already += 1,
        }
    }

    assert_eq!(claimed, 1, "exactly one concurrent claimant may win");
    assert_eq!(already, 15);

    // The ledger holds a single row for the occasion
    let entries = ledger::list_entries(db.pool(), "g1").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].occasion_key, "fajr-2026-01-16");

    db.close().await;
}
