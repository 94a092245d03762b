//! Integration tests for the Postgres proposal store
//!
//! These tests verify that:
//! 1. Proposals round-trip through the schema with calendar dates intact
//! 2. Status transitions are conditional writes
//! 3. Concurrent conversions on one prefix get distinct codes
//! 4. Role scoping is applied in SQL
//!
//! Requires: DATABASE_URL environment variable and `database` feature

#![cfg(feature = "database")]

use chrono::{Datelike, NaiveDate, Utc};
use futures::future::join_all;
use portal_types::{BkmdDecision, ProposalStatus, Role, Verdict};
use research_portal::config::DatabaseConfig;
use research_portal::models::{Actor, ProposalInput, ReviewStamp, StatusChange};
use research_portal::store::{PgProposalStore, ProposalStore};
use research_portal::workflow::{ProposalFilter, ProposalWorkflow};
use research_portal::StoreError;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Helper to get a migrated test store
async fn get_test_store() -> PgProposalStore {
    let config = DatabaseConfig {
        database_url: std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set for integration tests"),
        ..DatabaseConfig::default()
    };
    let store = PgProposalStore::connect(&config)
        .await
        .expect("Failed to connect to test database");
    store.run_migrations().await.expect("Failed to migrate");
    store
}

/// A vertical private to one test, so code sequences do not interfere.
async fn isolated_vertical(store: &PgProposalStore) -> String {
    let code = format!(
        "T{}",
        &Uuid::new_v4().simple().to_string()[..8].to_uppercase()
    );
    sqlx::query("INSERT INTO verticals (id, code, name) VALUES ($1, $1, $2)")
        .bind(&code)
        .bind(format!("Test vertical {}", code))
        .execute(store.pool())
        .await
        .expect("Failed to insert vertical");
    code
}

fn input(vertical: &str) -> ProposalInput {
    ProposalInput {
        title: Some("Pile foundations in soft clay".into()),
        category: Some("GAP".into()),
        vertical_id: Some(vertical.into()),
        proposed_start_date: Some("2025-01-01".into()),
        proposed_end_date: Some("2026-01-01".into()),
        ..Default::default()
    }
}

fn admin() -> Actor {
    Actor::new("pg-admin", Role::Admin)
}

#[tokio::test]
async fn test_round_trip_dates() {
    let store = get_test_store().await;
    let vertical = isolated_vertical(&store).await;
    let wf = ProposalWorkflow::new(Arc::new(store));
    let owner = Actor::new(format!("pg-{}", Uuid::new_v4()), Role::Employee);

    let created = wf.create_proposal(&owner, input(&vertical)).await.unwrap();
    let fetched = wf.get_proposal(created.id).await.unwrap();

    assert_eq!(fetched.fields(), created.fields());
    assert_eq!(
        fetched.proposed_start_date,
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    );
    assert_eq!(fetched.status, ProposalStatus::Draft);
    assert_eq!(fetched.submitted_by_id, owner.user_id);
}

#[tokio::test]
async fn test_transition_is_conditional() {
    let store = Arc::new(get_test_store().await);
    let vertical = isolated_vertical(&store).await;
    let wf = ProposalWorkflow::new(store.clone());
    let owner = Actor::new("pg-owner", Role::Employee);
    let id = wf.create_proposal(&owner, input(&vertical)).await.unwrap().id;

    let submit = StatusChange {
        to: ProposalStatus::Submitted,
        stamp: ReviewStamp::None,
    };
    store
        .apply_transition(id, &[ProposalStatus::Draft], &submit)
        .await
        .unwrap();
    let err = store
        .apply_transition(id, &[ProposalStatus::Draft], &submit)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::StatusConflict {
            actual: ProposalStatus::Submitted,
            ..
        }
    ));
}

#[tokio::test]
async fn test_concurrent_conversions_distinct_codes() {
    const N: usize = 10;
    let store = get_test_store().await;
    let vertical = isolated_vertical(&store).await;
    let wf = Arc::new(ProposalWorkflow::new(Arc::new(store)));
    let owner = Actor::new("pg-owner", Role::Employee);

    let mut ids = Vec::new();
    for _ in 0..N {
        let id = wf.create_proposal(&owner, input(&vertical)).await.unwrap().id;
        wf.submit(id, &owner).await.unwrap();
        wf.bkmd_review(id, &admin(), BkmdDecision::Forward, None)
            .await
            .unwrap();
        wf.director_review(id, &admin(), Verdict::Approve, None)
            .await
            .unwrap();
        wf.rc_review(id, &admin(), Verdict::Approve, Some("M1".into()), None)
            .await
            .unwrap();
        ids.push(id);
    }

    let handles = ids.into_iter().map(|id| {
        let wf = wf.clone();
        tokio::spawn(async move { wf.convert_to_project(id, &admin()).await })
    });
    let codes: BTreeSet<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().project.code)
        .collect();

    let year = Utc::now().year();
    let expected: BTreeSet<_> = (1..=N)
        .map(|seq| format!("GAP-{}-{}-{:03}", year, vertical, seq))
        .collect();
    assert_eq!(codes, expected);
}

#[tokio::test]
async fn test_bkmd_listing_scope() {
    let store = get_test_store().await;
    let vertical = isolated_vertical(&store).await;
    let wf = ProposalWorkflow::new(Arc::new(store));
    let owner = Actor::new(format!("pg-{}", Uuid::new_v4()), Role::Employee);
    let bkmd = Actor::new(format!("pg-bkmd-{}", Uuid::new_v4()), Role::Bkmd);

    let draft = wf.create_proposal(&owner, input(&vertical)).await.unwrap();
    let submitted = wf.create_proposal(&owner, input(&vertical)).await.unwrap();
    wf.submit(submitted.id, &owner).await.unwrap();

    let visible: Vec<Uuid> = wf
        .list_proposals(&bkmd, ProposalFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert!(visible.contains(&submitted.id));
    assert!(!visible.contains(&draft.id));

    // After forwarding, it stays visible to the reviewer who handled it
    wf.bkmd_review(submitted.id, &bkmd, BkmdDecision::Forward, None)
        .await
        .unwrap();
    let visible: Vec<Uuid> = wf
        .list_proposals(&bkmd, ProposalFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert!(visible.contains(&submitted.id));

    let own: Vec<Uuid> = wf
        .list_proposals(&owner, ProposalFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(own, vec![submitted.id, draft.id]);
}
