//! End-to-end workflow scenarios against the in-memory store

use chrono::{Datelike, NaiveDate, Utc};
use portal_types::{BkmdDecision, ProjectStatus, ProposalStatus, Role, Verdict};
use research_portal::models::{Actor, ProposalInput, SpecialArea, Vertical};
use research_portal::store::{MemoryStore, ProposalStore};
use research_portal::workflow::{ProposalFilter, ProposalWorkflow};
use research_portal::PortalError;
use rust_decimal::Decimal;
use std::sync::Arc;

fn scientist() -> Actor {
    Actor::new("u-scientist", Role::Employee)
}

fn bkmd() -> Actor {
    Actor::new("u-bkmd", Role::Bkmd)
}

fn director() -> Actor {
    Actor::new("u-director", Role::Director)
}

/// Store with a `V1` vertical (code `SHMLE`) alongside the seeded taxonomy.
fn workflow() -> ProposalWorkflow {
    let mut verticals = research_portal::taxonomy::default_verticals();
    verticals.push(Vertical {
        id: "V1".into(),
        code: "SHMLE".into(),
        name: "Structural Health Monitoring".into(),
        description: None,
    });
    let mut areas = research_portal::taxonomy::default_special_areas();
    areas.push(SpecialArea {
        id: "SA1".into(),
        name: "Bridges".into(),
        description: None,
    });
    ProposalWorkflow::new(Arc::new(MemoryStore::with_taxonomy(verticals, areas)))
}

fn gap_v1() -> ProposalInput {
    ProposalInput {
        title: Some("Fatigue life of steel bridges".into()),
        description: Some(Some("Instrumented monitoring of two spans".into())),
        category: Some("GAP".into()),
        vertical_id: Some("V1".into()),
        special_area_id: Some(Some("SA1".into())),
        objectives: Some(Some("Remaining life estimate".into())),
        proposed_start_date: Some("2025-01-01".into()),
        proposed_end_date: Some("2026-01-01".into()),
        estimated_budget: Some(Decimal::new(1_250_000, 2)),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_round_trip_preserves_fields() {
    let wf = workflow();
    let created = wf.create_proposal(&scientist(), gap_v1()).await.unwrap();
    let fetched = wf.get_proposal(created.id).await.unwrap();

    assert_eq!(fetched, created);
    assert_eq!(fetched.category.as_str(), "GAP");
    assert_eq!(fetched.vertical_id, "V1");
    assert_eq!(
        fetched.proposed_start_date,
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    );
    assert_eq!(
        fetched.proposed_end_date,
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    );
    assert_eq!(fetched.status, ProposalStatus::Draft);
    assert_eq!(fetched.submitted_by_id, "u-scientist");
}

#[tokio::test]
async fn test_timestamp_dates_keep_calendar_day() {
    let wf = workflow();
    let mut input = gap_v1();
    input.proposed_start_date = Some("2025-01-01T00:00:00.000Z".into());
    let created = wf.create_proposal(&scientist(), input).await.unwrap();
    assert_eq!(
        created.proposed_start_date,
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    );
}

#[tokio::test]
async fn test_submit_twice_is_invalid_state() {
    let wf = workflow();
    let p = wf.create_proposal(&scientist(), gap_v1()).await.unwrap();
    let first = wf.submit(p.id, &scientist()).await.unwrap();
    assert_eq!(first.message, "Proposal submitted for BKMD review");
    assert_eq!(first.proposal.status, ProposalStatus::Submitted);

    let err = wf.submit(p.id, &scientist()).await.unwrap_err();
    assert!(matches!(
        err,
        PortalError::InvalidState {
            current: ProposalStatus::Submitted,
            ..
        }
    ));
    assert_eq!(
        wf.get_proposal(p.id).await.unwrap().status,
        ProposalStatus::Submitted
    );
}

#[tokio::test]
async fn test_employee_cannot_forward() {
    let wf = workflow();
    let p = wf.create_proposal(&scientist(), gap_v1()).await.unwrap();
    wf.submit(p.id, &scientist()).await.unwrap();
    let before = wf.get_proposal(p.id).await.unwrap();

    let err = wf
        .bkmd_review(
            p.id,
            &Actor::new("u-other", Role::Employee),
            BkmdDecision::Forward,
            Some("looks fine".into()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Forbidden(_)));

    let after = wf.get_proposal(p.id).await.unwrap();
    assert_eq!(after, before);
    assert!(after.bkmd_reviewer_id.is_none());
}

#[tokio::test]
async fn test_full_lifecycle_to_project() {
    let wf = workflow();
    let p = wf.create_proposal(&scientist(), gap_v1()).await.unwrap();

    wf.submit(p.id, &scientist()).await.unwrap();
    let forwarded = wf
        .bkmd_review(p.id, &bkmd(), BkmdDecision::Forward, Some("ok".into()))
        .await
        .unwrap();
    assert_eq!(forwarded.proposal.status, ProposalStatus::DirectorReview);
    assert_eq!(forwarded.proposal.bkmd_reviewer_id.as_deref(), Some("u-bkmd"));
    assert!(forwarded.proposal.bkmd_reviewed_at.is_some());

    let approved = wf
        .director_review(p.id, &director(), Verdict::Approve, None)
        .await
        .unwrap();
    assert_eq!(approved.proposal.status, ProposalStatus::DirectorApproved);
    assert_eq!(
        approved.message,
        "Proposal approved by Director - pending RC approval"
    );

    let pending = wf.list_pending_rc().await.unwrap();
    assert_eq!(pending.len(), 1);

    let rc = wf
        .rc_review(
            p.id,
            &director(),
            Verdict::Approve,
            Some("M1".into()),
            Some("Funded".into()),
        )
        .await
        .unwrap();
    assert_eq!(rc.proposal.status, ProposalStatus::RcApproved);
    assert_eq!(rc.proposal.rc_meeting_id.as_deref(), Some("M1"));
    // Earlier reviewer stamps survive later steps
    assert_eq!(rc.proposal.bkmd_reviewer_id.as_deref(), Some("u-bkmd"));
    assert_eq!(rc.proposal.director_reviewer_id.as_deref(), Some("u-director"));

    let converted = wf.convert_to_project(p.id, &director()).await.unwrap();
    let project = &converted.project;
    assert_eq!(converted.message, "Proposal converted to project");
    assert_eq!(project.status, ProjectStatus::Active);
    assert_eq!(
        project.code,
        format!("GAP-{}-SHMLE-001", Utc::now().year())
    );
    assert_eq!(project.project_head_id, "u-scientist");
    assert_eq!(project.title, "Fatigue life of steel bridges");
    assert_eq!(project.special_area_id.as_deref(), Some("SA1"));
    assert_eq!(project.start_date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());

    let stored = wf.get_proposal(p.id).await.unwrap();
    assert_eq!(stored.status, ProposalStatus::Converted);
    assert_eq!(stored.converted_project_id, Some(project.id));
    assert_eq!(wf.get_project(project.id).await.unwrap(), *project);

    // Converted is terminal
    let err = wf.convert_to_project(p.id, &director()).await.unwrap_err();
    assert!(matches!(err, PortalError::InvalidState { .. }));
    assert!(wf.list_pending_rc().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bkmd_return_then_edit_and_resubmit() {
    let wf = workflow();
    let p = wf.create_proposal(&scientist(), gap_v1()).await.unwrap();
    wf.submit(p.id, &scientist()).await.unwrap();

    let returned = wf
        .bkmd_review(
            p.id,
            &bkmd(),
            BkmdDecision::Return,
            Some("Budget needs breakdown".into()),
        )
        .await
        .unwrap();
    assert_eq!(returned.proposal.status, ProposalStatus::Draft);
    assert_eq!(
        returned.proposal.bkmd_comments.as_deref(),
        Some("Budget needs breakdown")
    );
    assert_eq!(
        returned.message,
        "Proposal returned to submitter for revision"
    );

    let edited = wf
        .update_proposal(
            p.id,
            &scientist(),
            ProposalInput {
                estimated_budget: Some(Decimal::new(900_000, 2)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.estimated_budget, Some(Decimal::new(900_000, 2)));
    assert_eq!(edited.title, "Fatigue life of steel bridges");
    // Review history is kept across the return
    assert_eq!(edited.bkmd_reviewer_id.as_deref(), Some("u-bkmd"));

    let resubmitted = wf.submit(p.id, &scientist()).await.unwrap();
    assert_eq!(resubmitted.proposal.status, ProposalStatus::Submitted);
}

#[tokio::test]
async fn test_forward_without_comments_keeps_return_comments() {
    let wf = workflow();
    let p = wf.create_proposal(&scientist(), gap_v1()).await.unwrap();
    wf.submit(p.id, &scientist()).await.unwrap();
    wf.bkmd_review(p.id, &bkmd(), BkmdDecision::Return, Some("fix budget".into()))
        .await
        .unwrap();
    wf.submit(p.id, &scientist()).await.unwrap();

    let forwarded = wf
        .bkmd_review(p.id, &bkmd(), BkmdDecision::Forward, None)
        .await
        .unwrap();
    assert_eq!(forwarded.proposal.status, ProposalStatus::DirectorReview);
    assert_eq!(
        forwarded.proposal.bkmd_comments.as_deref(),
        Some("fix budget")
    );

    let approved = wf
        .director_review(p.id, &director(), Verdict::Approve, Some("Strong case".into()))
        .await
        .unwrap();
    assert_eq!(
        approved.proposal.director_comments.as_deref(),
        Some("Strong case")
    );
    let stored = wf.get_proposal(p.id).await.unwrap();
    assert_eq!(stored.bkmd_comments.as_deref(), Some("fix budget"));
}

#[tokio::test]
async fn test_update_clears_optional_text_with_null() {
    let wf = workflow();
    let p = wf.create_proposal(&scientist(), gap_v1()).await.unwrap();

    let cleared = wf
        .update_proposal(
            p.id,
            &scientist(),
            ProposalInput {
                objectives: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.objectives, None);
    assert_eq!(
        cleared.description.as_deref(),
        Some("Instrumented monitoring of two spans")
    );

    let err = wf
        .update_proposal(
            p.id,
            &scientist(),
            ProposalInput {
                title: Some("  ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Validation(_)));
    assert_eq!(
        wf.get_proposal(p.id).await.unwrap().title,
        "Fatigue life of steel bridges"
    );
}

#[tokio::test]
async fn test_rejections_are_terminal() {
    let wf = workflow();
    let p = wf.create_proposal(&scientist(), gap_v1()).await.unwrap();
    wf.submit(p.id, &scientist()).await.unwrap();
    wf.bkmd_review(p.id, &bkmd(), BkmdDecision::Forward, None)
        .await
        .unwrap();
    let rejected = wf
        .director_review(p.id, &director(), Verdict::Reject, Some("Out of scope".into()))
        .await
        .unwrap();
    assert_eq!(rejected.proposal.status, ProposalStatus::DirectorRejected);

    let err = wf
        .rc_review(p.id, &director(), Verdict::Approve, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::InvalidState { .. }));
}

#[tokio::test]
async fn test_update_requires_draft_and_owner() {
    let wf = workflow();
    let p = wf.create_proposal(&scientist(), gap_v1()).await.unwrap();

    let err = wf
        .update_proposal(p.id, &Actor::new("u-else", Role::Employee), ProposalInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Forbidden(_)));

    wf.submit(p.id, &scientist()).await.unwrap();
    let err = wf
        .update_proposal(p.id, &scientist(), ProposalInput::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Only draft proposals can be edited");
}

#[tokio::test]
async fn test_sys_admin_acts_like_admin() {
    let wf = workflow();
    let sys = Actor::new("u-sys", Role::SysAdmin);
    let p = wf.create_proposal(&scientist(), gap_v1()).await.unwrap();
    wf.submit(p.id, &scientist()).await.unwrap();

    wf.bkmd_review(p.id, &sys, BkmdDecision::Forward, None)
        .await
        .unwrap();
    wf.director_review(p.id, &sys, Verdict::Approve, None)
        .await
        .unwrap();
    wf.rc_review(p.id, &sys, Verdict::Approve, None, None)
        .await
        .unwrap();
    let outcome = wf.convert_to_project(p.id, &sys).await.unwrap();
    assert_eq!(outcome.proposal.status, ProposalStatus::Converted);

    let all = wf.list_proposals(&sys, ProposalFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_listing_is_scoped_by_role() {
    let wf = workflow();
    let other = Actor::new("u-other", Role::ProjectHead);

    let mine = wf.create_proposal(&scientist(), gap_v1()).await.unwrap();
    let theirs = wf.create_proposal(&other, gap_v1()).await.unwrap();
    wf.submit(theirs.id, &other).await.unwrap();

    let seen: Vec<_> = wf
        .list_proposals(&scientist(), ProposalFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(seen, vec![mine.id]);

    // BKMD sees the submitted one, not the draft
    let queue: Vec<_> = wf
        .list_proposals(&bkmd(), ProposalFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(queue, vec![theirs.id]);

    // Director sees nothing yet
    assert!(wf
        .list_proposals(&director(), ProposalFilter::default())
        .await
        .unwrap()
        .is_empty());

    // Filters narrow but never widen
    let admin = Actor::new("u-admin", Role::Admin);
    let drafts = wf
        .list_proposals(
            &admin,
            ProposalFilter {
                status: Some(ProposalStatus::Draft),
                category: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(drafts.len(), 1);
    let none_for_scientist = wf
        .list_proposals(
            &scientist(),
            ProposalFilter {
                status: Some(ProposalStatus::Submitted),
                category: None,
            },
        )
        .await
        .unwrap();
    assert!(none_for_scientist.is_empty());
}

#[tokio::test]
async fn test_listing_newest_first() {
    let wf = workflow();
    let first = wf.create_proposal(&scientist(), gap_v1()).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = wf.create_proposal(&scientist(), gap_v1()).await.unwrap();

    let listed = wf
        .list_proposals(&scientist(), ProposalFilter::default())
        .await
        .unwrap();
    assert_eq!(
        listed.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );
}

#[tokio::test]
async fn test_missing_vertical_falls_back_to_gen() {
    let wf = ProposalWorkflow::new(Arc::new(MemoryStore::seeded()));
    let sys = Actor::new("u-sys", Role::SysAdmin);

    let mut input = gap_v1();
    input.vertical_id = Some("DM".into());
    input.special_area_id = None;
    let p = wf.create_proposal(&scientist(), input).await.unwrap();
    wf.submit(p.id, &scientist()).await.unwrap();
    wf.bkmd_review(p.id, &sys, BkmdDecision::Forward, None).await.unwrap();
    wf.director_review(p.id, &sys, Verdict::Approve, None).await.unwrap();
    wf.rc_review(p.id, &sys, Verdict::Approve, None, None).await.unwrap();

    let code = wf.convert_to_project(p.id, &sys).await.unwrap().project.code;
    assert_eq!(code, format!("GAP-{}-DM-001", Utc::now().year()));

    // Same proposal in a store whose taxonomy lacks its vertical
    let empty = ProposalWorkflow::new(Arc::new(MemoryStore::new()));
    let mut orphan = research_portal::models::Proposal::draft(
        wf.get_proposal(p.id).await.unwrap().fields(),
        "u-scientist",
    );
    orphan.status = ProposalStatus::RcApproved;
    empty.store().insert_proposal(&orphan).await.unwrap();
    let code = empty
        .convert_to_project(orphan.id, &sys)
        .await
        .unwrap()
        .project
        .code;
    assert_eq!(code, format!("GAP-{}-GEN-001", Utc::now().year()));
}

#[tokio::test]
async fn test_create_validation() {
    let wf = workflow();

    let mut missing = gap_v1();
    missing.category = None;
    let err = wf.create_proposal(&scientist(), missing).await.unwrap_err();
    assert_eq!(err.to_string(), "Missing required fields");

    let mut bad_category = gap_v1();
    bad_category.category = Some("GRANT".into());
    assert!(matches!(
        wf.create_proposal(&scientist(), bad_category).await,
        Err(PortalError::Validation(_))
    ));

    let mut bad_area = gap_v1();
    bad_area.special_area_id = Some(Some("SA-NOPE".into()));
    assert!(matches!(
        wf.create_proposal(&scientist(), bad_area).await,
        Err(PortalError::Validation(_))
    ));
}
