use std::sync::Arc;

use chrono::Utc;

use lead_intake::models::disposition::{Effect, TerminalReason};
use lead_intake::models::lead::{Lead, LeadOutcome, NewLead};
use lead_intake::persistence::db;
use lead_intake::persistence::lead_repo::LeadRepo;
use lead_intake::persistence::outreach_repo::OutreachRepo;
use lead_intake::persistence::store::DispositionCommit;
use lead_intake::AppError;

fn unreachable_effect() -> Effect {
    Effect {
        remove_from_queue: true,
        terminal_reason: Some(TerminalReason::Unreachable),
        request_email_outreach: true,
        ..Effect::default()
    }
}

async fn close_as_unreachable(leads: &LeadRepo, email: Option<&str>) -> Lead {
    let lead = Lead::new(
        NewLead {
            email: email.map(str::to_owned),
            ..NewLead::default()
        },
        Utc::now(),
    );
    leads.create(&lead).await.expect("create");
    leads
        .commit_disposition(&DispositionCommit {
            lead_id: lead.id.clone(),
            expected_attempts: 0,
            outcome: LeadOutcome::Unreachable,
            effect: unreachable_effect(),
            callback: None,
            now: Utc::now(),
        })
        .await
        .expect("commit")
}

#[tokio::test]
async fn invalid_number_disposition_writes_outbox_row() {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let leads = LeadRepo::new(Arc::clone(&db));
    let outreach = OutreachRepo::new(db);

    let with_email = close_as_unreachable(&leads, Some("grace@example.com")).await;
    let without_email = close_as_unreachable(&leads, None).await;

    let pending = outreach.list_pending().await.expect("list");
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].lead_id, with_email.id);
    assert_eq!(pending[0].email.as_deref(), Some("grace@example.com"));
    assert_eq!(pending[1].lead_id, without_email.id);
    assert!(pending[1].email.is_none());
    assert!(pending.iter().all(|r| r.dispatched_at.is_none()));
}

#[tokio::test]
async fn mark_dispatched_removes_from_pending() {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let leads = LeadRepo::new(Arc::clone(&db));
    let outreach = OutreachRepo::new(db);

    close_as_unreachable(&leads, Some("a@example.com")).await;
    let pending = outreach.list_pending().await.expect("list");
    let id = pending[0].id;

    outreach
        .mark_dispatched(id, Utc::now())
        .await
        .expect("mark dispatched");
    assert!(outreach.list_pending().await.expect("list").is_empty());

    let err = outreach
        .mark_dispatched(id, Utc::now())
        .await
        .expect_err("already dispatched");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn other_dispositions_write_no_outbox_row() {
    let db = Arc::new(db::connect_memory().await.expect("db connect"));
    let leads = LeadRepo::new(Arc::clone(&db));
    let outreach = OutreachRepo::new(db);

    let lead = Lead::new(NewLead::default(), Utc::now());
    leads.create(&lead).await.expect("create");
    leads
        .commit_disposition(&DispositionCommit {
            lead_id: lead.id.clone(),
            expected_attempts: 0,
            outcome: LeadOutcome::Declined,
            effect: Effect {
                remove_from_queue: true,
                terminal_reason: Some(TerminalReason::Declined),
                ..Effect::default()
            },
            callback: None,
            now: Utc::now(),
        })
        .await
        .expect("commit");

    assert!(outreach.list_pending().await.expect("list").is_empty());
}
