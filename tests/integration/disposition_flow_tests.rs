//! End-to-end disposition flows through `LeadQueueService`.

use std::sync::Arc;

use chrono::Duration;

use lead_intake::models::callback::CallbackOffset;
use lead_intake::models::disposition::{DispositionAction, TerminalReason};
use lead_intake::models::lead::{LeadOutcome, LeadStatus};
use lead_intake::models::view::AttemptClassification;
use lead_intake::persistence::outreach_repo::OutreachRepo;
use lead_intake::scheduler::readmission::readmit_due;
use lead_intake::DispositionError;

use super::test_helpers::{admit, harness, harness_with, now, test_config};

#[tokio::test]
async fn unanswered_twice_then_callback_later() {
    let h = harness().await;
    let lead = admit(&h.service, "Lin").await;
    h.service.refresh().await.expect("refresh");

    for expected in 1..=2 {
        let effect = h
            .service
            .apply_disposition(&lead.id, DispositionAction::NotAnswered)
            .await
            .expect("not answered");
        assert!(effect.increment_attempt);
        assert!(!effect.remove_from_queue);

        let view = h.service.current_view().await;
        assert_eq!(view.len(), 1);
        assert_eq!(
            view[0].attempt_classification,
            AttemptClassification::Warning(expected)
        );
    }

    let t = now();
    let effect = h
        .service
        .dispositions()
        .apply_disposition_at(
            &lead.id,
            DispositionAction::CallbackLater { offset_days: 30 },
            t,
        )
        .await
        .expect("callback later");
    assert!(effect.remove_from_queue);
    assert_eq!(effect.schedule_reentry_in_days, Some(30));
    assert!(h.service.current_view().await.is_empty());

    let callback = h
        .store
        .callbacks()
        .get_for_lead(&lead.id)
        .await
        .expect("query")
        .expect("pending callback");
    assert_eq!(callback.reentry_at, t + Duration::days(30));

    let stored = h.store.leads().get_by_id(&lead.id).await.expect("query").expect("lead");
    assert_eq!(stored.status, LeadStatus::Suspended);
    assert_eq!(stored.attempt_count, 2);
    assert_eq!(stored.last_outcome, Some(LeadOutcome::CallbackScheduled));

    // Not yet due.
    let early = readmit_due(h.service.store().as_ref(), t + Duration::days(29))
        .await
        .expect("sweep");
    assert!(early.is_empty());

    let due_at = t + Duration::days(30);
    let readmitted = readmit_due(h.service.store().as_ref(), due_at)
        .await
        .expect("sweep");
    assert_eq!(readmitted, vec![lead.id.clone()]);

    let result = h.service.refresh().await.expect("refresh");
    assert_eq!(result.arrived, vec![lead.id.clone()]);

    let view = h.service.current_view().await;
    assert_eq!(view.len(), 1);
    assert!(view[0].highlight, "re-admitted lead is a new arrival");
    assert_eq!(view[0].lead.attempt_count, 2);
    assert_eq!(view[0].lead.arrived_at, due_at);
    assert_eq!(
        view[0].attempt_classification,
        AttemptClassification::Warning(2)
    );
}

#[tokio::test]
async fn exhausted_lead_stays_actionable() {
    let h = harness().await;
    let lead = admit(&h.service, "Max").await;
    h.service.refresh().await.expect("refresh");

    for _ in 0..4 {
        h.service
            .apply_disposition(&lead.id, DispositionAction::NotAnswered)
            .await
            .expect("not answered");
    }

    let view = h.service.current_view().await;
    assert_eq!(
        view[0].attempt_classification,
        AttemptClassification::Exhausted(4)
    );

    h.service
        .apply_disposition(&lead.id, DispositionAction::ScheduleNow)
        .await
        .expect("exhausted lead can still convert");
    assert!(h.service.current_view().await.is_empty());
}

#[tokio::test]
async fn terminal_dispositions_close_with_reason() {
    let h = harness().await;
    let cases = [
        (DispositionAction::ScheduleNow, TerminalReason::Converted),
        (DispositionAction::NotInterested, TerminalReason::Declined),
        (DispositionAction::InvalidNumber, TerminalReason::Unreachable),
    ];

    for (action, reason) in cases {
        let lead = admit(&h.service, "Case").await;
        h.service.refresh().await.expect("refresh");

        let effect = h
            .service
            .apply_disposition(&lead.id, action)
            .await
            .expect("terminal disposition");
        assert_eq!(effect.terminal_reason, Some(reason));

        let stored = h.store.leads().get_by_id(&lead.id).await.expect("query").expect("lead");
        assert_eq!(stored.status, LeadStatus::Closed);
        assert_eq!(stored.terminal_reason, Some(reason));
        assert!(stored.closed_at.is_some());
        assert!(!h.service.synchronizer().lock().await.contains(&lead.id));
    }

    let outreach = OutreachRepo::new(Arc::clone(&h.db)).list_pending().await.expect("list");
    assert_eq!(outreach.len(), 1, "only invalid_number requests outreach");
}

#[tokio::test]
async fn callback_later_with_no_offsets_leaves_lead_untouched() {
    let h = harness_with(test_config("callback_offsets = []")).await;
    let lead = admit(&h.service, "Ivy").await;
    h.service.refresh().await.expect("refresh");

    let err = h
        .service
        .apply_disposition(&lead.id, DispositionAction::CallbackLater { offset_days: 7 })
        .await
        .expect_err("no offsets configured");
    assert!(matches!(err, DispositionError::InvalidAction(_)));

    let view = h.service.current_view().await;
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].lead.attempt_count, 0);

    let stored = h.store.leads().get_by_id(&lead.id).await.expect("query").expect("lead");
    assert_eq!(stored.status, LeadStatus::Queued);
    assert!(stored.last_outcome.is_none());
    assert!(h.store.callbacks().list_all().await.expect("list").is_empty());
}

#[tokio::test]
async fn unstorable_reentry_is_rejected_and_sweep_keeps_working() {
    let mut config = test_config("");
    config
        .callback_offsets
        .push(CallbackOffset::new("Millennia", 3_000_000));
    let h = harness_with(config).await;
    let soon = admit(&h.service, "Soon").await;
    let never = admit(&h.service, "Never").await;
    let t = now();
    let dispositions = h.service.dispositions();

    dispositions
        .apply_disposition_at(&soon.id, DispositionAction::CallbackLater { offset_days: 7 }, t)
        .await
        .expect("callback later");
    let err = dispositions
        .apply_disposition_at(
            &never.id,
            DispositionAction::CallbackLater {
                offset_days: 3_000_000,
            },
            t,
        )
        .await
        .expect_err("re-entry past year 9999");
    assert!(matches!(err, DispositionError::InvalidAction(_)));

    let stored = h.store.leads().get_by_id(&never.id).await.expect("query").expect("lead");
    assert_eq!(stored.status, LeadStatus::Queued);
    assert!(h
        .store
        .callbacks()
        .get_for_lead(&never.id)
        .await
        .expect("query")
        .is_none());

    let readmitted = readmit_due(h.service.store().as_ref(), t + Duration::days(8))
        .await
        .expect("sweep");
    assert_eq!(readmitted, vec![soon.id.clone()]);
}

#[tokio::test]
async fn unknown_lead_is_rejected() {
    let h = harness().await;

    let err = h
        .service
        .apply_disposition("does-not-exist", DispositionAction::NotAnswered)
        .await
        .expect_err("unknown lead");
    assert!(matches!(err, DispositionError::UnknownLead(_)));
}

#[tokio::test]
async fn removed_lead_cannot_be_dispositioned_again() {
    let h = harness().await;
    let lead = admit(&h.service, "Ray").await;
    h.service.refresh().await.expect("refresh");

    h.service
        .apply_disposition(&lead.id, DispositionAction::NotInterested)
        .await
        .expect("first disposition");

    for action in [
        DispositionAction::NotAnswered,
        DispositionAction::ScheduleNow,
        DispositionAction::CallbackLater { offset_days: 7 },
    ] {
        let err = h
            .service
            .apply_disposition(&lead.id, action)
            .await
            .expect_err("lead already closed");
        assert!(matches!(err, DispositionError::UnknownLead(_)));
    }

    let stored = h.store.leads().get_by_id(&lead.id).await.expect("query").expect("lead");
    assert_eq!(stored.terminal_reason, Some(TerminalReason::Declined));
    assert!(h.store.callbacks().list_all().await.expect("list").is_empty());
}

#[tokio::test]
async fn reschedule_replaces_pending_callback() {
    let h = harness().await;
    let lead = admit(&h.service, "Zoe").await;
    h.service.refresh().await.expect("refresh");

    let t = now();
    h.service
        .dispositions()
        .apply_disposition_at(&lead.id, DispositionAction::CallbackLater { offset_days: 7 }, t)
        .await
        .expect("callback later");

    let later = t + Duration::hours(1);
    let callback = h
        .service
        .dispositions()
        .reschedule_callback(&lead.id, 90, later)
        .await
        .expect("reschedule");
    assert_eq!(callback.reentry_at, later + Duration::days(90));

    let all = h.store.callbacks().list_all().await.expect("list");
    assert_eq!(all, vec![callback]);

    let err = h
        .service
        .dispositions()
        .reschedule_callback(&lead.id, 14, later)
        .await
        .expect_err("14 days not enabled");
    assert!(matches!(err, DispositionError::InvalidAction(_)));
}

#[tokio::test]
async fn reschedule_requires_suspended_lead() {
    let h = harness().await;
    let lead = admit(&h.service, "Queued").await;

    let err = h
        .service
        .dispositions()
        .reschedule_callback(&lead.id, 7, now())
        .await
        .expect_err("lead is queued");
    assert!(matches!(err, DispositionError::UnknownLead(_)));
    assert!(h.store.callbacks().list_all().await.expect("list").is_empty());
}

#[tokio::test]
async fn disposition_on_unrefreshed_lead_is_applied_from_store() {
    let h = harness().await;
    let lead = admit(&h.service, "Late").await;

    // Lead has not been pulled into the live view yet.
    h.service
        .apply_disposition(&lead.id, DispositionAction::NotAnswered)
        .await
        .expect("store is authoritative");

    h.service.refresh().await.expect("refresh");
    let view = h.service.current_view().await;
    assert_eq!(view[0].lead.attempt_count, 1);
}
