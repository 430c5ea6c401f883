use lead_intake::models::callback::CallbackOffset;
use lead_intake::models::disposition::{DispositionAction, Effect, TerminalReason};
use lead_intake::policy::disposition::{enabled_offset, DispositionPolicy};
use lead_intake::DispositionError;

fn offsets() -> Vec<CallbackOffset> {
    CallbackOffset::defaults()
}

#[test]
fn not_answered_keeps_lead_and_increments() {
    let effect = DispositionPolicy::evaluate(0, &DispositionAction::NotAnswered, &offsets())
        .expect("valid action");

    assert_eq!(
        effect,
        Effect {
            increment_attempt: true,
            ..Effect::default()
        }
    );
    assert!(!effect.remove_from_queue);
}

#[test]
fn schedule_now_closes_as_converted() {
    let effect = DispositionPolicy::evaluate(1, &DispositionAction::ScheduleNow, &offsets())
        .expect("valid action");

    assert!(effect.remove_from_queue);
    assert!(!effect.increment_attempt);
    assert_eq!(effect.terminal_reason, Some(TerminalReason::Converted));
    assert_eq!(effect.schedule_reentry_in_days, None);
    assert!(!effect.request_email_outreach);
}

#[test]
fn not_interested_closes_as_declined() {
    let effect = DispositionPolicy::evaluate(2, &DispositionAction::NotInterested, &offsets())
        .expect("valid action");

    assert!(effect.remove_from_queue);
    assert_eq!(effect.terminal_reason, Some(TerminalReason::Declined));
    assert!(!effect.request_email_outreach);
}

#[test]
fn invalid_number_closes_and_requests_outreach() {
    let effect = DispositionPolicy::evaluate(0, &DispositionAction::InvalidNumber, &offsets())
        .expect("valid action");

    assert!(effect.remove_from_queue);
    assert!(!effect.increment_attempt);
    assert_eq!(effect.terminal_reason, Some(TerminalReason::Unreachable));
    assert!(effect.request_email_outreach);
}

#[test]
fn callback_later_defers_by_offset() {
    let action = DispositionAction::CallbackLater { offset_days: 30 };
    let effect = DispositionPolicy::evaluate(2, &action, &offsets()).expect("valid action");

    assert_eq!(
        effect,
        Effect {
            remove_from_queue: true,
            schedule_reentry_in_days: Some(30),
            ..Effect::default()
        }
    );
}

#[test]
fn callback_later_with_unknown_offset_is_invalid() {
    let action = DispositionAction::CallbackLater { offset_days: 12 };
    let err = DispositionPolicy::evaluate(0, &action, &offsets()).expect_err("not configured");

    assert!(matches!(err, DispositionError::InvalidAction(_)));
}

#[test]
fn callback_later_with_disabled_offset_is_invalid() {
    let mut offsets = offsets();
    offsets[0].enabled = false;

    let action = DispositionAction::CallbackLater { offset_days: 7 };
    let err = DispositionPolicy::evaluate(0, &action, &offsets).expect_err("offset disabled");

    assert!(matches!(err, DispositionError::InvalidAction(_)));
}

#[test]
fn callback_later_with_no_offsets_is_invalid() {
    for days in [1, 7, 30, 90, 180] {
        let action = DispositionAction::CallbackLater { offset_days: days };
        let err = DispositionPolicy::evaluate(0, &action, &[]).expect_err("no offsets");
        assert!(matches!(err, DispositionError::InvalidAction(_)), "days={days}");
    }
}

#[test]
fn effect_does_not_depend_on_attempt_count() {
    let actions = [
        DispositionAction::NotAnswered,
        DispositionAction::ScheduleNow,
        DispositionAction::CallbackLater { offset_days: 7 },
        DispositionAction::NotInterested,
        DispositionAction::InvalidNumber,
    ];

    for action in actions {
        let baseline = DispositionPolicy::evaluate(0, &action, &offsets()).expect("valid");
        for count in [1, 3, 10, u32::MAX] {
            let effect = DispositionPolicy::evaluate(count, &action, &offsets()).expect("valid");
            assert_eq!(effect, baseline, "{} at {count}", action.as_str());
        }
    }
}

#[test]
fn at_most_one_of_terminal_or_reentry() {
    let actions = [
        DispositionAction::NotAnswered,
        DispositionAction::ScheduleNow,
        DispositionAction::CallbackLater { offset_days: 90 },
        DispositionAction::NotInterested,
        DispositionAction::InvalidNumber,
    ];

    for action in actions {
        let effect = DispositionPolicy::evaluate(0, &action, &offsets()).expect("valid");
        assert!(
            !(effect.terminal_reason.is_some() && effect.schedule_reentry_in_days.is_some()),
            "{}",
            action.as_str()
        );
        assert!(
            !(effect.increment_attempt && effect.remove_from_queue),
            "{}",
            action.as_str()
        );
    }
}

#[test]
fn enabled_offset_picks_first_enabled_match() {
    let offsets = vec![
        CallbackOffset {
            label: "Week (off)".into(),
            days: 7,
            enabled: false,
        },
        CallbackOffset::new("Week", 7),
        CallbackOffset::new("Also a week", 7),
    ];

    let found = enabled_offset(&offsets, 7).expect("enabled match");
    assert_eq!(found.label, "Week");
    assert!(enabled_offset(&offsets, 30).is_none());
}
