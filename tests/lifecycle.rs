use donation_gateway::domain::donation::DonationStatus;
use donation_gateway::lifecycle::transitions::{advance, LifecycleEvent, Transition};

#[test]
fn payment_confirmation_pays_from_either_open_state() {
    for from in [DonationStatus::Pending, DonationStatus::AwaitingPayment] {
        assert_eq!(
            advance(from, LifecycleEvent::PaymentConfirmed),
            Transition::Apply(DonationStatus::Paid)
        );
        assert_eq!(
            advance(from, LifecycleEvent::ManualMarkPaid),
            Transition::Apply(DonationStatus::Paid)
        );
    }
}

#[test]
fn duplicate_payment_confirmation_is_a_noop() {
    assert_eq!(
        advance(DonationStatus::Paid, LifecycleEvent::PaymentConfirmed),
        Transition::Noop
    );
    assert_eq!(
        advance(DonationStatus::Paid, LifecycleEvent::ManualMarkPaid),
        Transition::Noop
    );
}

#[test]
fn issuance_moves_to_awaiting_and_is_redeliverable() {
    assert_eq!(
        advance(DonationStatus::Pending, LifecycleEvent::PaymentInfoIssued),
        Transition::Apply(DonationStatus::AwaitingPayment)
    );
    // A redelivered issuance notice refreshes details without a state change.
    assert_eq!(
        advance(DonationStatus::AwaitingPayment, LifecycleEvent::PaymentInfoIssued),
        Transition::Apply(DonationStatus::AwaitingPayment)
    );
}

#[test]
fn stale_issuance_after_payment_is_a_noop() {
    assert_eq!(
        advance(DonationStatus::Paid, LifecycleEvent::PaymentInfoIssued),
        Transition::Noop
    );
}

#[test]
fn cancelled_donations_reject_payment_events() {
    assert_eq!(
        advance(DonationStatus::Cancelled, LifecycleEvent::PaymentConfirmed),
        Transition::Rejected("donation is cancelled")
    );
    assert_eq!(
        advance(DonationStatus::Cancelled, LifecycleEvent::PaymentInfoIssued),
        Transition::Rejected("donation is cancelled")
    );
    assert_eq!(
        advance(DonationStatus::Cancelled, LifecycleEvent::ManualMarkPaid),
        Transition::Rejected("donation is cancelled")
    );
}

#[test]
fn cancellation_only_from_open_states() {
    assert_eq!(
        advance(DonationStatus::Pending, LifecycleEvent::Cancel),
        Transition::Apply(DonationStatus::Cancelled)
    );
    assert_eq!(
        advance(DonationStatus::AwaitingPayment, LifecycleEvent::Cancel),
        Transition::Apply(DonationStatus::Cancelled)
    );
    assert_eq!(advance(DonationStatus::Cancelled, LifecycleEvent::Cancel), Transition::Noop);
    assert_eq!(
        advance(DonationStatus::Paid, LifecycleEvent::Cancel),
        Transition::Rejected("donation is already paid")
    );
}

#[test]
fn nothing_ever_returns_to_pending() {
    let statuses = [
        DonationStatus::Pending,
        DonationStatus::AwaitingPayment,
        DonationStatus::Paid,
        DonationStatus::Cancelled,
    ];
    let events = [
        LifecycleEvent::PaymentConfirmed,
        LifecycleEvent::PaymentInfoIssued,
        LifecycleEvent::ManualMarkPaid,
        LifecycleEvent::Cancel,
    ];

    for status in statuses {
        for event in events {
            assert_ne!(advance(status, event), Transition::Apply(DonationStatus::Pending));
        }
    }
}

#[test]
fn terminal_states_are_terminal() {
    assert!(DonationStatus::Paid.is_terminal());
    assert!(DonationStatus::Cancelled.is_terminal());
    assert!(!DonationStatus::Pending.is_terminal());
    assert!(!DonationStatus::AwaitingPayment.is_terminal());
}
