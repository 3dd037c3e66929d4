use crate::domain::donation::DonationStatus;

/// Events that can move a donation through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A payment-completed notice with a success status.
    PaymentConfirmed,
    /// A delayed-settlement code/account was issued.
    PaymentInfoIssued,
    /// Administrative override.
    ManualMarkPaid,
    /// Administrative cancellation.
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Apply(DonationStatus),
    /// Already in (or past) the target state; applying again must not
    /// re-trigger side effects.
    Noop,
    Rejected(&'static str),
}

/// Pure transition function. Status only advances forward along
/// pending -> awaiting_payment -> paid, with cancellation allowed from the
/// two non-terminal states; nothing ever returns to pending.
///
/// This is advisory for the dispatcher; the guarded SQL update in the repo is
/// the authority under concurrent deliveries.
pub fn advance(current: DonationStatus, event: LifecycleEvent) -> Transition {
    match (current, event) {
        (DonationStatus::Pending, LifecycleEvent::PaymentConfirmed)
        | (DonationStatus::AwaitingPayment, LifecycleEvent::PaymentConfirmed)
        | (DonationStatus::Pending, LifecycleEvent::ManualMarkPaid)
        | (DonationStatus::AwaitingPayment, LifecycleEvent::ManualMarkPaid) => {
            Transition::Apply(DonationStatus::Paid)
        }
        (DonationStatus::Paid, LifecycleEvent::PaymentConfirmed)
        | (DonationStatus::Paid, LifecycleEvent::ManualMarkPaid) => Transition::Noop,
        (DonationStatus::Cancelled, LifecycleEvent::PaymentConfirmed)
        | (DonationStatus::Cancelled, LifecycleEvent::ManualMarkPaid) => {
            Transition::Rejected("donation is cancelled")
        }

        // Re-delivered issuance notices refresh the payment details but never
        // move the state anywhere new.
        (DonationStatus::Pending, LifecycleEvent::PaymentInfoIssued)
        | (DonationStatus::AwaitingPayment, LifecycleEvent::PaymentInfoIssued) => {
            Transition::Apply(DonationStatus::AwaitingPayment)
        }
        (DonationStatus::Paid, LifecycleEvent::PaymentInfoIssued) => Transition::Noop,
        (DonationStatus::Cancelled, LifecycleEvent::PaymentInfoIssued) => {
            Transition::Rejected("donation is cancelled")
        }

        (DonationStatus::Pending, LifecycleEvent::Cancel)
        | (DonationStatus::AwaitingPayment, LifecycleEvent::Cancel) => {
            Transition::Apply(DonationStatus::Cancelled)
        }
        (DonationStatus::Cancelled, LifecycleEvent::Cancel) => Transition::Noop,
        (DonationStatus::Paid, LifecycleEvent::Cancel) => {
            Transition::Rejected("donation is already paid")
        }
    }
}
