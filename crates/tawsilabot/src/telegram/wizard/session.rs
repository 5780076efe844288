//! Per-user wizard session state
//!
//! One session per active user, held in memory only: a process restart
//! drops every in-flight wizard. The store is an explicit object injected
//! through handler deps so tests get a fresh table per test.

use dashmap::DashMap;
use teloxide::types::{MessageId, UserId};

use crate::hosting::HostedPhoto;

/// Position in the order-creation dialogue. Drives all input routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    AwaitingPhotos,
    AwaitingCustomerName,
    AwaitingPhone,
    AwaitingWilaya,
    AwaitingAddress,
    AwaitingAmount,
    AwaitingNotes,
    Reviewing,
    Submitting,
    /// Staff flow: entering the amount of a distributor payment
    AwaitingPaymentAmount,
    /// Staff flow: entering the corrected amount of an existing payment
    AwaitingPaymentEdit,
}

impl Step {
    /// The step the back button returns to. Review backs into notes (the
    /// step it follows in forward order); the first step has no target.
    pub fn back_target(self) -> Option<Step> {
        match self {
            Step::AwaitingPhotos => None,
            Step::AwaitingCustomerName => Some(Step::AwaitingPhotos),
            Step::AwaitingPhone => Some(Step::AwaitingCustomerName),
            Step::AwaitingWilaya => Some(Step::AwaitingPhone),
            Step::AwaitingAddress => Some(Step::AwaitingWilaya),
            Step::AwaitingAmount => Some(Step::AwaitingAddress),
            Step::AwaitingNotes => Some(Step::AwaitingAmount),
            Step::Reviewing => Some(Step::AwaitingNotes),
            Step::Submitting | Step::AwaitingPaymentAmount | Step::AwaitingPaymentEdit => None,
        }
    }

    /// The next step in the forward chain, for a prompt step.
    pub fn forward_target(self) -> Option<Step> {
        match self {
            Step::AwaitingPhotos => Some(Step::AwaitingCustomerName),
            Step::AwaitingCustomerName => Some(Step::AwaitingPhone),
            Step::AwaitingPhone => Some(Step::AwaitingWilaya),
            Step::AwaitingWilaya => Some(Step::AwaitingAddress),
            Step::AwaitingAddress => Some(Step::AwaitingAmount),
            Step::AwaitingAmount => Some(Step::AwaitingNotes),
            Step::AwaitingNotes => Some(Step::Reviewing),
            _ => None,
        }
    }
}

/// How the current prompt step was entered.
///
/// `EditingFrom` marks a single-field edit jump from the review screen;
/// the carried step is where the next valid input returns to, instead of
/// continuing the forward chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WizardMode {
    #[default]
    Forward,
    EditingFrom(Step),
}

/// One user's in-flight wizard state.
#[derive(Debug, Clone)]
pub struct Session {
    pub step: Step,
    pub mode: WizardMode,
    /// Telegram file ids of the order photos, in the order received
    pub photo_file_ids: Vec<String>,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub wilaya: Option<String>,
    pub address: Option<String>,
    pub amount_total: Option<f64>,
    pub notes: Option<String>,
    /// The single live wizard prompt, edited in place across steps
    pub last_prompt_id: Option<MessageId>,
    /// Review-stage photo album messages, deleted as a unit on leaving review
    pub review_media_ids: Vec<MessageId>,
    /// Hosting records, populated once the photo upload step completes
    pub uploaded_photos: Vec<HostedPhoto>,
    /// Staff payment flow: the wilaya a payment is being recorded for
    pub payment_wilaya: Option<String>,
    /// Staff payment flow: the payment record under edit
    pub payment_id_for_edit: Option<String>,
}

impl Session {
    /// Fresh session at the first wizard step.
    pub fn new() -> Self {
        Self {
            step: Step::AwaitingPhotos,
            mode: WizardMode::Forward,
            photo_file_ids: Vec::new(),
            customer_name: None,
            phone: None,
            wilaya: None,
            address: None,
            amount_total: None,
            notes: None,
            last_prompt_id: None,
            review_media_ids: Vec::new(),
            uploaded_photos: Vec::new(),
            payment_wilaya: None,
            payment_id_for_edit: None,
        }
    }

    /// Minimal session for the staff payment sub-flow.
    pub fn for_payment(step: Step, wilaya: String, payment_id: Option<String>) -> Self {
        let mut session = Self::new();
        session.step = step;
        session.payment_wilaya = Some(wilaya);
        session.payment_id_for_edit = payment_id;
        session
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of the atomic confirm gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitGate {
    /// No active session for the user
    NoSession,
    /// A submission is already in flight; this attempt must be rejected
    AlreadySubmitting,
    /// The session was moved to `Submitting` by this call
    Started,
}

/// Process-wide session table, one entry per active user.
///
/// Handlers re-fetch by user id at the start of every event and write the
/// mutated copy back; nothing holds a map guard across an await.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<UserId, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a user's session, if any.
    pub fn get(&self, user: UserId) -> Option<Session> {
        self.sessions.get(&user).map(|entry| entry.clone())
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.sessions.contains_key(&user)
    }

    /// Writes a session back (insert or replace).
    pub fn set(&self, user: UserId, session: Session) {
        self.sessions.insert(user, session);
    }

    /// Destroys a user's session, returning the final state.
    pub fn remove(&self, user: UserId) -> Option<Session> {
        self.sessions.remove(&user).map(|(_, session)| session)
    }

    /// Atomic duplicate-confirm gate: flips the step to `Submitting`
    /// unless a submission is already in flight. Returns the pre-flip
    /// session snapshot on success so the caller can keep working on it.
    pub fn try_begin_submit(&self, user: UserId) -> (SubmitGate, Option<Session>) {
        match self.sessions.get_mut(&user) {
            None => (SubmitGate::NoSession, None),
            Some(mut entry) => {
                if entry.step == Step::Submitting {
                    (SubmitGate::AlreadySubmitting, None)
                } else {
                    let snapshot = entry.clone();
                    entry.step = Step::Submitting;
                    (SubmitGate::Started, Some(snapshot))
                }
            }
        }
    }
}
