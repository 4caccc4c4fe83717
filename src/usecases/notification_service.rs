//! Notification orchestration: personal messages, member fan-out, group
//! creation + notify, adding members to an existing group.
//!
//! Every operation returns outcome values; nothing here fails with an error.
//! The service holds only read-only collaborators, so one instance can serve
//! concurrent callers.

use crate::adapters::whatsapp::ProviderRequestBuilder;
use crate::domain::{
    DeliveryOutcome, DispatchSummary, GroupHandle, MessageTemplate, NormalizedPhoneNumber,
    ProviderAck, ProviderRequest, Recipient, RecipientOutcome, RequestError, SummaryBuilder,
};
use crate::ports::DeliveryPort;
use crate::shared::config::{
    DEFAULT_MAX_CONCURRENT_SENDS, DEFAULT_REGION, MAX_CONCURRENT_SENDS_LIMIT, RetryPolicy,
};
use crate::usecases::group_flow::{FlowEvent, FlowState, transition};
use crate::usecases::phone_normalizer::PhoneNormalizer;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tuning for one service instance.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub default_region: String,
    /// Concurrent member sends during fan-out; clamped to 1..=10.
    pub max_concurrent_sends: usize,
    pub retry: RetryPolicy,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            default_region: DEFAULT_REGION.to_string(),
            max_concurrent_sends: DEFAULT_MAX_CONCURRENT_SENDS,
            retry: RetryPolicy::none(),
        }
    }
}

/// Result of the group creation + notify flow.
#[derive(Debug, Clone, Serialize)]
pub struct GroupDispatchReport {
    /// Terminal state: `Done` or `Failed`.
    pub state: FlowState,
    /// Present once the provider created the group.
    pub group: Option<GroupHandle>,
    /// Outcome of the create-group call; `None` if it was never made.
    pub group_outcome: Option<DeliveryOutcome>,
    /// Outcome of the invite-link fetch; `None` if it was never made.
    pub invite_link_outcome: Option<DeliveryOutcome>,
    /// Per-member outcomes, in roster order.
    pub members: DispatchSummary,
}

impl GroupDispatchReport {
    pub fn is_done(&self) -> bool {
        self.state == FlowState::Done
    }
}

/// One member's personal message across retry rounds.
struct PendingText<'a> {
    index: usize,
    recipient: &'a Recipient,
    phone: NormalizedPhoneNumber,
    body: String,
    outcome: Option<DeliveryOutcome>,
    attempts: u32,
}

impl PendingText<'_> {
    fn into_outcome(self) -> RecipientOutcome {
        RecipientOutcome {
            user_id: self.recipient.user_id.clone(),
            display_name: self.recipient.display_name.clone(),
            phone: Some(self.phone),
            outcome: self
                .outcome
                .unwrap_or_else(|| DeliveryOutcome::transient("not attempted")),
            attempts: self.attempts,
        }
    }
}

/// Notification orchestrator. Owns no state between calls.
pub struct NotificationService {
    delivery: Arc<dyn DeliveryPort>,
    normalizer: Arc<PhoneNormalizer>,
    requests: ProviderRequestBuilder,
    settings: DispatchSettings,
}

impl NotificationService {
    pub fn new(
        delivery: Arc<dyn DeliveryPort>,
        normalizer: Arc<PhoneNormalizer>,
        requests: ProviderRequestBuilder,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            delivery,
            normalizer,
            requests,
            settings,
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Normalize a recipient's number with the configured default region.
    /// `None` when missing or invalid; such recipients are never sent to the provider.
    pub fn resolve_phone(&self, recipient: &Recipient) -> Option<NormalizedPhoneNumber> {
        let Some(raw) = recipient.raw_phone_number.as_deref() else {
            debug!(user_id = %recipient.user_id, "no phone number on file");
            return None;
        };
        match self.normalizer.normalize(raw, &self.settings.default_region) {
            Ok(phone) => Some(phone),
            Err(e) => {
                warn!(user_id = %recipient.user_id, error = %e, "unusable phone number");
                None
            }
        }
    }

    /// Single personal message: normalize, then send (with the configured retry policy).
    pub async fn send_personal_message(
        &self,
        recipient: &Recipient,
        body: &str,
        cancel: &CancellationToken,
    ) -> DeliveryOutcome {
        let summary = self
            .notify_members(
                std::slice::from_ref(recipient),
                &MessageTemplate::new(body),
                cancel,
            )
            .await;
        summary
            .outcomes()
            .first()
            .map(|o| o.outcome.clone())
            .unwrap_or(DeliveryOutcome::SkippedNoPhone)
    }

    /// Personal message to each member, rendered per recipient. No group involved.
    pub async fn notify_members(
        &self,
        members: &[Recipient],
        message: &MessageTemplate,
        cancel: &CancellationToken,
    ) -> DispatchSummary {
        info!(members = members.len(), "notifying members");
        let mut slots: Vec<Option<RecipientOutcome>> = vec![None; members.len()];
        let mut pending = Vec::with_capacity(members.len());

        for (index, recipient) in members.iter().enumerate() {
            match self.resolve_phone(recipient) {
                Some(phone) => pending.push(PendingText {
                    index,
                    recipient,
                    phone,
                    body: message.render(recipient, None),
                    outcome: None,
                    attempts: 0,
                }),
                None => slots[index] = Some(skipped(recipient)),
            }
        }

        self.deliver_texts(pending, &mut slots, cancel).await;
        finish_summary(slots)
    }

    /// Create a group from `members`, fetch its invite link, then message every
    /// member with a usable number. Always returns a report.
    pub async fn create_group_and_notify(
        &self,
        group_name: &str,
        members: &[Recipient],
        message: &MessageTemplate,
        cancel: &CancellationToken,
    ) -> GroupDispatchReport {
        let mut state = FlowState::Start;
        let mut slots: Vec<Option<RecipientOutcome>> = vec![None; members.len()];
        let mut eligible: Vec<(usize, &Recipient, NormalizedPhoneNumber)> = Vec::new();
        let mut group: Option<GroupHandle> = None;
        let mut group_outcome: Option<DeliveryOutcome> = None;
        let mut invite_link_outcome: Option<DeliveryOutcome> = None;

        while !state.is_terminal() {
            debug!(group = group_name, state = %state, "group flow step");
            let event = match &state {
                FlowState::Start => {
                    for (index, recipient) in members.iter().enumerate() {
                        match self.resolve_phone(recipient) {
                            Some(phone) => eligible.push((index, recipient, phone)),
                            None => slots[index] = Some(skipped(recipient)),
                        }
                    }
                    FlowEvent::ParticipantsNormalized {
                        eligible: eligible.len(),
                    }
                }
                FlowState::CreatingGroup => {
                    let participants: Vec<NormalizedPhoneNumber> =
                        eligible.iter().map(|(_, _, phone)| phone.clone()).collect();
                    let (outcome, _) = self
                        .execute_built(self.requests.create_group(group_name, &participants), cancel)
                        .await;
                    let event = match outcome.ack() {
                        Some(ProviderAck::GroupCreated { group_id }) => {
                            info!(group = group_name, group_id = %group_id, "group created");
                            group = Some(GroupHandle {
                                provider_group_id: group_id.clone(),
                                invite_link: None,
                            });
                            FlowEvent::GroupCreated
                        }
                        _ => FlowEvent::GroupCreateFailed {
                            reason: outcome
                                .reason()
                                .unwrap_or("unexpected acknowledgement")
                                .to_string(),
                        },
                    };
                    group_outcome = Some(outcome);
                    event
                }
                FlowState::FetchingInviteLink => match group.as_mut() {
                    Some(handle) => {
                        let request = self.requests.fetch_invite_link(&handle.provider_group_id);
                        let (outcome, _) = self.execute_cancellable(&request, cancel).await;
                        let event = match outcome.ack() {
                            Some(ProviderAck::InviteLink { url }) => {
                                handle.invite_link = Some(url.clone());
                                FlowEvent::InviteLinkFetched
                            }
                            _ => {
                                warn!(
                                    group_id = %handle.provider_group_id,
                                    outcome = %outcome,
                                    "invite link unavailable; continuing without it"
                                );
                                FlowEvent::InviteLinkUnavailable
                            }
                        };
                        invite_link_outcome = Some(outcome);
                        event
                    }
                    None => FlowEvent::InviteLinkUnavailable,
                },
                FlowState::NotifyingMembers => {
                    let pending: Vec<PendingText<'_>> = eligible
                        .iter()
                        .map(|(index, recipient, phone)| PendingText {
                            index: *index,
                            recipient: *recipient,
                            phone: phone.clone(),
                            body: message
                                .render(recipient, group.as_ref().map(|g| (group_name, g))),
                            outcome: None,
                            attempts: 0,
                        })
                        .collect();
                    self.deliver_texts(pending, &mut slots, cancel).await;
                    FlowEvent::MembersNotified
                }
                FlowState::Done | FlowState::Failed { .. } => break,
            };
            state = transition(state, event);
        }

        if let FlowState::Failed { reason } = &state {
            warn!(group = group_name, reason = %reason, "group flow failed");
            // The group never existed: every eligible member shares the create-group failure.
            let shared = group_outcome
                .clone()
                .unwrap_or_else(|| DeliveryOutcome::rejected(reason.clone()));
            for (index, recipient, phone) in &eligible {
                if slots[*index].is_none() {
                    slots[*index] = Some(RecipientOutcome {
                        user_id: recipient.user_id.clone(),
                        display_name: recipient.display_name.clone(),
                        phone: Some(phone.clone()),
                        outcome: shared.clone(),
                        attempts: 0,
                    });
                }
            }
        }

        let members = finish_summary(slots);
        info!(
            group = group_name,
            state = %state,
            succeeded = members.succeeded(),
            rejected = members.rejected(),
            transient = members.transient_failures(),
            skipped = members.skipped_no_phone(),
            "group dispatch finished"
        );
        GroupDispatchReport {
            state,
            group,
            group_outcome,
            invite_link_outcome,
            members,
        }
    }

    /// Add one recipient to an existing provider group. Single attempt.
    pub async fn add_member(
        &self,
        group_id: &str,
        recipient: &Recipient,
        cancel: &CancellationToken,
    ) -> DeliveryOutcome {
        let Some(phone) = self.resolve_phone(recipient) else {
            return DeliveryOutcome::SkippedNoPhone;
        };
        let request = self.requests.add_participant(group_id, &phone);
        let (outcome, _) = self.execute_cancellable(&request, cancel).await;
        info!(group_id, user_id = %recipient.user_id, outcome = %outcome, "add member finished");
        outcome
    }

    /// Fan out personal texts with bounded concurrency, then run retry rounds
    /// for retryable failures. Results land in `slots` by roster index.
    async fn deliver_texts(
        &self,
        mut pending: Vec<PendingText<'_>>,
        slots: &mut [Option<RecipientOutcome>],
        cancel: &CancellationToken,
    ) {
        let concurrency = self
            .settings
            .max_concurrent_sends
            .clamp(1, MAX_CONCURRENT_SENDS_LIMIT);
        let retry = self.settings.retry;

        for round in 0..retry.max_attempts {
            let due: Vec<usize> = pending
                .iter()
                .enumerate()
                .filter(|(_, p)| p.outcome.as_ref().is_none_or(DeliveryOutcome::is_retryable))
                .map(|(i, _)| i)
                .collect();
            if due.is_empty() {
                break;
            }
            if round > 0 {
                let delay = retry.delay_before(round);
                info!(round, recipients = due.len(), delay_ms = delay.as_millis() as u64, "retrying transient failures");
                let cancelled = cancel.is_cancelled()
                    || tokio::select! {
                        _ = cancel.cancelled() => true,
                        _ = tokio::time::sleep(delay) => false,
                    };
                if cancelled {
                    // Retry sends that never started resolve as cancelled; attempts stay as counted.
                    for i in due {
                        pending[i].outcome = Some(DeliveryOutcome::cancelled());
                    }
                    break;
                }
            }

            let results: Vec<(usize, DeliveryOutcome, u32)> = stream::iter(due)
                .map(|i| {
                    let entry = &pending[i];
                    async move {
                        let (outcome, calls) = self
                            .execute_built(self.requests.send_text(&entry.phone, &entry.body), cancel)
                            .await;
                        (i, outcome, calls)
                    }
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

            for (i, outcome, calls) in results {
                let entry = &mut pending[i];
                debug!(user_id = %entry.recipient.user_id, outcome = %outcome, "member send finished");
                entry.outcome = Some(outcome);
                entry.attempts += calls;
            }
        }

        for entry in pending {
            let index = entry.index;
            slots[index] = Some(entry.into_outcome());
        }
    }

    /// Local build failures become `Rejected` without touching the provider.
    async fn execute_built(
        &self,
        request: Result<ProviderRequest, RequestError>,
        cancel: &CancellationToken,
    ) -> (DeliveryOutcome, u32) {
        match request {
            Ok(request) => self.execute_cancellable(&request, cancel).await,
            Err(e) => {
                warn!(error = %e, "request not sent");
                (DeliveryOutcome::rejected(e.to_string()), 0)
            }
        }
    }

    /// One provider call raced against cancellation. Returns the outcome and
    /// the number of calls started (0 if cancelled before starting).
    async fn execute_cancellable(
        &self,
        request: &ProviderRequest,
        cancel: &CancellationToken,
    ) -> (DeliveryOutcome, u32) {
        if cancel.is_cancelled() {
            return (DeliveryOutcome::cancelled(), 0);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => (DeliveryOutcome::cancelled(), 1),
            outcome = self.delivery.execute(request) => (outcome, 1),
        }
    }
}

fn skipped(recipient: &Recipient) -> RecipientOutcome {
    RecipientOutcome {
        user_id: recipient.user_id.clone(),
        display_name: recipient.display_name.clone(),
        phone: None,
        outcome: DeliveryOutcome::SkippedNoPhone,
        attempts: 0,
    }
}

fn finish_summary(slots: Vec<Option<RecipientOutcome>>) -> DispatchSummary {
    let mut builder = SummaryBuilder::with_capacity(slots.len());
    for outcome in slots.into_iter().flatten() {
        builder.record(outcome);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::numbering::StaticNumberingPlan;
    use crate::adapters::whatsapp::{MockAction, MockDeliveryAdapter};
    use crate::domain::{CANCELLED_REASON, OutcomeKind};
    use crate::usecases::group_flow::NO_ELIGIBLE_PARTICIPANTS;
    use std::time::{Duration, Instant};

    fn service_with(mock: Arc<MockDeliveryAdapter>, settings: DispatchSettings) -> NotificationService {
        let plan = Arc::new(StaticNumberingPlan::builtin().unwrap());
        NotificationService::new(
            mock,
            Arc::new(PhoneNormalizer::new(plan)),
            ProviderRequestBuilder::new("1055"),
            settings,
        )
    }

    fn service(mock: Arc<MockDeliveryAdapter>) -> NotificationService {
        service_with(mock, DispatchSettings::default())
    }

    fn member(id: &str, phone: Option<&str>) -> Recipient {
        Recipient::new(id, format!("Volunteer {}", id), phone.map(str::to_string))
    }

    #[tokio::test]
    async fn test_missing_phone_is_skipped_without_calls() {
        let mock = Arc::new(MockDeliveryAdapter::new());
        let svc = service(Arc::clone(&mock));

        let outcome = svc
            .send_personal_message(&member("1", None), "hello", &CancellationToken::new())
            .await;

        assert_eq!(outcome, DeliveryOutcome::SkippedNoPhone);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_personal_message_is_sent_to_normalized_number() {
        let mock = Arc::new(MockDeliveryAdapter::new());
        let svc = service(Arc::clone(&mock));

        let outcome = svc
            .send_personal_message(
                &member("1", Some("0300-1234567")),
                "Welcome!",
                &CancellationToken::new(),
            )
            .await;

        assert!(outcome.is_success());
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        let body = calls[0].body.as_ref().unwrap();
        assert_eq!(body["to"], "+923001234567");
        assert_eq!(body["text"]["body"], "Welcome!");
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected_locally() {
        let mock = Arc::new(MockDeliveryAdapter::new());
        let svc = service(Arc::clone(&mock));

        let outcome = svc
            .send_personal_message(&member("1", Some("03001234567")), "  ", &CancellationToken::new())
            .await;

        assert_eq!(outcome, DeliveryOutcome::rejected("message body is empty"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mixed_batch_outcomes() {
        let mock = Arc::new(
            MockDeliveryAdapter::new()
                .with_response_to("+923211234567", DeliveryOutcome::transient("HTTP 500: boom")),
        );
        let svc = service(Arc::clone(&mock));
        let members = vec![
            member("bad", Some("call me maybe")),
            member("flaky", Some("0321 1234567")),
            member("ok", Some("0300 1234567")),
        ];

        let summary = svc
            .notify_members(&members, &"Salam {name}".into(), &CancellationToken::new())
            .await;

        assert_eq!(summary.skipped_no_phone(), 1);
        assert_eq!(summary.transient_failures(), 1);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.rejected(), 0);
        assert_eq!(mock.call_count(), 2);
        // roster order is preserved regardless of completion order
        let ids: Vec<&str> = summary.outcomes().iter().map(|o| o.user_id.as_str()).collect();
        assert_eq!(ids, vec!["bad", "flaky", "ok"]);
        assert_eq!(summary.outcome_for("bad").unwrap().attempts, 0);
    }

    #[tokio::test]
    async fn test_group_flow_happy_path_renders_invite_link() {
        let mock = Arc::new(MockDeliveryAdapter::new());
        let svc = service(Arc::clone(&mock));
        let members = vec![
            member("1", Some("03001234567")),
            member("2", Some("+92 321 1234567")),
            member("3", None),
        ];

        let report = svc
            .create_group_and_notify(
                "Relief Team",
                &members,
                &"{name}: join {group_name} at {invite_link}".into(),
                &CancellationToken::new(),
            )
            .await;

        assert!(report.is_done());
        let group = report.group.as_ref().unwrap();
        let link = group.invite_link.as_deref().unwrap();
        assert_eq!(link, format!("https://chat.whatsapp.com/mock-{}", group.provider_group_id));
        assert_eq!(report.members.succeeded(), 2);
        assert_eq!(report.members.skipped_no_phone(), 1);

        assert_eq!(mock.count_of(MockAction::CreateGroup), 1);
        assert_eq!(mock.count_of(MockAction::FetchInviteLink), 1);
        assert_eq!(mock.count_of(MockAction::SendText), 2);
        let create = &mock.calls()[0];
        assert_eq!(
            create.body.as_ref().unwrap()["participants"],
            serde_json::json!(["+923001234567", "+923211234567"])
        );
        let texts: Vec<String> = mock
            .calls()
            .iter()
            .filter(|c| MockAction::from(&c.kind) == MockAction::SendText)
            .map(|c| c.body.as_ref().unwrap()["text"]["body"].as_str().unwrap().to_string())
            .collect();
        assert!(texts.iter().all(|t| t.ends_with(link)));
        assert!(texts.iter().any(|t| t.starts_with("Volunteer 1: join Relief Team")));
    }

    #[tokio::test]
    async fn test_invite_link_failure_does_not_abort() {
        let mock = Arc::new(
            MockDeliveryAdapter::new()
                .with_response(MockAction::FetchInviteLink, DeliveryOutcome::rejected("HTTP 404: x")),
        );
        let svc = service(Arc::clone(&mock));
        let members = vec![member("1", Some("03001234567")), member("2", Some("03211234567"))];

        let report = svc
            .create_group_and_notify("Relief", &members, &"Welcome".into(), &CancellationToken::new())
            .await;

        assert_eq!(report.state, FlowState::Done);
        assert!(report.group_outcome.as_ref().unwrap().is_success());
        assert_eq!(report.group.as_ref().unwrap().invite_link, None);
        assert_eq!(
            report.invite_link_outcome,
            Some(DeliveryOutcome::rejected("HTTP 404: x"))
        );
        assert_eq!(report.members.succeeded(), 2);
        assert!(report.members.is_complete());
    }

    #[tokio::test]
    async fn test_group_create_failure_fails_whole_batch() {
        let mock = Arc::new(
            MockDeliveryAdapter::new().with_response(MockAction::CreateGroup, DeliveryOutcome::timeout()),
        );
        let svc = service(Arc::clone(&mock));
        let members = vec![
            member("1", Some("03001234567")),
            member("2", Some("03211234567")),
            member("3", None),
        ];

        let report = svc
            .create_group_and_notify("Relief", &members, &"Welcome".into(), &CancellationToken::new())
            .await;

        assert_eq!(
            report.state,
            FlowState::Failed {
                reason: "timeout".into()
            }
        );
        assert!(report.group.is_none());
        assert!(report.invite_link_outcome.is_none());
        assert_eq!(report.members.transient_failures(), 2);
        assert_eq!(report.members.skipped_no_phone(), 1);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_eligible_participants_makes_no_calls() {
        let mock = Arc::new(MockDeliveryAdapter::new());
        let svc = service(Arc::clone(&mock));
        let members = vec![member("1", None), member("2", Some("12"))];

        let report = svc
            .create_group_and_notify("Relief", &members, &"Welcome".into(), &CancellationToken::new())
            .await;

        assert_eq!(
            report.state,
            FlowState::Failed {
                reason: NO_ELIGIBLE_PARTICIPANTS.into()
            }
        );
        assert!(report.group_outcome.is_none());
        assert_eq!(report.members.skipped_no_phone(), 2);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_makes_no_calls() {
        let mock = Arc::new(MockDeliveryAdapter::new());
        let svc = service(Arc::clone(&mock));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = svc
            .send_personal_message(&member("1", Some("03001234567")), "hi", &cancel)
            .await;

        assert_eq!(outcome, DeliveryOutcome::cancelled());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_resolves_in_flight_sends() {
        let mock = Arc::new(MockDeliveryAdapter::new().with_delay(Duration::from_secs(30)));
        let svc = service(Arc::clone(&mock));
        let members: Vec<Recipient> = (0..8)
            .map(|i| member(&i.to_string(), Some(&format!("03001234{:03}", i))))
            .collect();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let summary = svc
            .notify_members(&members, &"hi".into(), &cancel)
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(summary.transient_failures(), 8);
        assert!(summary
            .outcomes()
            .iter()
            .all(|o| o.outcome.reason() == Some(CANCELLED_REASON)));
    }

    #[tokio::test]
    async fn test_cancel_during_retry_backoff_resolves_as_cancelled() {
        let mock = Arc::new(
            MockDeliveryAdapter::new()
                .with_response_to("+923001234567", DeliveryOutcome::transient("HTTP 503: x")),
        );
        let svc = service_with(
            Arc::clone(&mock),
            DispatchSettings {
                retry: RetryPolicy::new(3, Duration::from_secs(5)),
                ..Default::default()
            },
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let summary = svc
            .notify_members(
                &[member("flaky", Some("03001234567")), member("ok", Some("03211234567"))],
                &"hi".into(),
                &cancel,
            )
            .await;

        assert!(started.elapsed() < Duration::from_secs(2));
        let flaky = summary.outcome_for("flaky").unwrap();
        assert_eq!(flaky.outcome, DeliveryOutcome::cancelled());
        assert_eq!(flaky.outcome.reason(), Some(CANCELLED_REASON));
        assert!(!flaky.outcome.is_retryable());
        assert_eq!(flaky.attempts, 1);
        assert!(summary.outcome_for("ok").unwrap().outcome.is_success());
        assert_eq!(mock.calls_to("+923001234567"), 1);
    }

    #[tokio::test]
    async fn test_fan_out_is_bounded() {
        let mock = Arc::new(MockDeliveryAdapter::new().with_delay(Duration::from_millis(30)));
        let svc = service_with(
            Arc::clone(&mock),
            DispatchSettings {
                max_concurrent_sends: 3,
                ..Default::default()
            },
        );
        let members: Vec<Recipient> = (0..12)
            .map(|i| member(&i.to_string(), Some(&format!("03001234{:03}", i))))
            .collect();

        let summary = svc
            .notify_members(&members, &"hi".into(), &CancellationToken::new())
            .await;

        assert_eq!(summary.succeeded(), 12);
        assert!(mock.peak_in_flight() <= 3);
        assert!(mock.peak_in_flight() >= 1);
    }

    #[tokio::test]
    async fn test_retry_policy_resends_only_transient_failures() {
        let mock = Arc::new(
            MockDeliveryAdapter::new()
                .with_responses_to(
                    "+923001234567",
                    vec![DeliveryOutcome::transient("HTTP 503: busy"), DeliveryOutcome::timeout()],
                )
                .with_response_to("+923211234567", DeliveryOutcome::rejected("HTTP 400: bad")),
        );
        let svc = service_with(
            Arc::clone(&mock),
            DispatchSettings {
                retry: RetryPolicy::new(3, Duration::from_millis(5)),
                ..Default::default()
            },
        );
        let members = vec![
            member("flaky", Some("03001234567")),
            member("bad", Some("03211234567")),
            member("ok", Some("03331234567")),
        ];

        let summary = svc
            .notify_members(&members, &"hi".into(), &CancellationToken::new())
            .await;

        let flaky = summary.outcome_for("flaky").unwrap();
        assert!(flaky.outcome.is_success());
        assert_eq!(flaky.attempts, 3);
        assert_eq!(summary.outcome_for("bad").unwrap().attempts, 1);
        assert_eq!(summary.outcome_for("ok").unwrap().attempts, 1);
        assert_eq!(mock.calls_to("+923001234567"), 3);
        assert_eq!(summary.count(OutcomeKind::Rejected), 1);
    }

    #[tokio::test]
    async fn test_without_retry_transient_stays_failed() {
        let mock = Arc::new(
            MockDeliveryAdapter::new()
                .with_responses_to("+923001234567", vec![DeliveryOutcome::timeout()]),
        );
        let svc = service(Arc::clone(&mock));

        let outcome = svc
            .send_personal_message(&member("1", Some("03001234567")), "hi", &CancellationToken::new())
            .await;

        assert_eq!(outcome, DeliveryOutcome::timeout());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_add_member() {
        let mock = Arc::new(MockDeliveryAdapter::new());
        let svc = service(Arc::clone(&mock));
        let cancel = CancellationToken::new();

        let added = svc
            .add_member("G1", &member("1", Some("03001234567")), &cancel)
            .await;
        let skipped = svc.add_member("G1", &member("2", None), &cancel).await;

        assert_eq!(
            added,
            DeliveryOutcome::success(ProviderAck::ParticipantAdded {
                group_id: "G1".into()
            })
        );
        assert_eq!(skipped, DeliveryOutcome::SkippedNoPhone);
        assert_eq!(mock.count_of(MockAction::AddParticipant), 1);
        assert_eq!(mock.calls()[0].path, "/message_groups/G1");
    }
}
