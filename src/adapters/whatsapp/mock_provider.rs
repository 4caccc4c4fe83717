//! Mock delivery adapter for dry runs and tests.
//!
//! Acknowledges everything by default with synthetic ids. Responses can be
//! scripted per action or per recipient number, and every request is recorded.

use crate::domain::{DeliveryOutcome, ProviderAck, ProviderRequest, RequestKind};
use crate::ports::DeliveryPort;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

/// Provider action, for scripting responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockAction {
    CreateGroup,
    SendText,
    AddParticipant,
    FetchInviteLink,
}

impl From<&RequestKind> for MockAction {
    fn from(kind: &RequestKind) -> Self {
        match kind {
            RequestKind::CreateGroup => MockAction::CreateGroup,
            RequestKind::SendText => MockAction::SendText,
            RequestKind::AddParticipant { .. } => MockAction::AddParticipant,
            RequestKind::FetchInviteLink { .. } => MockAction::FetchInviteLink,
        }
    }
}

#[derive(Default)]
struct Script {
    by_action: HashMap<MockAction, DeliveryOutcome>,
    by_recipient: HashMap<String, DeliveryOutcome>,
    queued_for_recipient: HashMap<String, VecDeque<DeliveryOutcome>>,
}

/// Mock DeliveryPort. Never touches the network.
#[derive(Default)]
pub struct MockDeliveryAdapter {
    /// Simulated provider latency.
    delay: Duration,
    script: Mutex<Script>,
    calls: Mutex<Vec<ProviderRequest>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    sequence: AtomicUsize,
}

impl MockDeliveryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every request of `action` resolves to `outcome`.
    pub fn with_response(self, action: MockAction, outcome: DeliveryOutcome) -> Self {
        self.lock_script().by_action.insert(action, outcome);
        self
    }

    /// Sends and participant adds addressed to `number` (E.164) resolve to `outcome`.
    pub fn with_response_to(self, number: &str, outcome: DeliveryOutcome) -> Self {
        self.lock_script()
            .by_recipient
            .insert(number.to_string(), outcome);
        self
    }

    /// Consume `outcomes` in order for `number`, then fall back to the other rules.
    pub fn with_responses_to(self, number: &str, outcomes: Vec<DeliveryOutcome>) -> Self {
        self.lock_script()
            .queued_for_recipient
            .insert(number.to_string(), outcomes.into());
        self
    }

    pub fn calls(&self) -> Vec<ProviderRequest> {
        self.lock_calls().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    pub fn count_of(&self, action: MockAction) -> usize {
        self.lock_calls()
            .iter()
            .filter(|r| MockAction::from(&r.kind) == action)
            .count()
    }

    /// Calls made for one recipient number (sends and participant adds).
    pub fn calls_to(&self, number: &str) -> usize {
        self.lock_calls()
            .iter()
            .filter(|r| recipient_of(r).as_deref() == Some(number))
            .count()
    }

    /// Highest number of concurrently executing requests observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<ProviderRequest>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn scripted(&self, request: &ProviderRequest) -> Option<DeliveryOutcome> {
        let mut script = self.lock_script();
        if let Some(number) = recipient_of(request) {
            if let Some(next) = script
                .queued_for_recipient
                .get_mut(&number)
                .and_then(VecDeque::pop_front)
            {
                return Some(next);
            }
            if let Some(outcome) = script.by_recipient.get(&number) {
                return Some(outcome.clone());
            }
        }
        script.by_action.get(&MockAction::from(&request.kind)).cloned()
    }

    fn default_ack(&self, kind: &RequestKind) -> ProviderAck {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        match kind {
            RequestKind::CreateGroup => ProviderAck::GroupCreated {
                group_id: format!("mock-group-{}", n),
            },
            RequestKind::SendText => ProviderAck::MessageAccepted {
                message_id: format!("mock-wamid-{}", n),
            },
            RequestKind::AddParticipant { group_id } => ProviderAck::ParticipantAdded {
                group_id: group_id.clone(),
            },
            RequestKind::FetchInviteLink { group_id } => ProviderAck::InviteLink {
                url: format!("https://chat.whatsapp.com/mock-{}", group_id),
            },
        }
    }
}

/// Releases an in-flight slot even when the request future is dropped mid-call.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// E.164 number a request is addressed to, if any.
fn recipient_of(request: &ProviderRequest) -> Option<String> {
    let body = request.body.as_ref()?;
    match request.kind {
        RequestKind::SendText => body.get("to")?.as_str().map(str::to_string),
        RequestKind::AddParticipant { .. } => body
            .get("add_participant")?
            .get(0)?
            .as_str()
            .map(str::to_string),
        _ => None,
    }
}

#[async_trait::async_trait]
impl DeliveryPort for MockDeliveryAdapter {
    async fn execute(&self, request: &ProviderRequest) -> DeliveryOutcome {
        self.lock_calls().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlightGuard(&self.in_flight);

        info!(method = %request.method, path = %request.path, "[MOCK] provider request");
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.scripted(request)
            .unwrap_or_else(|| DeliveryOutcome::success(self.default_ack(&request.kind)))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HttpMethod;
    use serde_json::json;

    fn send_to(number: &str) -> ProviderRequest {
        ProviderRequest {
            kind: RequestKind::SendText,
            method: HttpMethod::Post,
            path: "/1/messages".into(),
            body: Some(json!({"to": number})),
        }
    }

    #[tokio::test]
    async fn test_defaults_to_success() {
        let mock = MockDeliveryAdapter::new();
        let outcome = mock.execute(&send_to("+923001234567")).await;
        assert!(outcome.is_success());
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.calls_to("+923001234567"), 1);
        assert_eq!(mock.count_of(MockAction::SendText), 1);
    }

    #[tokio::test]
    async fn test_scripted_responses_take_priority() {
        let mock = MockDeliveryAdapter::new()
            .with_response(MockAction::SendText, DeliveryOutcome::rejected("policy"))
            .with_response_to("+923001234567", DeliveryOutcome::transient("HTTP 500: x"))
            .with_responses_to("+923001234567", vec![DeliveryOutcome::timeout()]);

        assert_eq!(
            mock.execute(&send_to("+923001234567")).await,
            DeliveryOutcome::timeout()
        );
        assert_eq!(
            mock.execute(&send_to("+923001234567")).await,
            DeliveryOutcome::transient("HTTP 500: x")
        );
        assert_eq!(
            mock.execute(&send_to("+923211234567")).await,
            DeliveryOutcome::rejected("policy")
        );
    }

    #[tokio::test]
    async fn test_dropped_call_releases_in_flight_slot() {
        let mock = MockDeliveryAdapter::new().with_delay(Duration::from_secs(30));
        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            mock.execute(&send_to("+923001234567")),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(mock.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(mock.peak_in_flight(), 1);
    }
}
