//! WhatsApp Business HTTP adapter. Implements DeliveryPort with reqwest.
//!
//! One request per `execute`, bounded by the configured timeout. Responses are
//! classified into `DeliveryOutcome`; nothing is retried here.

use crate::domain::{DeliveryOutcome, HttpMethod, ProviderAck, ProviderRequest, RequestKind};
use crate::ports::DeliveryPort;
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Max characters of a provider error body kept in a rejection reason.
const MAX_REASON_CHARS: usize = 200;

/// Provider base URL, e.g. `https://graph.facebook.com/v18.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoint {
    base_url: String,
}

impl ProviderEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `path` starts with `/`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Bearer token. `Debug` never prints the secret.
#[derive(Clone)]
pub struct ProviderCredentials {
    token: String,
}

impl ProviderCredentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// reqwest-backed delivery executor. Endpoint, credentials and timeout are fixed at construction.
pub struct HttpDeliveryExecutor {
    client: reqwest::Client,
    endpoint: ProviderEndpoint,
    credentials: ProviderCredentials,
    timeout: Duration,
}

impl HttpDeliveryExecutor {
    pub fn new(endpoint: ProviderEndpoint, credentials: ProviderCredentials, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            credentials,
            timeout,
        }
    }

    async fn round_trip(&self, request: &ProviderRequest, url: &str) -> DeliveryOutcome {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };
        let mut builder = builder
            .bearer_auth(self.credentials.token())
            .header("Content-Type", "application/json")
            .timeout(self.timeout);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return classify_transport_error(&e),
        };
        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => classify_response(&request.kind, status, &body),
            Err(e) => classify_transport_error(&e),
        }
    }
}

#[async_trait::async_trait]
impl DeliveryPort for HttpDeliveryExecutor {
    async fn execute(&self, request: &ProviderRequest) -> DeliveryOutcome {
        let url = self.endpoint.url_for(&request.path);
        debug!(method = %request.method, path = %request.path, "provider request");

        let started = Instant::now();
        // Outer bound covers connect, headers and body; reqwest's own timeout may fire first.
        let outcome = tokio::time::timeout(self.timeout, self.round_trip(request, &url))
            .await
            .unwrap_or_else(|_| DeliveryOutcome::timeout());
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            DeliveryOutcome::Success { ack } => {
                info!(path = %request.path, id = %ack.id(), elapsed_ms, "provider accepted request")
            }
            other => {
                warn!(path = %request.path, outcome = %other, elapsed_ms, "provider request failed")
            }
        }
        outcome
    }

    fn name(&self) -> &'static str {
        "whatsapp"
    }
}

fn classify_transport_error(e: &reqwest::Error) -> DeliveryOutcome {
    if e.is_timeout() {
        DeliveryOutcome::timeout()
    } else if e.is_builder() {
        // Malformed URL or headers: retrying the same request cannot help.
        DeliveryOutcome::rejected(format!("invalid request: {}", e))
    } else if e.is_connect() {
        DeliveryOutcome::transient(format!("connection failed: {}", e))
    } else {
        DeliveryOutcome::transient(format!("request failed: {}", e))
    }
}

/// Map an HTTP status and body to an outcome. 200 needs the body shape the
/// request kind expects; 4xx is final; 5xx is transient; anything else is rejected.
pub fn classify_response(kind: &RequestKind, status: u16, body: &str) -> DeliveryOutcome {
    match status {
        200 => match parse_ack(kind, body) {
            Some(ack) => DeliveryOutcome::success(ack),
            None => DeliveryOutcome::rejected("unexpected response body"),
        },
        400..=499 => {
            DeliveryOutcome::rejected(format!("HTTP {}: {}", status, provider_error_message(body)))
        }
        500..=599 => {
            DeliveryOutcome::transient(format!("HTTP {}: {}", status, provider_error_message(body)))
        }
        other => DeliveryOutcome::rejected(format!("unexpected HTTP status {}", other)),
    }
}

#[derive(Deserialize)]
struct GroupCreatedResponse {
    id: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    messages: Vec<MessageId>,
}

#[derive(Deserialize)]
struct MessageId {
    id: String,
}

#[derive(Deserialize)]
struct InviteLinkResponse {
    invite_link: String,
}

#[derive(Deserialize)]
struct UpdateGroupResponse {
    #[serde(default = "default_true")]
    success: bool,
}

fn default_true() -> bool {
    true
}

fn parse_ack(kind: &RequestKind, body: &str) -> Option<ProviderAck> {
    match kind {
        RequestKind::CreateGroup => serde_json::from_str::<GroupCreatedResponse>(body)
            .ok()
            .filter(|r| !r.id.is_empty())
            .map(|r| ProviderAck::GroupCreated { group_id: r.id }),
        RequestKind::SendText => serde_json::from_str::<MessagesResponse>(body)
            .ok()
            .and_then(|r| r.messages.into_iter().next())
            .filter(|m| !m.id.is_empty())
            .map(|m| ProviderAck::MessageAccepted { message_id: m.id }),
        RequestKind::AddParticipant { group_id } => {
            serde_json::from_str::<UpdateGroupResponse>(body)
                .ok()
                .filter(|r| r.success)
                .map(|_| ProviderAck::ParticipantAdded {
                    group_id: group_id.clone(),
                })
        }
        RequestKind::FetchInviteLink { .. } => serde_json::from_str::<InviteLinkResponse>(body)
            .ok()
            .filter(|r| !r.invite_link.is_empty())
            .map(|r| ProviderAck::InviteLink { url: r.invite_link }),
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Graph-style `{"error": {"message": ..}}` if present, else the truncated raw body.
fn provider_error_message(body: &str) -> String {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    if message.is_empty() {
        return "empty response".to_string();
    }
    message.chars().take(MAX_REASON_CHARS).collect()
}
