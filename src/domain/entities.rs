//! Domain entities. Pure data structures for the dispatch core.
//!
//! No HTTP/provider types here; adapters map wire responses into these.

use super::phone::NormalizedPhoneNumber;
use serde::Serialize;
use std::fmt;

/// Reason attached to a transient failure caused by the per-call timeout.
pub const TIMEOUT_REASON: &str = "timeout";
/// Reason attached to sends abandoned through the batch cancellation token.
pub const CANCELLED_REASON: &str = "cancelled";

/// A person to notify, as handed over by the web layer. Never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub user_id: String,
    pub display_name: String,
    /// Free text as typed by the user; may be missing or garbage.
    pub raw_phone_number: Option<String>,
}

impl Recipient {
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        raw_phone_number: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            raw_phone_number,
        }
    }
}

/// A provider-side group. Owned by the caller once returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupHandle {
    pub provider_group_id: String,
    /// Absent when the follow-up invite-link fetch failed; the group is still usable.
    pub invite_link: Option<String>,
}

/// What the provider acknowledged on HTTP 200, by request kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderAck {
    GroupCreated { group_id: String },
    MessageAccepted { message_id: String },
    ParticipantAdded { group_id: String },
    InviteLink { url: String },
}

impl ProviderAck {
    /// The provider identifier carried by the acknowledgement.
    pub fn id(&self) -> &str {
        match self {
            ProviderAck::GroupCreated { group_id } => group_id,
            ProviderAck::MessageAccepted { message_id } => message_id,
            ProviderAck::ParticipantAdded { group_id } => group_id,
            ProviderAck::InviteLink { url } => url,
        }
    }
}

/// Result of exactly one delivery attempt. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Success { ack: ProviderAck },
    /// Provider said no (payload, auth, policy). Not worth retrying.
    Rejected { reason: String },
    /// Network, timeout, 5xx or cancellation. Safe to retry later.
    TransientFailure { reason: String },
    /// No usable phone number; nothing was sent.
    SkippedNoPhone,
}

impl DeliveryOutcome {
    pub fn success(ack: ProviderAck) -> Self {
        DeliveryOutcome::Success { ack }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        DeliveryOutcome::Rejected {
            reason: reason.into(),
        }
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        DeliveryOutcome::TransientFailure {
            reason: reason.into(),
        }
    }

    pub fn timeout() -> Self {
        Self::transient(TIMEOUT_REASON)
    }

    pub fn cancelled() -> Self {
        Self::transient(CANCELLED_REASON)
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            DeliveryOutcome::Success { .. } => OutcomeKind::Success,
            DeliveryOutcome::Rejected { .. } => OutcomeKind::Rejected,
            DeliveryOutcome::TransientFailure { .. } => OutcomeKind::TransientFailure,
            DeliveryOutcome::SkippedNoPhone => OutcomeKind::SkippedNoPhone,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Success { .. })
    }

    pub fn ack(&self) -> Option<&ProviderAck> {
        match self {
            DeliveryOutcome::Success { ack } => Some(ack),
            _ => None,
        }
    }

    /// Transient and not caused by cancellation: a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryOutcome::TransientFailure { reason } if reason != CANCELLED_REASON)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            DeliveryOutcome::Rejected { reason } | DeliveryOutcome::TransientFailure { reason } => {
                Some(reason)
            }
            _ => None,
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Success { ack } => write!(f, "success ({})", ack.id()),
            DeliveryOutcome::Rejected { reason } => write!(f, "rejected: {}", reason),
            DeliveryOutcome::TransientFailure { reason } => {
                write!(f, "transient failure: {}", reason)
            }
            DeliveryOutcome::SkippedNoPhone => f.write_str("skipped (no phone)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Rejected,
    TransientFailure,
    SkippedNoPhone,
}

/// Final outcome for one recipient in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientOutcome {
    pub user_id: String,
    pub display_name: String,
    pub phone: Option<NormalizedPhoneNumber>,
    pub outcome: DeliveryOutcome,
    /// Provider calls made for this recipient (0 when skipped or short-circuited).
    pub attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_not_retryable() {
        assert!(DeliveryOutcome::timeout().is_retryable());
        assert!(DeliveryOutcome::transient("HTTP 503").is_retryable());
        assert!(!DeliveryOutcome::cancelled().is_retryable());
        assert!(!DeliveryOutcome::rejected("HTTP 400").is_retryable());
        assert!(!DeliveryOutcome::SkippedNoPhone.is_retryable());
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let outcome = DeliveryOutcome::success(ProviderAck::MessageAccepted {
            message_id: "wamid.1".to_string(),
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "success");
        assert_eq!(json["ack"]["type"], "message_accepted");
        assert_eq!(json["ack"]["message_id"], "wamid.1");
    }
}
