//! Group creation + notify flow as an explicit state machine.
//!
//! `transition` is pure; the notification service drives it by performing the
//! work of the current state and feeding the result back in as an event.
//!
//! ```text
//! Start ──eligible>0──▶ CreatingGroup ──created──▶ FetchingInviteLink ──(any)──▶ NotifyingMembers ──▶ Done
//!   │                        │
//!   └─eligible=0─▶ Failed ◀──┘ create failed
//! ```

use serde::Serialize;
use std::fmt;

/// Reason used when nobody in the roster has a usable number.
pub const NO_ELIGIBLE_PARTICIPANTS: &str = "no eligible participants";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlowState {
    Start,
    CreatingGroup,
    FetchingInviteLink,
    NotifyingMembers,
    Done,
    Failed { reason: String },
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Done | FlowState::Failed { .. })
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Start => f.write_str("start"),
            FlowState::CreatingGroup => f.write_str("creating_group"),
            FlowState::FetchingInviteLink => f.write_str("fetching_invite_link"),
            FlowState::NotifyingMembers => f.write_str("notifying_members"),
            FlowState::Done => f.write_str("done"),
            FlowState::Failed { reason } => write!(f, "failed ({})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    /// Roster normalized; `eligible` members have a usable number.
    ParticipantsNormalized { eligible: usize },
    GroupCreated,
    GroupCreateFailed { reason: String },
    InviteLinkFetched,
    /// Link fetch rejected or failed transiently. Never aborts the flow.
    InviteLinkUnavailable,
    MembersNotified,
}

/// Next state for `event` in `state`. Events that do not belong to the current
/// state fail the flow instead of being ignored.
pub fn transition(state: FlowState, event: FlowEvent) -> FlowState {
    match (state, event) {
        (FlowState::Start, FlowEvent::ParticipantsNormalized { eligible: 0 }) => FlowState::Failed {
            reason: NO_ELIGIBLE_PARTICIPANTS.to_string(),
        },
        (FlowState::Start, FlowEvent::ParticipantsNormalized { .. }) => FlowState::CreatingGroup,
        (FlowState::CreatingGroup, FlowEvent::GroupCreated) => FlowState::FetchingInviteLink,
        (FlowState::CreatingGroup, FlowEvent::GroupCreateFailed { reason }) => {
            FlowState::Failed { reason }
        }
        (
            FlowState::FetchingInviteLink,
            FlowEvent::InviteLinkFetched | FlowEvent::InviteLinkUnavailable,
        ) => FlowState::NotifyingMembers,
        (FlowState::NotifyingMembers, FlowEvent::MembersNotified) => FlowState::Done,
        (state, event) => FlowState::Failed {
            reason: format!("unexpected {:?} in state {}", event, state),
        },
    }
}
