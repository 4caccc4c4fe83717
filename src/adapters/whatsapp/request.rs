//! WhatsApp Business request construction.
//!
//! Turns domain values into `ProviderRequest`s (path + JSON body). Pure: no
//! I/O, fails only on local preconditions.

use crate::domain::{HttpMethod, NormalizedPhoneNumber, ProviderRequest, RequestError, RequestKind};
use serde::Serialize;

const MESSAGING_PRODUCT: &str = "whatsapp";

/// POST /message_groups
#[derive(Serialize)]
struct CreateGroupBody<'a> {
    messaging_product: &'static str,
    operation: &'static str,
    name: &'a str,
    participants: Vec<&'a str>,
}

/// POST /message_groups/{id}
#[derive(Serialize)]
struct UpdateGroupBody<'a> {
    messaging_product: &'static str,
    operation: &'static str,
    group_id: &'a str,
    add_participant: Vec<&'a str>,
}

/// POST /{phone_number_id}/messages
#[derive(Serialize)]
struct SendTextBody<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    message_type: &'static str,
    text: TextContent<'a>,
}

#[derive(Serialize)]
struct TextContent<'a> {
    preview_url: bool,
    body: &'a str,
}

/// Builds provider requests for one sender phone-number id.
#[derive(Debug, Clone)]
pub struct ProviderRequestBuilder {
    phone_number_id: String,
    link_preview: bool,
}

impl ProviderRequestBuilder {
    /// Link previews are on by default.
    pub fn new(phone_number_id: impl Into<String>) -> Self {
        Self {
            phone_number_id: phone_number_id.into(),
            link_preview: true,
        }
    }

    pub fn with_link_preview(mut self, enabled: bool) -> Self {
        self.link_preview = enabled;
        self
    }

    /// Create a group. Participants are checked before anything is built.
    pub fn create_group(
        &self,
        name: &str,
        participants: &[NormalizedPhoneNumber],
    ) -> Result<ProviderRequest, RequestError> {
        if participants.is_empty() {
            return Err(RequestError::EmptyParticipantList);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(RequestError::EmptyGroupName);
        }
        let body = CreateGroupBody {
            messaging_product: MESSAGING_PRODUCT,
            operation: "create",
            name,
            participants: participants.iter().map(NormalizedPhoneNumber::as_str).collect(),
        };
        Ok(ProviderRequest {
            kind: RequestKind::CreateGroup,
            method: HttpMethod::Post,
            path: "/message_groups".to_string(),
            body: Some(to_json(&body)),
        })
    }

    /// Personal text message.
    pub fn send_text(
        &self,
        to: &NormalizedPhoneNumber,
        body: &str,
    ) -> Result<ProviderRequest, RequestError> {
        if body.trim().is_empty() {
            return Err(RequestError::EmptyMessageBody);
        }
        let payload = SendTextBody {
            messaging_product: MESSAGING_PRODUCT,
            to: to.as_str(),
            message_type: "text",
            text: TextContent {
                preview_url: self.link_preview,
                body,
            },
        };
        Ok(ProviderRequest {
            kind: RequestKind::SendText,
            method: HttpMethod::Post,
            path: format!("/{}/messages", self.phone_number_id),
            body: Some(to_json(&payload)),
        })
    }

    pub fn add_participant(
        &self,
        group_id: &str,
        participant: &NormalizedPhoneNumber,
    ) -> ProviderRequest {
        let body = UpdateGroupBody {
            messaging_product: MESSAGING_PRODUCT,
            operation: "update",
            group_id,
            add_participant: vec![participant.as_str()],
        };
        ProviderRequest {
            kind: RequestKind::AddParticipant {
                group_id: group_id.to_string(),
            },
            method: HttpMethod::Post,
            path: format!("/message_groups/{}", group_id),
            body: Some(to_json(&body)),
        }
    }

    /// Read request; carries no body.
    pub fn fetch_invite_link(&self, group_id: &str) -> ProviderRequest {
        ProviderRequest {
            kind: RequestKind::FetchInviteLink {
                group_id: group_id.to_string(),
            },
            method: HttpMethod::Get,
            path: format!("/message_groups/{}/invite_link", group_id),
            body: None,
        }
    }
}

/// The wire structs hold only strings, bools and vectors; serialization cannot fail.
fn to_json<T: Serialize>(body: &T) -> serde_json::Value {
    serde_json::to_value(body).unwrap_or(serde_json::Value::Null)
}
