//! Provider request as pure data. Built by the WhatsApp request builder,
//! consumed by a `DeliveryPort`.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// Which provider action a request performs; decides the expected success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RequestKind {
    CreateGroup,
    SendText,
    AddParticipant { group_id: String },
    FetchInviteLink { group_id: String },
}

/// One provider call: method, path relative to the base URL, optional JSON body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRequest {
    pub kind: RequestKind,
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<serde_json::Value>,
}
