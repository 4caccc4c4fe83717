//! Per-recipient message text. Placeholders: `{name}`, `{group_name}`, `{invite_link}`.

use super::entities::{GroupHandle, Recipient};

const NAME: &str = "{name}";
const GROUP_NAME: &str = "{group_name}";
const INVITE_LINK: &str = "{invite_link}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    text: String,
}

impl MessageTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Render for one recipient. A missing invite link renders as an empty string.
    /// Substitution is a single pass: values are never expanded again.
    pub fn render(&self, recipient: &Recipient, group: Option<(&str, &GroupHandle)>) -> String {
        let (group_name, invite_link) = match group {
            Some((name, handle)) => (name, handle.invite_link.as_deref().unwrap_or("")),
            None => ("", ""),
        };
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let (value, len) = if tail.starts_with(NAME) {
                (recipient.display_name.as_str(), NAME.len())
            } else if tail.starts_with(GROUP_NAME) {
                (group_name, GROUP_NAME.len())
            } else if tail.starts_with(INVITE_LINK) {
                (invite_link, INVITE_LINK.len())
            } else {
                ("{", 1)
            };
            out.push_str(value);
            rest = &tail[len..];
        }
        out.push_str(rest);
        out
    }
}

impl From<&str> for MessageTemplate {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for MessageTemplate {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
