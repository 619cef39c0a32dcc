use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of moderation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Ban,
    Warn,
    Note,
}

impl ActionType {
    pub const ALL: [ActionType; 3] = [ActionType::Ban, ActionType::Warn, ActionType::Note];

    /// Wire identifier (`ban`, `warn`, `note`).
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Ban => "ban",
            ActionType::Warn => "warn",
            ActionType::Note => "note",
        }
    }

    /// Human-readable label used in rendered reports.
    pub fn label(self) -> &'static str {
        match self {
            ActionType::Ban => "Banns",
            ActionType::Warn => "Verwarnungen",
            ActionType::Note => "Ereignisse",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Messaging platform an action was taken on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Messenger {
    Whatsapp,
    Matrix,
    Telegram,
    Discord,
}

impl Messenger {
    pub const ALL: [Messenger; 4] = [
        Messenger::Whatsapp,
        Messenger::Matrix,
        Messenger::Telegram,
        Messenger::Discord,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Messenger::Whatsapp => "whatsapp",
            Messenger::Matrix => "matrix",
            Messenger::Telegram => "telegram",
            Messenger::Discord => "discord",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Messenger::Whatsapp => "WhatsApp",
            Messenger::Matrix => "Matrix",
            Messenger::Telegram => "Telegram",
            Messenger::Discord => "Discord",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }
}

impl fmt::Display for Messenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded moderation event.
///
/// `value` is expected to be present exactly when `kind` is [`ActionType::Note`];
/// see [`crate::validate::validate_action`]. The store itself does not check it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionType,
    /// `None` means the action is global rather than tied to one platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messenger: Option<Messenger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Action {
    pub fn ban(messenger: Option<Messenger>) -> Self {
        Self {
            kind: ActionType::Ban,
            messenger,
            value: None,
        }
    }

    pub fn warn(messenger: Option<Messenger>) -> Self {
        Self {
            kind: ActionType::Warn,
            messenger,
            value: None,
        }
    }

    pub fn note(messenger: Option<Messenger>, value: impl Into<String>) -> Self {
        Self {
            kind: ActionType::Note,
            messenger,
            value: Some(value.into()),
        }
    }
}
