//! Boundary validation for incoming actions.
//!
//! Request bodies are accepted as loosely-typed JSON and checked here before
//! anything reaches the [`crate::store::ActionStore`].

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::{Action, ActionType, Messenger};

/// Raw, unvalidated action payload as received over HTTP.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionInput {
    #[serde(rename = "type", default)]
    pub kind: Value,
    #[serde(default)]
    pub messenger: Option<Value>,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("type must be one of ban,warn,note")]
    InvalidType,

    #[error("messenger must be either in whatsapp,matrix,telegram,discord or undefined")]
    InvalidMessenger,

    #[error("value must be either a string or undefined")]
    InvalidValue,

    #[error("'value' should be only available if the type is 'note'")]
    ValueMismatch,
}

impl ValidationError {
    /// Name of the request field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidType => "type",
            ValidationError::InvalidMessenger => "messenger",
            ValidationError::InvalidValue | ValidationError::ValueMismatch => "value",
        }
    }
}

/// Check a raw payload and turn it into an [`Action`].
///
/// An empty `value` string counts as absent.
pub fn validate_action(input: &ActionInput) -> Result<Action, ValidationError> {
    let kind = input
        .kind
        .as_str()
        .and_then(ActionType::parse)
        .ok_or(ValidationError::InvalidType)?;

    let messenger = match &input.messenger {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            Some(Messenger::parse(s).ok_or(ValidationError::InvalidMessenger)?)
        }
        Some(_) => return Err(ValidationError::InvalidMessenger),
    };

    let value = match &input.value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(ValidationError::InvalidValue),
    };

    if (kind == ActionType::Note) != value.is_some() {
        return Err(ValidationError::ValueMismatch);
    }

    Ok(Action {
        kind,
        messenger,
        value,
    })
}
