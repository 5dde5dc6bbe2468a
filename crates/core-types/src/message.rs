use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::CoreError;

/// Longest message body accepted, in characters.
pub const MAX_MESSAGE_LEN: usize = 140;

/// A persisted row of the `messages` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: i32,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i32,
}

/// A message waiting to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub user_id: i32,
    pub text: String,
}

impl NewMessage {
    /// Validates and trims the message body.
    pub fn new(user_id: i32, text: &str) -> Result<Self, CoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::invalid("text", "must not be empty"));
        }
        if text.chars().count() > MAX_MESSAGE_LEN {
            return Err(CoreError::invalid(
                "text",
                &format!("must be at most {MAX_MESSAGE_LEN} characters"),
            ));
        }
        Ok(Self { user_id, text: text.to_string() })
    }
}
