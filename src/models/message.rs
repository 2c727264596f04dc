use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, EnumString};

/// Lifecycle of an outbound message: queued -> sending -> sent | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageStatus {
    Queued,
    Sending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryMethod {
    #[default]
    Sms,
    Email,
}

/// A row of `sms_messages`. Despite the table name it carries email too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// None for email-only messages
    pub phone: Option<String>,
    pub email: Option<String>,
    pub message: String,
    pub method: String,
    pub license_id: Option<String>,
    pub status: String,
    pub attempts: i32,
    pub last_attempt_at: Option<i64>,
    pub sent_at: Option<i64>,
    /// Provider response or error detail
    pub response_json: Option<Value>,
    pub created_at: i64,
}

impl Message {
    pub fn has_status(&self, status: MessageStatus) -> bool {
        let expected: &str = status.as_ref();
        self.status == expected
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueMessage {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub message: String,
    #[serde(default)]
    pub method: DeliveryMethod,
    #[serde(default)]
    pub license_id: Option<String>,
}
