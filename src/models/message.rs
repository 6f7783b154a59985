use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved receiver id for the company-wide thread visible to all users.
pub const BROADCAST_CHANNEL: &str = "GLOBAL";

/// A direct or broadcast chat message. `read_by` always contains the sender
/// at creation and only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read_by: Vec<String>,
}

impl Message {
    pub fn is_broadcast(&self) -> bool {
        self.receiver_id == BROADCAST_CHANNEL
    }
}
