use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// queued -> sending -> {sent | failed}; los terminales no se reescriben.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Queued,
    Sending,
    Sent,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Queued => "queued",
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Failed => "failed",
        }
    }
}

impl FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(MessageStatus::Queued),
            "sending" => Ok(MessageStatus::Sending),
            "sent" => Ok(MessageStatus::Sent),
            "failed" => Ok(MessageStatus::Failed),
            other => Err(format!("Estado de mensaje desconocido: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CampaignMessageRecord {
    pub id: String,
    pub campaign_id: String,
    pub contact_id: String,
    pub phone: String,
    pub message_content: String,
    pub position: i64,
    pub status: MessageStatus,
    pub error_message: Option<String>,
    pub gateway_message_id: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fila a encolar al arrancar la campaña (ya renderizada)
#[derive(Debug, Clone)]
pub struct NewCampaignMessage {
    pub contact_id: String,
    pub phone: String,
    pub message_content: String,
}

/// Conteo de filas por estado para una campaña
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MessageCounts {
    pub queued: i64,
    pub sending: i64,
    pub sent: i64,
    pub failed: i64,
    pub delivered: i64,
}

impl MessageCounts {
    pub fn total(&self) -> i64 {
        self.queued + self.sending + self.sent + self.failed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListMessagesResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<CampaignMessageRecord>,
}
