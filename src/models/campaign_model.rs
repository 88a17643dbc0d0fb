use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ciclo de vida de una campaña. Solo avanza:
/// draft -> scheduled -> sending -> {completed | failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sending,
    Completed,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Failed => "failed",
        }
    }

    /// Estados desde los que se puede llegar a `next`.
    pub fn allowed_sources(next: CampaignStatus) -> &'static [CampaignStatus] {
        match next {
            CampaignStatus::Draft => &[],
            CampaignStatus::Scheduled => &[CampaignStatus::Draft],
            CampaignStatus::Sending => &[CampaignStatus::Draft, CampaignStatus::Scheduled],
            CampaignStatus::Completed | CampaignStatus::Failed => &[CampaignStatus::Sending],
        }
    }

    pub fn can_transition_to(&self, next: CampaignStatus) -> bool {
        Self::allowed_sources(next).contains(self)
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(CampaignStatus::Draft),
            "scheduled" => Ok(CampaignStatus::Scheduled),
            "sending" => Ok(CampaignStatus::Sending),
            "completed" => Ok(CampaignStatus::Completed),
            "failed" => Ok(CampaignStatus::Failed),
            other => Err(format!("Estado de campaña desconocido: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CampaignRecord {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub message_template: String,
    pub broadcast_list_id: Option<String>,
    pub instance_name: Option<String>,
    pub status: CampaignStatus,
    pub total_contacts: i64,
    pub sent: i64,
    pub delivered: i64,
    pub failed: i64,
    pub error_message: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request para crear una campaña (queda en "draft")
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaignRequest {
    pub tenant_id: String,
    pub name: String,
    pub message_template: String,
    /// Sin lista => todos los contactos del tenant
    pub broadcast_list_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleCampaignRequest {
    pub scheduled_at: DateTime<Utc>,
    pub instance_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCampaignRequest {
    pub instance_name: String,
}

/// Disparo interno del despachador: `{campaignId, instanceName}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchTriggerRequest {
    pub campaign_id: String,
    pub instance_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartCampaignResponse {
    pub success: bool,
    pub campaign_id: String,
    pub total_contacts: i64,
    pub message: String,
}

/// Resultado de una corrida del despachador
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub attempted: i64,
    pub sent: i64,
    pub failed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListCampaignsResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<CampaignRecord>,
}
