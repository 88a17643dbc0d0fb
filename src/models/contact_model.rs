use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;

/// Campos libres del contacto; se usan como variables de plantilla.
pub type CustomFields = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContactRecord {
    pub id: String,
    pub tenant_id: String,
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub custom_fields: Json<CustomFields>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateContactRequest {
    pub tenant_id: String,
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub custom_fields: CustomFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BroadcastListRecord {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBroadcastListRequest {
    pub tenant_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddListContactsRequest {
    pub contact_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListContactsResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<ContactRecord>,
}
