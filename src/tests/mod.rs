//! tests/mod.rs
//! Utilidades compartidas por las pruebas: DB en memoria y gateway falso.

mod campaign_tests;
mod gateway_tests;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

use crate::config::app_config::DispatchConfig;
use crate::models::contact_model::{ContactRecord, CreateContactRequest};
use crate::models::gateway_model::SendReceipt;
use crate::services::campaign_message_service::CampaignMessageService;
use crate::services::campaign_service::CampaignService;
use crate::services::contact_service::ContactService;
use crate::services::dispatch_service::DispatchService;
use crate::services::gateway_service::MessageGateway;

pub const TENANT: &str = "tenant-a";
pub const INSTANCE: &str = "loja-principal";

/// Pool SQLite en memoria con una sola conexión (cada conexión en memoria
/// es una base distinta).
pub async fn test_pool() -> Pool<Sqlite> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");
    crate::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Gateway en memoria: registra cada envío y falla para los números
/// configurados (o para todos).
pub struct FakeGateway {
    connected: bool,
    fail_all: bool,
    fail_numbers: HashSet<String>,
    pub sent: Mutex<Vec<(String, String, String)>>,
    watched: Mutex<Option<(Pool<Sqlite>, String)>>,
    seen_counters: Mutex<Vec<i64>>,
}

impl FakeGateway {
    pub fn healthy() -> Self {
        Self {
            connected: true,
            fail_all: false,
            fail_numbers: HashSet::new(),
            sent: Mutex::new(Vec::new()),
            watched: Mutex::new(None),
            seen_counters: Mutex::new(Vec::new()),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::healthy()
        }
    }

    pub fn failing_all() -> Self {
        Self {
            fail_all: true,
            ..Self::healthy()
        }
    }

    pub fn failing_for(numbers: &[&str]) -> Self {
        Self {
            fail_numbers: numbers.iter().map(|n| n.to_string()).collect(),
            ..Self::healthy()
        }
    }

    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Antes de cada envío lee `campaigns.sent` de esa campaña.
    pub fn watch_campaign(&self, pool: Pool<Sqlite>, campaign_id: &str) {
        *self.watched.lock().unwrap() = Some((pool, campaign_id.to_string()));
    }

    /// Valores de `campaigns.sent` vistos antes de cada envío.
    pub fn seen_counters(&self) -> Vec<i64> {
        self.seen_counters.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageGateway for FakeGateway {
    async fn send_text(&self, instance: &str, number: &str, text: &str) -> Result<SendReceipt> {
        let watched = self.watched.lock().unwrap().clone();
        if let Some((pool, campaign_id)) = watched {
            let sent: i64 = sqlx::query_scalar("SELECT sent FROM campaigns WHERE id = ?1")
                .bind(&campaign_id)
                .fetch_one(&pool)
                .await?;
            self.seen_counters.lock().unwrap().push(sent);
        }
        let call_no = {
            let mut sent = self.sent.lock().unwrap();
            sent.push((instance.to_string(), number.to_string(), text.to_string()));
            sent.len()
        };
        if self.fail_all || self.fail_numbers.contains(number) {
            return Err(anyhow!("Gateway HTTP 400: number {} does not exist", number));
        }
        Ok(SendReceipt {
            message_id: Some(format!("WAMID-{}", call_no)),
        })
    }

    async fn is_connected(&self, _instance: &str) -> Result<bool> {
        Ok(self.connected)
    }
}

/// Servicios armados sobre la misma base y el mismo gateway.
pub struct TestServices {
    pub pool: Pool<Sqlite>,
    pub gateway: Arc<FakeGateway>,
    pub contacts: ContactService,
    pub messages: CampaignMessageService,
    pub campaigns: CampaignService,
    pub dispatcher: DispatchService,
}

pub async fn test_services(gateway: FakeGateway) -> TestServices {
    test_services_with(gateway, no_delay()).await
}

pub async fn test_services_with(gateway: FakeGateway, config: DispatchConfig) -> TestServices {
    let pool = test_pool().await;
    let gateway = Arc::new(gateway);
    let dyn_gateway: Arc<dyn MessageGateway> = gateway.clone();

    let contacts = ContactService::new(pool.clone());
    let messages = CampaignMessageService::new(pool.clone());
    let campaigns = CampaignService::new(pool.clone(), contacts.clone(), dyn_gateway.clone());
    let dispatcher = DispatchService::new(
        campaigns.clone(),
        messages.clone(),
        dyn_gateway,
        config,
    );

    TestServices {
        pool,
        gateway,
        contacts,
        messages,
        campaigns,
        dispatcher,
    }
}

pub fn no_delay() -> DispatchConfig {
    DispatchConfig {
        send_delay_ms: 0,
        flush_every: 10,
    }
}

pub fn contact_request(phone: &str, name: &str) -> CreateContactRequest {
    CreateContactRequest {
        tenant_id: TENANT.to_string(),
        phone: phone.to_string(),
        name: Some(name.to_string()),
        email: None,
        custom_fields: Map::new(),
    }
}

/// Crea `n` contactos del tenant de prueba: 5511900000001, 5511900000002...
pub async fn seed_contacts(contacts: &ContactService, n: usize) -> Vec<ContactRecord> {
    let mut out = Vec::with_capacity(n);
    for i in 1..=n {
        let phone = format!("55119{:08}", i);
        let contact = contacts
            .create_contact(contact_request(&phone, &format!("Cliente {}", i)))
            .await
            .expect("seed contact");
        out.push(contact);
    }
    out
}

pub fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
