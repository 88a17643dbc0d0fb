//! models/gateway_model.rs
//! Payloads del gateway de WhatsApp (API estilo Evolution).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body de `POST /message/sendText/{instance}`
#[derive(Debug, Clone, Serialize)]
pub struct SendTextPayload<'a> {
    pub number: &'a str,
    pub text: &'a str,
}

/// Confirmación de envío. `message_id` sale de `key.id` cuando viene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_id: Option<String>,
}

/// Webhook del gateway. Solo nos interesan los acuses de entrega.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayWebhookEvent {
    pub event: String,
    pub instance: Option<String>,
    #[serde(default)]
    pub data: Value,
}

const DELIVERED_STATUSES: &[&str] = &["DELIVERY_ACK", "READ", "PLAYED"];

impl GatewayWebhookEvent {
    pub fn is_message_update(&self) -> bool {
        self.event.eq_ignore_ascii_case("messages.update")
            || self.event.eq_ignore_ascii_case("MESSAGES_UPDATE")
    }

    /// Id del mensaje en el gateway: `data.keyId` o `data.key.id`.
    pub fn message_id(&self) -> Option<&str> {
        self.data
            .get("keyId")
            .and_then(Value::as_str)
            .or_else(|| {
                self.data
                    .get("key")
                    .and_then(|k| k.get("id"))
                    .and_then(Value::as_str)
            })
    }

    pub fn is_delivery_ack(&self) -> bool {
        self.data
            .get("status")
            .and_then(Value::as_str)
            .map(|s| DELIVERED_STATUSES.iter().any(|d| d.eq_ignore_ascii_case(s)))
            .unwrap_or(false)
    }
}
