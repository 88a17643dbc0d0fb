//! services/gateway_service.rs
//! Cliente HTTP del gateway de WhatsApp (API estilo Evolution).

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::models::gateway_model::{SendReceipt, SendTextPayload};

/// Lo que el resto del servicio necesita del gateway. Los tests lo
/// reemplazan por un fake en memoria.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Envía texto por la instancia indicada. `Err` lleva el texto de error
    /// del gateway (o del transporte) tal cual se guarda en el mensaje.
    async fn send_text(&self, instance: &str, number: &str, text: &str) -> Result<SendReceipt>;

    /// `true` si la instancia está conectada y puede enviar.
    async fn is_connected(&self, instance: &str) -> Result<bool>;
}

#[derive(Clone, Debug)]
pub struct EvolutionGateway {
    base_url: String,
    api_key: String,
    http_client: Client,
}

impl EvolutionGateway {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("No se pudo construir el cliente HTTP del gateway")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl MessageGateway for EvolutionGateway {
    async fn send_text(&self, instance: &str, number: &str, text: &str) -> Result<SendReceipt> {
        let send_url = format!("{}/message/sendText/{}", self.base_url, instance);
        log::debug!("(send_text) POST {} -> number={}", send_url, number);

        let resp = self
            .http_client
            .post(&send_url)
            .header("apikey", &self.api_key)
            .json(&SendTextPayload { number, text })
            .send()
            .await
            .context("Fallo de red al llamar sendText")?;

        let status = resp.status();
        let body_txt = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            log::warn!(
                "(send_text) Gateway respondió {} para number={}: {}",
                status,
                number,
                body_txt
            );
            return Err(anyhow!("Gateway HTTP {}: {}", status.as_u16(), body_txt));
        }

        let json_val: Value = serde_json::from_str(&body_txt)
            .with_context(|| format!("Respuesta del gateway no es JSON: {}", body_txt))?;

        let key = json_val
            .get("key")
            .filter(|k| k.is_object())
            .ok_or_else(|| anyhow!("Respuesta del gateway sin 'key': {}", body_txt))?;

        Ok(SendReceipt {
            message_id: key.get("id").and_then(Value::as_str).map(str::to_string),
        })
    }

    async fn is_connected(&self, instance: &str) -> Result<bool> {
        let status_url = format!("{}/instance/connectionState/{}", self.base_url, instance);
        log::info!("(is_connected) Consultando estado en URL={}", status_url);

        let resp = self
            .http_client
            .get(&status_url)
            .header("apikey", &self.api_key)
            .send()
            .await
            .context("Fallo al hacer GET connectionState")?;

        if !resp.status().is_success() {
            let code = resp.status();
            let body_txt = resp.text().await.unwrap_or_default();
            log::error!(
                "(is_connected) La respuesta NO es exitosa ({}). body_txt='{}'",
                code,
                body_txt
            );
            // Una instancia inexistente no está conectada
            if code == reqwest::StatusCode::NOT_FOUND {
                return Ok(false);
            }
            return Err(anyhow!("Error consultando instancia: {}", body_txt));
        }

        let json_val = resp.json::<Value>().await?;
        let connected = json_val
            .get("instance")
            .and_then(|i| i.get("state"))
            .and_then(Value::as_str)
            .map(|s| s == "open")
            .unwrap_or(false);

        log::info!("(is_connected) instance={} connected={}", instance, connected);
        Ok(connected)
    }
}
