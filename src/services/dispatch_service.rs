//! services/dispatch_service.rs
//! Despachador con límite de ritmo: envía uno a uno los mensajes en cola de
//! una campaña, con pausa fija entre envíos.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;

use crate::config::app_config::DispatchConfig;
use crate::errors::CampaignError;
use crate::models::campaign_model::{CampaignStatus, DispatchSummary};
use crate::services::campaign_message_service::CampaignMessageService;
use crate::services::campaign_service::CampaignService;
use crate::services::gateway_service::MessageGateway;

#[derive(Clone)]
pub struct DispatchService {
    campaign_service: CampaignService,
    message_service: CampaignMessageService,
    gateway: Arc<dyn MessageGateway>,
    config: DispatchConfig,
    active: Arc<Mutex<HashSet<String>>>,
}

/// Marca de corrida activa; se libera al salir de `dispatch`.
struct ActiveRun {
    active: Arc<Mutex<HashSet<String>>>,
    campaign_id: String,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.campaign_id);
    }
}

impl DispatchService {
    pub fn new(
        campaign_service: CampaignService,
        message_service: CampaignMessageService,
        gateway: Arc<dyn MessageGateway>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            campaign_service,
            message_service,
            gateway,
            config,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn begin_run(&self, campaign_id: &str) -> Option<ActiveRun> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(campaign_id.to_string()) {
            return None;
        }
        Some(ActiveRun {
            active: self.active.clone(),
            campaign_id: campaign_id.to_string(),
        })
    }

    /// Corre el despacho completo de una campaña en `sending`.
    ///
    /// Un error del gateway en un mensaje se registra en esa fila y el ciclo
    /// sigue; no hay reintentos. Al terminar la campaña queda `completed`
    /// aunque hayan fallado todos. Solo los errores de base de datos cortan
    /// la corrida (y se devuelven al llamador).
    ///
    /// Una sola corrida por campaña a la vez: si ya hay otra activa, esta
    /// vuelve enseguida con un resumen vacío.
    pub async fn dispatch(&self, campaign_id: &str, instance_name: &str) -> Result<DispatchSummary> {
        let Some(_run) = self.begin_run(campaign_id) else {
            log::warn!(
                "(dispatch) Campaña {} ya tiene una corrida activa, se omite",
                campaign_id
            );
            return Ok(DispatchSummary::default());
        };

        let campaign = self.campaign_service.get_campaign(campaign_id).await?;
        if campaign.status != CampaignStatus::Sending {
            return Err(CampaignError::InvalidTransition {
                id: campaign_id.to_string(),
                from: campaign.status,
                to: CampaignStatus::Completed,
            }
            .into());
        }

        // Filas que una corrida anterior dejó a medias: no se reintentan
        let interrupted = self
            .message_service
            .fail_interrupted(campaign_id, "Envío interrumpido antes de confirmar")
            .await?;
        if interrupted > 0 {
            log::warn!(
                "(dispatch) Campaña {}: {} mensajes en sending pasan a failed",
                campaign_id,
                interrupted
            );
        }

        let counts = self.message_service.count_by_status(campaign_id).await?;

        let queued = self.message_service.list_queued(campaign_id).await?;
        let total = queued.len();
        log::info!(
            "(dispatch) Campaña {}: {} de {} mensajes en cola, instancia='{}', delay={}ms",
            campaign_id,
            total,
            counts.total(),
            instance_name,
            self.config.send_delay_ms
        );

        let mut summary = DispatchSummary::default();
        let mut processed = 0usize;

        for (idx, msg) in queued.iter().enumerate() {
            if !self.message_service.claim(&msg.id).await? {
                log::warn!(
                    "(dispatch) Mensaje {} ya no está en cola, se omite",
                    msg.id
                );
                continue;
            }
            summary.attempted += 1;

            match self
                .gateway
                .send_text(instance_name, &msg.phone, &msg.message_content)
                .await
            {
                Ok(receipt) => {
                    self.message_service
                        .mark_sent(&msg.id, receipt.message_id.as_deref())
                        .await?;
                    summary.sent += 1;
                    log::debug!("(dispatch) Mensaje {} enviado a {}", msg.id, msg.phone);
                }
                Err(e) => {
                    let error_text = format!("{:#}", e);
                    log::error!(
                        "(dispatch) Fallo al enviar mensaje {} a {}: {}",
                        msg.id,
                        msg.phone,
                        error_text
                    );
                    self.message_service.mark_failed(&msg.id, &error_text).await?;
                    summary.failed += 1;
                }
            }

            processed += 1;
            if processed % self.config.flush_every == 0 {
                self.campaign_service.update_counters(campaign_id).await?;
                log::info!(
                    "(dispatch) Campaña {}: {}/{} procesados",
                    campaign_id,
                    processed,
                    total
                );
            }

            if idx + 1 < total && self.config.send_delay_ms > 0 {
                tokio::time::sleep(self.config.send_delay()).await;
            }
        }

        self.campaign_service.complete_campaign(campaign_id).await?;

        log::info!(
            "(dispatch) Campaña {} completada: intentados={}, sent={}, failed={}",
            campaign_id,
            summary.attempted,
            summary.sent,
            summary.failed
        );
        Ok(summary)
    }

    /// Lanza `dispatch` en segundo plano sin canal de retorno. Si la corrida
    /// aborta, la campaña queda `failed` con el error.
    pub fn spawn_dispatch(&self, campaign_id: String, instance_name: String) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.dispatch(&campaign_id, &instance_name).await {
                log::error!(
                    "(spawn_dispatch) Corrida abortada para campaña {}: {:?}",
                    campaign_id,
                    e
                );
                if let Err(fail_err) = service
                    .campaign_service
                    .fail_campaign(&campaign_id, &format!("{:#}", e))
                    .await
                {
                    log::error!(
                        "(spawn_dispatch) No se pudo marcar la campaña {} como failed: {:?}",
                        campaign_id,
                        fail_err
                    );
                }
            }
        });
    }
}
