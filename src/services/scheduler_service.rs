//! services/scheduler_service.rs
//! Arranca las campañas programadas cuando vence su `scheduled_at`.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;

use crate::services::campaign_service::CampaignService;
use crate::services::dispatch_service::DispatchService;

#[derive(Clone)]
pub struct SchedulerService {
    campaign_service: CampaignService,
    dispatch_service: DispatchService,
}

impl SchedulerService {
    pub fn new(campaign_service: CampaignService, dispatch_service: DispatchService) -> Self {
        Self {
            campaign_service,
            dispatch_service,
        }
    }

    /// Una pasada: arranca cada campaña vencida y dispara su despacho.
    /// Devuelve los ids arrancados. El fallo de una no detiene las demás.
    pub async fn run_due(&self) -> Result<Vec<String>> {
        let due = self.campaign_service.due_scheduled(Utc::now()).await?;
        let mut started = Vec::new();

        for campaign in due {
            let Some(instance_name) = campaign.instance_name.clone() else {
                log::error!(
                    "(run_due) Campaña {} programada sin instancia, se omite",
                    campaign.id
                );
                continue;
            };

            match self
                .campaign_service
                .start_campaign(&campaign.id, &instance_name)
                .await
            {
                Ok(resp) => {
                    log::info!(
                        "(run_due) Campaña programada {} arrancada con {} contactos",
                        campaign.id,
                        resp.total_contacts
                    );
                    self.dispatch_service
                        .spawn_dispatch(campaign.id.clone(), instance_name);
                    started.push(campaign.id);
                }
                Err(e) => {
                    log::error!(
                        "(run_due) No se pudo arrancar la campaña {}: {:#}",
                        campaign.id,
                        e
                    );
                }
            }
        }

        Ok(started)
    }

    /// Loop de fondo; se lanza una vez desde `main`.
    pub fn spawn_loop(self, interval: Duration) {
        tokio::spawn(async move {
            loop {
                if let Err(e) = self.run_due().await {
                    log::error!("(scheduler) Error en pasada del scheduler: {:?}", e);
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
}
