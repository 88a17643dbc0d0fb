//! services/campaign_service.rs
//! Registro agregado de la campaña: creación, transiciones de estado,
//! arranque (resolución + render + encolado) y contadores.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::errors::CampaignError;
use crate::models::campaign_message_model::NewCampaignMessage;
use crate::models::campaign_model::{
    CampaignRecord, CampaignStatus, CreateCampaignRequest, ListCampaignsResponse,
    ScheduleCampaignRequest, StartCampaignResponse,
};
use crate::services::campaign_message_service::CampaignMessageService;
use crate::services::contact_service::ContactService;
use crate::services::{db_timestamp, page_offset};
use crate::services::gateway_service::MessageGateway;
use crate::services::template_service;

const CAMPAIGN_COLUMNS: &str = r#"
    id, tenant_id, name, message_template, broadcast_list_id, instance_name, status,
    total_contacts, sent, delivered, failed, error_message,
    scheduled_at, started_at, completed_at, created_at, updated_at
"#;

/// `sent`/`failed`/`delivered` recalculados desde `campaign_messages` (`?1` = campaña).
const COUNTERS_FROM_ROWS: &str = r#"
    sent = (SELECT COUNT(*) FROM campaign_messages WHERE campaign_id = ?1 AND status = 'sent'),
    failed = (SELECT COUNT(*) FROM campaign_messages WHERE campaign_id = ?1 AND status = 'failed'),
    delivered = (
        SELECT COUNT(*) FROM campaign_messages
        WHERE campaign_id = ?1 AND delivered_at IS NOT NULL
    )
"#;

/// `'draft','scheduled'` para usar en un `status IN (...)`.
fn sources_sql(next: CampaignStatus) -> String {
    CampaignStatus::allowed_sources(next)
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Clone)]
pub struct CampaignService {
    db_pool: Pool<Sqlite>,
    contact_service: ContactService,
    gateway: Arc<dyn MessageGateway>,
}

impl CampaignService {
    pub fn new(
        db_pool: Pool<Sqlite>,
        contact_service: ContactService,
        gateway: Arc<dyn MessageGateway>,
    ) -> Self {
        Self {
            db_pool,
            contact_service,
            gateway,
        }
    }

    pub async fn create_campaign(&self, req: CreateCampaignRequest) -> Result<CampaignRecord> {
        if req.name.trim().is_empty() {
            return Err(CampaignError::Validation("La campaña necesita nombre".to_string()).into());
        }
        if req.message_template.trim().is_empty() {
            return Err(
                CampaignError::Validation("La plantilla del mensaje está vacía".to_string()).into(),
            );
        }
        if let Some(list_id) = req.broadcast_list_id.as_deref() {
            let list = self.contact_service.get_list(list_id).await?;
            if list.tenant_id != req.tenant_id {
                return Err(CampaignError::not_found("broadcast_list", list_id).into());
            }
        }

        let campaign_id = Uuid::new_v4().to_string();
        let now = db_timestamp(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO campaigns (
                id, tenant_id, name, message_template, broadcast_list_id,
                status, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 'draft', ?6, ?6)
            "#,
        )
        .bind(&campaign_id)
        .bind(&req.tenant_id)
        .bind(req.name.trim())
        .bind(&req.message_template)
        .bind(&req.broadcast_list_id)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar campaña")?;

        log::info!(
            "(create_campaign) Campaña {} creada en draft para tenant={}",
            campaign_id,
            req.tenant_id
        );
        self.get_campaign(&campaign_id).await
    }

    pub async fn get_campaign(&self, campaign_id: &str) -> Result<CampaignRecord> {
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1");
        sqlx::query_as::<_, CampaignRecord>(&sql)
            .bind(campaign_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Fallo al consultar campaña")?
            .ok_or_else(|| CampaignError::not_found("campaign", campaign_id).into())
    }

    pub async fn list_campaigns(
        &self,
        tenant_id: &str,
        status: Option<CampaignStatus>,
        page: u64,
        page_size: u64,
    ) -> Result<ListCampaignsResponse> {
        let offset = page_offset(page, page_size);
        let status = status.as_ref().map(CampaignStatus::as_str);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM campaigns WHERE tenant_id = ?1 AND (?2 IS NULL OR status = ?2)",
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_one(&self.db_pool)
        .await?;

        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
             WHERE tenant_id = ?1 AND (?2 IS NULL OR status = ?2) \
             ORDER BY created_at DESC LIMIT ?3 OFFSET ?4"
        );
        let items = sqlx::query_as::<_, CampaignRecord>(&sql)
            .bind(tenant_id)
            .bind(status)
            .bind(page_size as i64)
            .bind(offset)
            .fetch_all(&self.db_pool)
            .await?;

        Ok(ListCampaignsResponse {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }

    /// draft -> scheduled. El scheduler la arranca cuando vence `scheduled_at`.
    pub async fn schedule_campaign(
        &self,
        campaign_id: &str,
        req: ScheduleCampaignRequest,
    ) -> Result<CampaignRecord> {
        if req.instance_name.trim().is_empty() {
            return Err(CampaignError::Validation("Falta instance_name".to_string()).into());
        }
        let now = db_timestamp(Utc::now());
        let sql = format!(
            r#"
            UPDATE campaigns
            SET status = 'scheduled',
                scheduled_at = ?2,
                instance_name = ?3,
                updated_at = ?4
            WHERE id = ?1 AND status IN ({})
            "#,
            sources_sql(CampaignStatus::Scheduled)
        );

        let res = sqlx::query(&sql)
            .bind(campaign_id)
            .bind(db_timestamp(req.scheduled_at))
            .bind(req.instance_name.trim())
            .bind(&now)
            .execute(&self.db_pool)
            .await
            .context("Fallo al programar campaña")?;

        if res.rows_affected() == 0 {
            return Err(self
                .rejected_transition(campaign_id, CampaignStatus::Scheduled)
                .await);
        }

        log::info!(
            "(schedule_campaign) Campaña {} programada para {}",
            campaign_id,
            req.scheduled_at
        );
        self.get_campaign(campaign_id).await
    }

    /// Arranca la campaña: valida precondiciones, resuelve destinatarios,
    /// renderiza y encola todo en una sola transacción, y deja la campaña en
    /// `sending`. Si algo falla antes del commit no queda estado parcial.
    pub async fn start_campaign(
        &self,
        campaign_id: &str,
        instance_name: &str,
    ) -> Result<StartCampaignResponse> {
        log::info!(
            "(start_campaign) Iniciando campaña {} con instancia '{}'",
            campaign_id,
            instance_name
        );

        let campaign = self.get_campaign(campaign_id).await?;
        if !campaign.status.can_transition_to(CampaignStatus::Sending) {
            return Err(CampaignError::InvalidTransition {
                id: campaign_id.to_string(),
                from: campaign.status,
                to: CampaignStatus::Sending,
            }
            .into());
        }
        if instance_name.trim().is_empty() {
            return Err(CampaignError::Validation("Falta instanceName".to_string()).into());
        }

        let connected = self
            .gateway
            .is_connected(instance_name)
            .await
            .context("No se pudo consultar el estado de la instancia")?;
        if !connected {
            return Err(CampaignError::InstanceNotConnected(instance_name.to_string()).into());
        }

        let recipients = self
            .contact_service
            .resolve_recipients(&campaign.tenant_id, campaign.broadcast_list_id.as_deref())
            .await?;
        if recipients.is_empty() {
            return Err(CampaignError::NoContacts(campaign_id.to_string()).into());
        }

        let messages: Vec<NewCampaignMessage> = recipients
            .iter()
            .map(|contact| NewCampaignMessage {
                contact_id: contact.id.clone(),
                phone: contact.phone.clone(),
                message_content: template_service::render(&campaign.message_template, contact),
            })
            .collect();
        let total = messages.len() as i64;
        let now = db_timestamp(Utc::now());

        let mut tx = self.db_pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE campaigns
            SET status = 'sending',
                instance_name = ?2,
                total_contacts = ?3,
                sent = 0,
                delivered = 0,
                failed = 0,
                error_message = NULL,
                started_at = ?4,
                updated_at = ?4
            WHERE id = ?1 AND status IN ({})
            "#,
            sources_sql(CampaignStatus::Sending)
        );
        let res = sqlx::query(&sql)
            .bind(campaign_id)
            .bind(instance_name)
            .bind(total)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .context("Fallo al pasar la campaña a sending")?;

        if res.rows_affected() == 0 {
            // Otro arranque ganó la carrera
            tx.rollback().await?;
            return Err(self
                .rejected_transition(campaign_id, CampaignStatus::Sending)
                .await);
        }

        CampaignMessageService::enqueue(&mut tx, campaign_id, &messages).await?;
        tx.commit().await.context("Fallo al confirmar arranque")?;

        log::info!(
            "(start_campaign) Campaña {} en sending con {} mensajes en cola",
            campaign_id,
            total
        );

        Ok(StartCampaignResponse {
            success: true,
            campaign_id: campaign_id.to_string(),
            total_contacts: total,
            message: "Campaign started, dispatch queued".to_string(),
        })
    }

    /// Vuelca los contadores de una campaña en `sending`. Se recalculan
    /// desde las filas, así dos corridas no se pisan los totales.
    pub async fn update_counters(&self, campaign_id: &str) -> Result<()> {
        let now = db_timestamp(Utc::now());
        sqlx::query(&format!(
            r#"
            UPDATE campaigns
            SET {COUNTERS_FROM_ROWS},
                updated_at = ?2
            WHERE id = ?1 AND status = 'sending'
            "#
        ))
        .bind(campaign_id)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al actualizar contadores de campaña")?;
        Ok(())
    }

    pub async fn refresh_delivered(&self, campaign_id: &str) -> Result<()> {
        let now = db_timestamp(Utc::now());
        sqlx::query(
            r#"
            UPDATE campaigns
            SET delivered = (
                    SELECT COUNT(*) FROM campaign_messages
                    WHERE campaign_id = ?1 AND delivered_at IS NOT NULL
                ),
                updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(campaign_id)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al refrescar delivered")?;
        Ok(())
    }

    /// sending -> completed con contadores finales tomados de las filas.
    /// No mira cuántos mensajes fallaron.
    pub async fn complete_campaign(&self, campaign_id: &str) -> Result<()> {
        let now = db_timestamp(Utc::now());
        let sql = format!(
            r#"
            UPDATE campaigns
            SET status = 'completed',
                {COUNTERS_FROM_ROWS},
                completed_at = ?2,
                updated_at = ?2
            WHERE id = ?1 AND status IN ({})
            RETURNING sent, failed
            "#,
            sources_sql(CampaignStatus::Completed)
        );
        let counters: Option<(i64, i64)> = sqlx::query_as(&sql)
            .bind(campaign_id)
            .bind(&now)
            .fetch_optional(&self.db_pool)
            .await
            .context("Fallo al marcar campaña como completed")?;

        let Some((sent, failed)) = counters else {
            return Err(self
                .rejected_transition(campaign_id, CampaignStatus::Completed)
                .await);
        };
        log::info!(
            "(complete_campaign) Campaña {} -> completed (sent={}, failed={})",
            campaign_id,
            sent,
            failed
        );
        Ok(())
    }

    /// sending -> failed. Solo para corridas abortadas por infraestructura.
    pub async fn fail_campaign(&self, campaign_id: &str, error: &str) -> Result<()> {
        let now = db_timestamp(Utc::now());
        let sql = format!(
            r#"
            UPDATE campaigns
            SET status = 'failed',
                error_message = ?2,
                completed_at = ?3,
                updated_at = ?3
            WHERE id = ?1 AND status IN ({})
            "#,
            sources_sql(CampaignStatus::Failed)
        );
        let res = sqlx::query(&sql)
            .bind(campaign_id)
            .bind(error)
            .bind(&now)
            .execute(&self.db_pool)
            .await
            .context("Fallo al marcar campaña como failed")?;

        if res.rows_affected() == 0 {
            return Err(self
                .rejected_transition(campaign_id, CampaignStatus::Failed)
                .await);
        }
        log::warn!("(fail_campaign) Campaña {} -> failed: {}", campaign_id, error);
        Ok(())
    }

    /// Campañas programadas cuyo `scheduled_at` ya pasó.
    pub async fn due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<CampaignRecord>> {
        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
             WHERE status = 'scheduled' AND scheduled_at IS NOT NULL AND scheduled_at <= ?1 \
             ORDER BY scheduled_at"
        );
        let rows = sqlx::query_as::<_, CampaignRecord>(&sql)
            .bind(db_timestamp(now))
            .fetch_all(&self.db_pool)
            .await
            .context("Fallo al buscar campañas programadas")?;
        Ok(rows)
    }

    /// Error para una transición que el UPDATE no aplicó.
    async fn rejected_transition(&self, campaign_id: &str, to: CampaignStatus) -> anyhow::Error {
        match self.get_campaign(campaign_id).await {
            Ok(current) => CampaignError::InvalidTransition {
                id: campaign_id.to_string(),
                from: current.status,
                to,
            }
            .into(),
            Err(e) => e,
        }
    }
}
