//! services/campaign_message_service.rs
//! Cola de mensajes por destinatario (`campaign_messages`).
//! Cada transición se guarda con el estado de origen en el WHERE, así un
//! terminal nunca se reescribe y un mensaje no se toma dos veces.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::models::campaign_message_model::{
    CampaignMessageRecord, ListMessagesResponse, MessageCounts, MessageStatus, NewCampaignMessage,
};
use crate::services::{db_timestamp, page_offset};

const MESSAGE_COLUMNS: &str = r#"
    id, campaign_id, contact_id, phone, message_content, position, status,
    error_message, gateway_message_id, sent_at, delivered_at, created_at, updated_at
"#;

#[derive(Clone, Debug)]
pub struct CampaignMessageService {
    db_pool: Pool<Sqlite>,
}

impl CampaignMessageService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        CampaignMessageService { db_pool }
    }

    /// Inserta las filas en `queued`, en el orden recibido. Corre sobre la
    /// conexión de la transacción de arranque de la campaña.
    pub async fn enqueue(
        conn: &mut SqliteConnection,
        campaign_id: &str,
        messages: &[NewCampaignMessage],
    ) -> Result<u64> {
        let now = db_timestamp(Utc::now());
        let mut inserted = 0;

        for (position, msg) in messages.iter().enumerate() {
            let msg_id = Uuid::new_v4().to_string();
            sqlx::query(
                r#"
                INSERT INTO campaign_messages (
                    id, campaign_id, contact_id, phone, message_content, position,
                    status, error_message, gateway_message_id, sent_at, delivered_at,
                    created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'queued', NULL, NULL, NULL, NULL, ?7, ?7)
                "#,
            )
            .bind(&msg_id)
            .bind(campaign_id)
            .bind(&msg.contact_id)
            .bind(&msg.phone)
            .bind(&msg.message_content)
            .bind(position as i64)
            .bind(&now)
            .execute(&mut *conn)
            .await
            .context("Error encolando campaign_message")?;
            inserted += 1;
        }

        Ok(inserted)
    }

    pub async fn list_queued(&self, campaign_id: &str) -> Result<Vec<CampaignMessageRecord>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM campaign_messages \
             WHERE campaign_id = ?1 AND status = 'queued' ORDER BY position"
        );
        let rows = sqlx::query_as::<_, CampaignMessageRecord>(&sql)
            .bind(campaign_id)
            .fetch_all(&self.db_pool)
            .await
            .context("Error listando mensajes en cola")?;
        Ok(rows)
    }

    /// queued -> sending. `false` si otro proceso ya lo tomó.
    pub async fn claim(&self, message_id: &str) -> Result<bool> {
        let now = db_timestamp(Utc::now());
        let res = sqlx::query(
            r#"
            UPDATE campaign_messages
            SET status = 'sending', updated_at = ?2
            WHERE id = ?1 AND status = 'queued'
            "#,
        )
        .bind(message_id)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Error marcando mensaje como sending")?;
        Ok(res.rows_affected() == 1)
    }

    /// sending -> sent, con fecha de envío e id del gateway.
    pub async fn mark_sent(&self, message_id: &str, gateway_message_id: Option<&str>) -> Result<bool> {
        let now = db_timestamp(Utc::now());
        let res = sqlx::query(
            r#"
            UPDATE campaign_messages
            SET status = 'sent',
                sent_at = ?2,
                gateway_message_id = ?3,
                error_message = NULL,
                updated_at = ?2
            WHERE id = ?1 AND status = 'sending'
            "#,
        )
        .bind(message_id)
        .bind(&now)
        .bind(gateway_message_id)
        .execute(&self.db_pool)
        .await
        .context("Error marcando mensaje como sent")?;
        Ok(res.rows_affected() == 1)
    }

    /// sending -> failed, guardando el texto de error del gateway.
    pub async fn mark_failed(&self, message_id: &str, error_message: &str) -> Result<bool> {
        let now = db_timestamp(Utc::now());
        let res = sqlx::query(
            r#"
            UPDATE campaign_messages
            SET status = 'failed',
                error_message = ?2,
                updated_at = ?3
            WHERE id = ?1 AND status = 'sending'
            "#,
        )
        .bind(message_id)
        .bind(error_message)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Error marcando mensaje como failed")?;
        Ok(res.rows_affected() == 1)
    }

    /// sending -> failed para todas las filas que quedaron tomadas por una
    /// corrida que no llegó a confirmar el envío.
    pub async fn fail_interrupted(&self, campaign_id: &str, error_message: &str) -> Result<u64> {
        let now = db_timestamp(Utc::now());
        let res = sqlx::query(
            r#"
            UPDATE campaign_messages
            SET status = 'failed',
                error_message = ?2,
                updated_at = ?3
            WHERE campaign_id = ?1 AND status = 'sending'
            "#,
        )
        .bind(campaign_id)
        .bind(error_message)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Error cerrando mensajes interrumpidos")?;
        Ok(res.rows_affected())
    }

    /// Acuse de entrega del gateway. Devuelve la campaña afectada, o `None`
    /// si el id no corresponde a un mensaje enviado o ya estaba entregado.
    pub async fn mark_delivered(&self, gateway_message_id: &str) -> Result<Option<String>> {
        let now = db_timestamp(Utc::now());
        let campaign_id: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE campaign_messages
            SET delivered_at = ?2, updated_at = ?2
            WHERE gateway_message_id = ?1
              AND status = 'sent'
              AND delivered_at IS NULL
            RETURNING campaign_id
            "#,
        )
        .bind(gateway_message_id)
        .bind(&now)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error marcando mensaje como entregado")?;
        Ok(campaign_id)
    }

    pub async fn count_by_status(&self, campaign_id: &str) -> Result<MessageCounts> {
        let (queued, sending, sent, failed, delivered): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COALESCE(SUM(status = 'queued'), 0),
                    COALESCE(SUM(status = 'sending'), 0),
                    COALESCE(SUM(status = 'sent'), 0),
                    COALESCE(SUM(status = 'failed'), 0),
                    COALESCE(SUM(delivered_at IS NOT NULL), 0)
                FROM campaign_messages
                WHERE campaign_id = ?1
                "#,
            )
            .bind(campaign_id)
            .fetch_one(&self.db_pool)
            .await
            .context("Error contando mensajes de la campaña")?;

        Ok(MessageCounts {
            queued,
            sending,
            sent,
            failed,
            delivered,
        })
    }

    pub async fn list_messages(
        &self,
        campaign_id: &str,
        status: Option<MessageStatus>,
        page: u64,
        page_size: u64,
    ) -> Result<ListMessagesResponse> {
        let offset = page_offset(page, page_size);
        let status = status.as_ref().map(MessageStatus::as_str);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM campaign_messages WHERE campaign_id = ?1 AND (?2 IS NULL OR status = ?2)",
        )
        .bind(campaign_id)
        .bind(status)
        .fetch_one(&self.db_pool)
        .await?;

        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM campaign_messages \
             WHERE campaign_id = ?1 AND (?2 IS NULL OR status = ?2) \
             ORDER BY position LIMIT ?3 OFFSET ?4"
        );
        let items = sqlx::query_as::<_, CampaignMessageRecord>(&sql)
            .bind(campaign_id)
            .bind(status)
            .bind(page_size as i64)
            .bind(offset)
            .fetch_all(&self.db_pool)
            .await?;

        Ok(ListMessagesResponse {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }
}
