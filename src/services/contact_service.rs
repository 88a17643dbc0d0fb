//! services/contact_service.rs
//! Contactos, listas de difusión y resolución de destinatarios.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::errors::CampaignError;
use crate::models::contact_model::{
    BroadcastListRecord, ContactRecord, CreateBroadcastListRequest, CreateContactRequest,
    ListContactsResponse,
};
use crate::services::{db_timestamp, page_offset};

const MIN_PHONE_DIGITS: usize = 8;
const MAX_PHONE_DIGITS: usize = 15;

/// Deja solo dígitos; `None` si el largo no es de un número E.164 plausible.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len()) {
        Some(digits)
    } else {
        None
    }
}

#[derive(Clone, Debug)]
pub struct ContactService {
    db_pool: Pool<Sqlite>,
}

impl ContactService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        ContactService { db_pool }
    }

    pub async fn create_contact(&self, req: CreateContactRequest) -> Result<ContactRecord> {
        let phone = normalize_phone(&req.phone).ok_or_else(|| {
            CampaignError::Validation(format!("Teléfono inválido: '{}'", req.phone))
        })?;
        let contact_id = Uuid::new_v4().to_string();
        let now = db_timestamp(Utc::now());

        let inserted = sqlx::query(
            r#"
            INSERT INTO contacts (id, tenant_id, phone, name, email, custom_fields, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&contact_id)
        .bind(&req.tenant_id)
        .bind(&phone)
        .bind(&req.name)
        .bind(&req.email)
        .bind(Json(&req.custom_fields))
        .bind(&now)
        .execute(&self.db_pool)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(CampaignError::Validation(format!(
                    "Ya existe un contacto con teléfono {} en el tenant",
                    phone
                ))
                .into());
            }
            Err(e) => return Err(e).context("Fallo al insertar contacto"),
        }

        log::info!(
            "(create_contact) Contacto {} creado para tenant={}",
            contact_id,
            req.tenant_id
        );
        self.get_contact(&contact_id).await
    }

    pub async fn get_contact(&self, contact_id: &str) -> Result<ContactRecord> {
        sqlx::query_as::<_, ContactRecord>(
            r#"
            SELECT id, tenant_id, phone, name, email, custom_fields, created_at
            FROM contacts
            WHERE id = ?1
            "#,
        )
        .bind(contact_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Fallo al consultar contacto")?
        .ok_or_else(|| CampaignError::not_found("contact", contact_id).into())
    }

    pub async fn list_contacts(
        &self,
        tenant_id: &str,
        page: u64,
        page_size: u64,
    ) -> Result<ListContactsResponse> {
        let offset = page_offset(page, page_size);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_one(&self.db_pool)
            .await?;

        let items = sqlx::query_as::<_, ContactRecord>(
            r#"
            SELECT id, tenant_id, phone, name, email, custom_fields, created_at
            FROM contacts
            WHERE tenant_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(tenant_id)
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(ListContactsResponse {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }

    pub async fn create_list(&self, req: CreateBroadcastListRequest) -> Result<BroadcastListRecord> {
        if req.name.trim().is_empty() {
            return Err(CampaignError::Validation("La lista necesita nombre".to_string()).into());
        }
        let list_id = Uuid::new_v4().to_string();
        let now = db_timestamp(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO broadcast_lists (id, tenant_id, name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&list_id)
        .bind(&req.tenant_id)
        .bind(req.name.trim())
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar lista de difusión")?;

        self.get_list(&list_id).await
    }

    pub async fn get_list(&self, list_id: &str) -> Result<BroadcastListRecord> {
        sqlx::query_as::<_, BroadcastListRecord>(
            "SELECT id, tenant_id, name, created_at FROM broadcast_lists WHERE id = ?1",
        )
        .bind(list_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Fallo al consultar lista de difusión")?
        .ok_or_else(|| CampaignError::not_found("broadcast_list", list_id).into())
    }

    /// Agrega contactos a la lista. Ignora los que ya estaban y los que no
    /// pertenecen al tenant de la lista. Devuelve cuántos se agregaron.
    pub async fn add_contacts_to_list(&self, list_id: &str, contact_ids: &[String]) -> Result<u64> {
        let list = self.get_list(list_id).await?;
        let now = db_timestamp(Utc::now());

        let mut tx = self.db_pool.begin().await?;
        let mut added = 0;
        for contact_id in contact_ids {
            let res = sqlx::query(
                r#"
                INSERT OR IGNORE INTO broadcast_list_contacts (list_id, contact_id, added_at)
                SELECT ?1, id, ?2 FROM contacts WHERE id = ?3 AND tenant_id = ?4
                "#,
            )
            .bind(list_id)
            .bind(&now)
            .bind(contact_id)
            .bind(&list.tenant_id)
            .execute(&mut *tx)
            .await
            .context("Fallo al agregar contacto a la lista")?;
            added += res.rows_affected();
        }
        tx.commit().await?;

        log::info!(
            "(add_contacts_to_list) lista={} agregados={} de {}",
            list_id,
            added,
            contact_ids.len()
        );
        Ok(added)
    }

    pub async fn list_members(&self, list_id: &str) -> Result<Vec<ContactRecord>> {
        self.get_list(list_id).await?;
        let rows = sqlx::query_as::<_, ContactRecord>(
            r#"
            SELECT c.id, c.tenant_id, c.phone, c.name, c.email, c.custom_fields, c.created_at
            FROM broadcast_list_contacts blc
            JOIN contacts c ON c.id = blc.contact_id
            WHERE blc.list_id = ?1
            ORDER BY blc.rowid
            "#,
        )
        .bind(list_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(rows)
    }

    /// Expande la referencia de la campaña a contactos concretos: miembros de
    /// la lista (o todo el tenant si no hay lista), con teléfono válido y sin
    /// números repetidos. El teléfono devuelto ya está normalizado.
    pub async fn resolve_recipients(
        &self,
        tenant_id: &str,
        broadcast_list_id: Option<&str>,
    ) -> Result<Vec<ContactRecord>> {
        let candidates = match broadcast_list_id {
            Some(list_id) => {
                let list = self.get_list(list_id).await?;
                if list.tenant_id != tenant_id {
                    return Err(CampaignError::not_found("broadcast_list", list_id).into());
                }
                self.list_members(list_id).await?
            }
            None => {
                sqlx::query_as::<_, ContactRecord>(
                    r#"
                    SELECT id, tenant_id, phone, name, email, custom_fields, created_at
                    FROM contacts
                    WHERE tenant_id = ?1
                    ORDER BY rowid
                    "#,
                )
                .bind(tenant_id)
                .fetch_all(&self.db_pool)
                .await?
            }
        };

        let total = candidates.len();
        let mut seen = HashSet::new();
        let recipients: Vec<ContactRecord> = candidates
            .into_iter()
            .filter_map(|mut contact| {
                let phone = normalize_phone(&contact.phone)?;
                if !seen.insert(phone.clone()) {
                    return None;
                }
                contact.phone = phone;
                Some(contact)
            })
            .collect();

        log::info!(
            "(resolve_recipients) tenant={} lista={:?}: {} candidatos, {} destinatarios válidos",
            tenant_id,
            broadcast_list_id,
            total,
            recipients.len()
        );
        Ok(recipients)
    }
}
