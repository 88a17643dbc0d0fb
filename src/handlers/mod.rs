//! handlers/mod.rs
//! Módulo que agrupa los distintos handlers (campañas, contactos, webhooks).

use std::str::FromStr;

use actix_web::HttpResponse;
use serde::Deserialize;
use serde_json::json;

use crate::errors::{status_for, CampaignError};

pub mod campaign_handler;
pub mod contact_handler;
pub mod webhook_handler;

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl PaginationQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u64 {
        self.page_size.unwrap_or(10).clamp(1, 200)
    }
}

/// Filtro `?status=` opcional; un valor desconocido es un 400.
pub fn parse_status<T>(raw: Option<&str>) -> anyhow::Result<Option<T>>
where
    T: FromStr<Err = String>,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| CampaignError::Validation(e).into()),
        None => Ok(None),
    }
}

/// Respuesta de error uniforme; el status sale del tipo de error.
pub fn error_response(e: &anyhow::Error) -> HttpResponse {
    let status = status_for(e);
    if status.is_server_error() {
        log::error!("Error interno: {:?}", e);
    }
    HttpResponse::build(status).json(json!({
        "success": false,
        "error": format!("{:#}", e)
    }))
}
