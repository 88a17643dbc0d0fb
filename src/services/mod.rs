//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

use chrono::{DateTime, SecondsFormat, Utc};

pub mod campaign_message_service;
pub mod campaign_service;
pub mod contact_service;
pub mod dispatch_service;
pub mod gateway_service;
pub mod scheduler_service;
pub mod template_service;

/// Formato único de timestamps en SQLite (ancho fijo, comparable como texto).
pub fn db_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// OFFSET de una página (base 1). Satura en vez de desbordar con páginas
/// enormes; SQLite devuelve entonces una página vacía.
pub fn page_offset(page: u64, page_size: u64) -> i64 {
    let offset = (page.max(1) - 1).saturating_mul(page_size);
    i64::try_from(offset).unwrap_or(i64::MAX)
}
