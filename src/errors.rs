//! errors.rs
//! Errores de precondición del flujo de campañas. Todo lo demás viaja como
//! `anyhow::Error`; los handlers hacen `downcast_ref` para elegir el status HTTP.

use actix_web::http::StatusCode;
use thiserror::Error;

use crate::models::campaign_model::CampaignStatus;

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Transición inválida de campaña {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: CampaignStatus,
        to: CampaignStatus,
    },

    #[error("La campaña {0} no tiene contactos con teléfono válido")]
    NoContacts(String),

    #[error("La instancia '{0}' no está conectada al gateway")]
    InstanceNotConnected(String),

    #[error("Solicitud inválida: {0}")]
    Validation(String),
}

impl CampaignError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CampaignError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CampaignError::NotFound { .. } => StatusCode::NOT_FOUND,
            CampaignError::InvalidTransition { .. } => StatusCode::CONFLICT,
            CampaignError::NoContacts(_) | CampaignError::InstanceNotConnected(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            CampaignError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Status HTTP para un error de servicio: el de `CampaignError` si lo hay
/// en la cadena, 500 en cualquier otro caso.
pub fn status_for(err: &anyhow::Error) -> StatusCode {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CampaignError>())
        .map(CampaignError::status_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
