//! handlers/webhook_handler.rs
//! Acuses de entrega que manda el gateway.

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::handlers::error_response;
use crate::models::gateway_model::GatewayWebhookEvent;
use crate::services::campaign_message_service::CampaignMessageService;
use crate::services::campaign_service::CampaignService;

/// POST /api/webhooks/gateway
///
/// Siempre responde 200 a eventos que no nos interesan, para que el gateway
/// no los reintente.
pub async fn gateway_webhook_endpoint(
    message_service: web::Data<CampaignMessageService>,
    campaign_service: web::Data<CampaignService>,
    body: web::Json<GatewayWebhookEvent>,
) -> HttpResponse {
    let event = body.into_inner();

    if !event.is_message_update() || !event.is_delivery_ack() {
        return HttpResponse::Ok().json(json!({ "success": true, "handled": false }));
    }
    let Some(gateway_id) = event.message_id() else {
        log::warn!(
            "(gateway_webhook) Evento {} sin id de mensaje (instance={:?})",
            event.event,
            event.instance
        );
        return HttpResponse::Ok().json(json!({ "success": true, "handled": false }));
    };

    let campaign_id = match message_service.mark_delivered(gateway_id).await {
        Ok(Some(campaign_id)) => campaign_id,
        Ok(None) => {
            log::warn!(
                "(gateway_webhook) Acuse {} para mensaje {} sin fila enviada pendiente (instance={:?})",
                event.event,
                gateway_id,
                event.instance
            );
            return HttpResponse::Ok().json(json!({ "success": true, "handled": false }));
        }
        Err(e) => return error_response(&e),
    };

    if let Err(e) = campaign_service.refresh_delivered(&campaign_id).await {
        return error_response(&e);
    }

    log::info!(
        "(gateway_webhook) Mensaje {} entregado (campaña {})",
        gateway_id,
        campaign_id
    );
    HttpResponse::Ok().json(json!({ "success": true, "handled": true }))
}
