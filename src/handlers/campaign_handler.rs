//! handlers/campaign_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::handlers::{error_response, parse_status, PaginationQuery};
use crate::models::campaign_message_model::MessageStatus;
use crate::models::campaign_model::{
    CampaignStatus, CreateCampaignRequest, DispatchTriggerRequest, ScheduleCampaignRequest, StartCampaignRequest,
};
use crate::services::campaign_message_service::CampaignMessageService;
use crate::services::campaign_service::CampaignService;
use crate::services::dispatch_service::DispatchService;

#[derive(Deserialize)]
pub struct TenantQuery {
    tenant_id: String,
    status: Option<String>,
    page: Option<u64>,
    page_size: Option<u64>,
}

#[derive(Deserialize)]
pub struct MessagesQuery {
    status: Option<String>,
    page: Option<u64>,
    page_size: Option<u64>,
}

/// POST /api/campaigns
pub async fn create_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<CreateCampaignRequest>,
) -> HttpResponse {
    match campaign_service.create_campaign(body.into_inner()).await {
        Ok(campaign) => HttpResponse::Created().json(campaign),
        Err(e) => error_response(&e),
    }
}

/// GET /api/campaigns?tenant_id=&status=
pub async fn list_campaigns_endpoint(
    campaign_service: web::Data<CampaignService>,
    query: web::Query<TenantQuery>,
) -> HttpResponse {
    let query = query.into_inner();
    let pagination = PaginationQuery {
        page: query.page,
        page_size: query.page_size,
    };
    let status = match parse_status::<CampaignStatus>(query.status.as_deref()) {
        Ok(status) => status,
        Err(e) => return error_response(&e),
    };

    match campaign_service
        .list_campaigns(
            &query.tenant_id,
            status,
            pagination.page(),
            pagination.page_size(),
        )
        .await
    {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(&e),
    }
}

/// GET /api/campaigns/{id}
pub async fn get_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    match campaign_service.get_campaign(&path.into_inner()).await {
        Ok(campaign) => HttpResponse::Ok().json(campaign),
        Err(e) => error_response(&e),
    }
}

/// GET /api/campaigns/{id}/messages?status=
pub async fn list_campaign_messages_endpoint(
    campaign_service: web::Data<CampaignService>,
    message_service: web::Data<CampaignMessageService>,
    path: web::Path<String>,
    query: web::Query<MessagesQuery>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    let query = query.into_inner();
    let pagination = PaginationQuery {
        page: query.page,
        page_size: query.page_size,
    };

    let status = match parse_status::<MessageStatus>(query.status.as_deref()) {
        Ok(status) => status,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = campaign_service.get_campaign(&campaign_id).await {
        return error_response(&e);
    }

    match message_service
        .list_messages(
            &campaign_id,
            status,
            pagination.page(),
            pagination.page_size(),
        )
        .await
    {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(&e),
    }
}

/// POST /api/campaigns/{id}/schedule
pub async fn schedule_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
    body: web::Json<ScheduleCampaignRequest>,
) -> HttpResponse {
    match campaign_service
        .schedule_campaign(&path.into_inner(), body.into_inner())
        .await
    {
        Ok(campaign) => HttpResponse::Ok().json(campaign),
        Err(e) => error_response(&e),
    }
}

/// POST /api/campaigns/{id}/start
///
/// El arranque (validaciones + encolado) es síncrono; el despacho queda
/// corriendo en segundo plano y no hay forma de esperar su resultado aquí.
pub async fn start_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    dispatch_service: web::Data<DispatchService>,
    path: web::Path<String>,
    body: web::Json<StartCampaignRequest>,
) -> HttpResponse {
    let campaign_id = path.into_inner();
    let instance_name = body.into_inner().instance_name;

    match campaign_service
        .start_campaign(&campaign_id, &instance_name)
        .await
    {
        Ok(resp) => {
            dispatch_service.spawn_dispatch(campaign_id, instance_name);
            HttpResponse::Ok().json(resp)
        }
        Err(e) => error_response(&e),
    }
}

/// POST /api/campaigns/dispatch
/// Disparo interno `{campaignId, instanceName}`: fire-and-forget.
pub async fn dispatch_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    dispatch_service: web::Data<DispatchService>,
    body: web::Json<DispatchTriggerRequest>,
) -> HttpResponse {
    let req = body.into_inner();

    if let Err(e) = campaign_service.get_campaign(&req.campaign_id).await {
        return error_response(&e);
    }

    log::info!(
        "(dispatch_campaign_endpoint) Disparando despacho de campaña {} por '{}'",
        req.campaign_id,
        req.instance_name
    );
    let campaign_id = req.campaign_id.clone();
    dispatch_service.spawn_dispatch(req.campaign_id, req.instance_name);

    HttpResponse::Accepted().json(json!({
        "success": true,
        "campaign_id": campaign_id,
        "message": "Dispatch started"
    }))
}
