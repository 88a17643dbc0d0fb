//! app.rs
use crate::handlers::{campaign_handler, contact_handler, webhook_handler};
use actix_web::{web, HttpResponse};

async fn health_endpoint() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health_endpoint))
            .service(
                web::scope("/contacts")
                    .route("", web::post().to(contact_handler::create_contact_endpoint))
                    .route("", web::get().to(contact_handler::list_contacts_endpoint))
                    .route("/{id}", web::get().to(contact_handler::get_contact_endpoint)),
            )
            .service(
                web::scope("/broadcast-lists")
                    .route("", web::post().to(contact_handler::create_list_endpoint))
                    .route(
                        "/{id}/contacts",
                        web::post().to(contact_handler::add_list_contacts_endpoint),
                    )
                    .route(
                        "/{id}/contacts",
                        web::get().to(contact_handler::list_members_endpoint),
                    ),
            )
            .service(
                web::scope("/campaigns")
                    .route(
                        "",
                        web::post().to(campaign_handler::create_campaign_endpoint),
                    )
                    .route("", web::get().to(campaign_handler::list_campaigns_endpoint))
                    .route(
                        "/dispatch",
                        web::post().to(campaign_handler::dispatch_campaign_endpoint),
                    )
                    .route(
                        "/{id}",
                        web::get().to(campaign_handler::get_campaign_endpoint),
                    )
                    .route(
                        "/{id}/messages",
                        web::get().to(campaign_handler::list_campaign_messages_endpoint),
                    )
                    .route(
                        "/{id}/schedule",
                        web::post().to(campaign_handler::schedule_campaign_endpoint),
                    )
                    .route(
                        "/{id}/start",
                        web::post().to(campaign_handler::start_campaign_endpoint),
                    ),
            )
            .service(
                web::scope("/webhooks").route(
                    "/gateway",
                    web::post().to(webhook_handler::gateway_webhook_endpoint),
                ),
            ),
    );
}
