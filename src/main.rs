use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;

use crate::config::app_config::AppConfig;
use crate::logger::init_logger;
use crate::services::campaign_message_service::CampaignMessageService;
use crate::services::campaign_service::CampaignService;
use crate::services::contact_service::ContactService;
use crate::services::dispatch_service::DispatchService;
use crate::services::gateway_service::{EvolutionGateway, MessageGateway};
use crate::services::scheduler_service::SchedulerService;

mod app;
mod config;
mod db;
mod errors;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = AppConfig::from_env().context("Configuración inválida")?;

    // Conectarnos a la DB (corre migraciones)
    let db_pool = db::setup_database(&config.database_path).await?;

    let gateway: Arc<dyn MessageGateway> = Arc::new(EvolutionGateway::new(
        &config.gateway_base_url,
        &config.gateway_api_key,
        config.gateway_timeout_secs,
    )?);

    let contact_service = ContactService::new(db_pool.clone());
    let message_service = CampaignMessageService::new(db_pool.clone());
    let campaign_service =
        CampaignService::new(db_pool.clone(), contact_service.clone(), gateway.clone());
    let dispatch_service = DispatchService::new(
        campaign_service.clone(),
        message_service.clone(),
        gateway.clone(),
        config.dispatch.clone(),
    );

    // Campañas programadas
    SchedulerService::new(campaign_service.clone(), dispatch_service.clone())
        .spawn_loop(Duration::from_secs(config.scheduler_interval_secs));

    // Levantar servidor
    log::info!(
        "Levantando servidor en {}:{}",
        config.server_host,
        config.server_port
    );
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(contact_service.clone()))
            .app_data(web::Data::new(message_service.clone()))
            .app_data(web::Data::new(campaign_service.clone()))
            .app_data(web::Data::new(dispatch_service.clone()))
            .configure(app::init_app)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await?;

    Ok(())
}
