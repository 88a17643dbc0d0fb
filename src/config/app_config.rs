//! config/app_config.rs
//! Configuración global del servicio, leída desde variables de entorno (.env).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

/// Configuración del servicio de campañas, con valores por defecto
/// para todo lo que no sea credencial del gateway.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway_base_url: String,
    pub gateway_api_key: String,
    pub gateway_timeout_secs: u64,
    pub database_path: String,
    pub server_host: String,
    pub server_port: u16,
    pub dispatch: DispatchConfig,
    pub scheduler_interval_secs: u64,
}

/// Parámetros del despachador: pausa fija entre mensajes y cada cuántos
/// mensajes se vuelcan los contadores a la campaña.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub send_delay_ms: u64,
    pub flush_every: usize,
}

impl DispatchConfig {
    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            send_delay_ms: 2000,
            flush_every: 10,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let gateway_base_url = env::var("EVOLUTION_API_URL")
            .map_err(|_| anyhow!("No se definió EVOLUTION_API_URL"))?;
        let gateway_api_key = env::var("EVOLUTION_API_KEY")
            .map_err(|_| anyhow!("No se definió EVOLUTION_API_KEY"))?;

        let defaults = DispatchConfig::default();
        let flush_every: usize = env_or("DISPATCH_FLUSH_EVERY", defaults.flush_every)?;
        if flush_every == 0 {
            return Err(anyhow!("DISPATCH_FLUSH_EVERY debe ser mayor que 0"));
        }

        Ok(AppConfig {
            gateway_base_url: gateway_base_url.trim_end_matches('/').to_string(),
            gateway_api_key,
            gateway_timeout_secs: env_or("GATEWAY_TIMEOUT_SECS", 30)?,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/campaigns.db".to_string()),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env_or("SERVER_PORT", 5022)?,
            dispatch: DispatchConfig {
                send_delay_ms: env_or("DISPATCH_DELAY_MS", defaults.send_delay_ms)?,
                flush_every,
            },
            scheduler_interval_secs: env_or("SCHEDULER_INTERVAL_SECS", 30)?,
        })
    }
}

/// Lee una variable opcional; si existe pero no se puede parsear, falla.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Valor inválido para {}: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
