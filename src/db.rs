//! db.rs
//! Pool de SQLite y migraciones embebidas.

use std::path::Path;

use anyhow::{Context, Result};
use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn setup_database(database_path: &str) -> Result<Pool<Sqlite>> {
    // Crear carpeta contenedora si hace falta
    if let Some(parent) = Path::new(database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("No se pudo crear directorio {:?}", parent))?;
        }
    }

    let db_url = format!("sqlite:{}?mode=rwc", database_path);
    log::info!("Conectando a SQLite en {}", db_url);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .context("No se pudo conectar a la base de datos SQLite")?;

    run_migrations(&db_pool).await?;
    Ok(db_pool)
}

pub async fn run_migrations(db_pool: &Pool<Sqlite>) -> Result<()> {
    MIGRATOR
        .run(db_pool)
        .await
        .context("Fallo en migraciones")?;
    Ok(())
}
