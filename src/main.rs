use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod service;
mod store;
#[cfg(test)]
mod testing;

use config::{Config, StorageBackend};
use db::{init_db, run_migrations};
use model::employee::Employee;
use service::{SystemClock, TimeOffService};
use store::{MemoryStore, MySqlStore};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

async fn build_service(config: &Config) -> anyhow::Result<TimeOffService> {
    let clock = Arc::new(SystemClock);
    match config.storage_backend {
        StorageBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set when STORAGE_BACKEND=mysql")?;
            let pool = init_db(url, config.db_max_connections).await?;
            if config.run_migrations {
                run_migrations(&pool).await?;
                info!("Database migrations applied");
            }
            let store = Arc::new(MySqlStore::new(pool));
            Ok(TimeOffService::new(store.clone(), store, clock))
        }
        StorageBackend::Memory => {
            let employees: Vec<Employee> = match &config.memory_seed {
                Some(path) => {
                    let raw = std::fs::read_to_string(path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str(&raw)
                        .with_context(|| format!("Invalid employee seed in {}", path.display()))?
                }
                None => {
                    warn!("MEMORY_SEED not set, starting with an empty employee directory");
                    Vec::new()
                }
            };
            info!(employees = employees.len(), "Using in-memory storage");
            let store = Arc::new(MemoryStore::with_employees(employees));
            Ok(TimeOffService::new(store.clone(), store, clock))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(backend = %config.storage_backend, "Server starting...");

    let service = Data::new(build_service(&config).await?);
    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(service.clone())
            .app_data(config_data.clone())
            .configure(|cfg| routes::configure(cfg, &config_data))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
