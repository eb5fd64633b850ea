use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use std::sync::Arc;

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

use config::{Config, StorageBackend};
use db::init_db;
use service::PayrollService;
use store::{
    EmployeeDirectory, InMemoryEmployeeDirectory, InMemoryPayrollStore, MySqlEmployeeDirectory,
    MySqlPayrollStore, PayrollStore,
};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

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
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let (store, directory): (Arc<dyn PayrollStore>, Arc<dyn EmployeeDirectory>) =
        match config.storage_backend {
            StorageBackend::MySql => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;
                let pool = init_db(url, config.db_max_connections).await?;
                (
                    Arc::new(MySqlPayrollStore::new(pool.clone())),
                    Arc::new(MySqlEmployeeDirectory::new(pool)),
                )
            }
            StorageBackend::Memory => {
                warn!("Using in-memory storage, data is lost on shutdown");
                (
                    Arc::new(InMemoryPayrollStore::new()),
                    Arc::new(InMemoryEmployeeDirectory::new()),
                )
            }
        };

    let service = Data::new(PayrollService::new(store, directory.clone()));
    let directory = Data::new(directory);
    let limiter = routes::build_limiter(config.rate_protected_per_min)?;
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard {_:.*} matches the JS/CSS assets
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(service.clone())
            .app_data(directory.clone())
            .configure(|cfg| routes::configure(cfg, &config, limiter.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
