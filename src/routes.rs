use crate::{
    api::{employee, health, payroll},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};
use std::sync::Arc;

pub type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-peer limiter allowing `requests_per_min` with an equal burst.
pub fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min} requests per minute"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiter: Limiter) {
    // Public routes
    cfg.service(web::resource("/health").route(web::get().to(health::health)));

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiter) // rate limiting
            .configure(api_routes),
    );
}

/// Everything mounted under the API prefix, without middleware.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/payroll").configure(payroll_routes))
        .service(web::scope("/employee").configure(employee_routes));
}

fn payroll_routes(cfg: &mut web::ServiceConfig) {
    // /payroll
    cfg.service(
        web::resource("")
            .route(web::get().to(payroll::list_payrolls))
            .route(web::post().to(payroll::create_payroll)),
    )
    // /payroll/summary must be matched before /payroll/{id}
    .service(web::resource("/summary").route(web::get().to(payroll::payroll_summary)))
    .service(
        web::resource("/employee/{employee_id}")
            .route(web::get().to(payroll::employee_payrolls)),
    )
    .service(
        web::resource("/{id}")
            .route(web::get().to(payroll::get_payroll))
            .route(web::put().to(payroll::update_payroll)),
    )
    .service(
        web::resource("/{id}/status").route(web::patch().to(payroll::update_payroll_status)),
    );
}

fn employee_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(employee::list_employees))
            .route(web::post().to(employee::create_employee)),
    )
    .service(
        web::resource("/{id}")
            .route(web::get().to(employee::get_employee))
            .route(web::put().to(employee::update_employee)),
    );
}
