use crate::auth::jwt::generate_access_token;
use crate::config::{Config, StorageBackend};
use crate::model::employee::NewEmployee;
use crate::model::role::Role;
use crate::store::{EmployeeDirectory, InMemoryEmployeeDirectory};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub const SECRET: &str = "test-secret";

pub fn config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".into(),
        jwt_secret: SECRET.into(),
        storage_backend: StorageBackend::Memory,
        database_url: None,
        db_max_connections: 1,
        rate_protected_per_min: 1000,
        api_prefix: "/api".into(),
        log_dir: "logs".into(),
        log_level: tracing::Level::DEBUG,
    }
}

pub fn bearer(role: Role, employee_id: Option<u64>) -> String {
    let token = generate_access_token(7, "tester".into(), role, employee_id, SECRET, 900).unwrap();
    format!("Bearer {token}")
}

/// Employee 1 works in Engineering, employee 2 in Sales.
pub async fn seeded_directory() -> Arc<dyn EmployeeDirectory> {
    let directory = InMemoryEmployeeDirectory::new();
    for (first_name, department) in [("Ada", "Engineering"), ("Grace", "Sales")] {
        let new = NewEmployee::new(
            first_name,
            "Tester",
            &format!("{}@example.com", first_name.to_lowercase()),
            department,
            "Staff",
            dec!(3000),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            None,
        )
        .unwrap();
        directory.insert(new).await.unwrap();
    }
    Arc::new(directory)
}

/// Protected API routes over in-memory stores, without rate limiting.
macro_rules! test_app {
    () => {{
        let directory = $crate::api::test_support::seeded_directory().await;
        let service = $crate::service::PayrollService::new(
            ::std::sync::Arc::new($crate::store::InMemoryPayrollStore::new()),
            directory.clone(),
        );
        ::actix_web::test::init_service(
            ::actix_web::App::new()
                .app_data(::actix_web::web::Data::new($crate::api::test_support::config()))
                .app_data(::actix_web::web::Data::new(service))
                .app_data(::actix_web::web::Data::new(directory))
                .service(
                    ::actix_web::web::scope("/api")
                        .wrap(::actix_web::middleware::from_fn(
                            $crate::auth::middleware::auth_middleware,
                        ))
                        .configure($crate::routes::api_routes),
                ),
        )
        .await
    }};
}

pub(crate) use test_app;
