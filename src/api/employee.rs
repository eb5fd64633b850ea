use crate::{
    auth::auth::AuthUser,
    error::PayrollError,
    model::page::PageRequest,
    model::employee::{Employee, EmployeeChanges, NewEmployee},
    store::EmployeeDirectory,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "first name", value_type = String)]
    pub first_name: String,
    #[schema(example = "last name", value_type = String)]
    pub last_name: String,
    #[schema(example = "john@email.com", format = "email", value_type = String)]
    pub email: String,
    #[schema(example = "Engineering", value_type = String)]
    pub department: String,
    #[schema(example = "Backend Developer", value_type = String)]
    pub position: String,
    #[schema(example = 5000.0, value_type = f64)]
    pub salary: Decimal,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
    #[schema(example = "active", value_type = Option<String>)]
    pub status: Option<String>,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct UpdateEmployee {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[schema(format = "email")]
    pub email: Option<String>,
    #[schema(example = "Research")]
    pub department: Option<String>,
    pub position: Option<String>,
    #[schema(example = 5500.0, value_type = Option<f64>)]
    pub salary: Option<Decimal>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub hire_date: Option<NaiveDate>,
    #[schema(example = "on_leave")]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Exact department name
    pub department: Option<String>,
    pub status: Option<String>,
    /// Search by name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: u64,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created successfully", body = Employee),
        (status = 400, description = "Missing field or email already in use", body = Object, example = json!({
            "message": "department must not be empty"
        })),
        (status = 403, description = "Admin or manager only")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    directory: web::Data<Arc<dyn EmployeeDirectory>>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;

    let new = NewEmployee::new(
        &payload.first_name,
        &payload.last_name,
        &payload.email,
        &payload.department,
        &payload.position,
        payload.salary,
        payload.hire_date,
        payload.status.as_deref(),
    )?;

    let employee = directory.insert(new).await?;
    info!(employee_id = employee.id, user_id = auth.user_id, "Employee created");

    Ok(HttpResponse::Created().json(employee))
}

/// Update Employee
///
/// Payroll summaries group by the department an employee has at the time
/// of the query, so a department change moves all of their payroll.
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    request_body = UpdateEmployee,
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Invalid field or email already in use"),
        (status = 403, description = "Admin or manager only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    directory: web::Data<Arc<dyn EmployeeDirectory>>,
    path: web::Path<u64>,
    body: web::Json<UpdateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_admin()?;
    let employee_id = path.into_inner();

    let changes = EmployeeChanges::new(
        body.first_name.as_deref(),
        body.last_name.as_deref(),
        body.email.as_deref(),
        body.department.as_deref(),
        body.position.as_deref(),
        body.salary,
        body.hire_date,
        body.status.as_deref(),
    )?;

    let employee = directory.update(employee_id, &changes).await?;
    info!(employee_id, user_id = auth.user_id, "Employee updated");

    Ok(HttpResponse::Ok().json(employee))
}

fn matches_query(employee: &Employee, query: &EmployeeQuery) -> bool {
    if let Some(department) = &query.department {
        if &employee.department != department {
            return false;
        }
    }
    if let Some(status) = &query.status {
        if &employee.status != status {
            return false;
        }
    }
    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        let hit = [&employee.first_name, &employee.last_name, &employee.email]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }
    true
}

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    _auth: AuthUser,
    directory: web::Data<Arc<dyn EmployeeDirectory>>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let page = PageRequest::new(query.page, query.per_page, 20);

    let matching: Vec<Employee> = directory
        .list()
        .await?
        .into_iter()
        .filter(|e| matches_query(e, &query))
        .collect();
    let total = matching.len() as u64;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: page.slice(matching),
        page: page.page(),
        per_page: page.per_page(),
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee 1 not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    _auth: AuthUser,
    directory: web::Data<Arc<dyn EmployeeDirectory>>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id: u64 = path.into_inner();

    let employee = directory
        .find_by_id(employee_id)
        .await?
        .ok_or(PayrollError::EmployeeNotFound(employee_id))?;

    Ok(HttpResponse::Ok().json(employee))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{bearer, test_app};
    use crate::model::role::Role;
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    fn new_hire() -> Value {
        json!({
            "first_name": "Linus",
            "last_name": "Tester",
            "email": "Linus@Example.com",
            "department": "Platform",
            "position": "SRE",
            "salary": 4200,
            "hire_date": "2024-02-01"
        })
    }

    #[actix_web::test]
    async fn managers_create_employees() {
        let app = test_app!();

        let req = test::TestRequest::post()
            .uri("/api/employee")
            .insert_header(("Authorization", bearer(Role::Manager, None)))
            .set_json(new_hire())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["id"], 3);
        assert_eq!(body["email"], "linus@example.com");
        assert_eq!(body["status"], "active");

        let req = test::TestRequest::post()
            .uri("/api/employee")
            .insert_header(("Authorization", bearer(Role::Employee, Some(1))))
            .set_json(new_hire())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn lists_with_search_and_fetches_by_id() {
        let app = test_app!();

        let req = test::TestRequest::get()
            .uri("/api/employee?search=grace")
            .insert_header(("Authorization", bearer(Role::Admin, None)))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["data"][0]["department"], "Sales");

        let req = test::TestRequest::get()
            .uri("/api/employee/1")
            .insert_header(("Authorization", bearer(Role::Admin, None)))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["first_name"], "Ada");

        let req = test::TestRequest::get()
            .uri("/api/employee/42")
            .insert_header(("Authorization", bearer(Role::Admin, None)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn department_move_regroups_payroll_summary() {
        let app = test_app!();

        let req = test::TestRequest::post()
            .uri("/api/payroll")
            .insert_header(("Authorization", bearer(Role::Admin, None)))
            .set_json(json!({ "employee_id": 1, "month": 3, "year": 2024, "base_salary": 4000 }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::put()
            .uri("/api/employee/1")
            .insert_header(("Authorization", bearer(Role::Manager, None)))
            .set_json(json!({ "department": " Research " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["department"], "Research");
        assert_eq!(body["first_name"], "Ada");

        let req = test::TestRequest::get()
            .uri("/api/payroll/summary")
            .insert_header(("Authorization", bearer(Role::Manager, None)))
            .to_request();
        let summary: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(summary["by_department"]["Research"]["count"], 1);
        assert!(summary["by_department"].get("Engineering").is_none());
    }

    #[actix_web::test]
    async fn update_checks_role_target_and_email() {
        let app = test_app!();

        let req = test::TestRequest::put()
            .uri("/api/employee/1")
            .insert_header(("Authorization", bearer(Role::Employee, Some(1))))
            .set_json(json!({ "department": "Research" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::put()
            .uri("/api/employee/42")
            .insert_header(("Authorization", bearer(Role::Admin, None)))
            .set_json(json!({ "department": "Research" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::put()
            .uri("/api/employee/1")
            .insert_header(("Authorization", bearer(Role::Admin, None)))
            .set_json(json!({ "email": "grace@example.com" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri("/api/employee/1")
            .insert_header(("Authorization", bearer(Role::Admin, None)))
            .set_json(json!({}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
