use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::model::page::PageRequest;
use crate::model::payroll::{
    DeductionInput, FieldsPatch, NewPayroll, PayrollFilter, PayrollRecord, PayrollView, StatusPatch,
};
use crate::model::summary::PayrollSummary;
use crate::service::PayrollService;

#[derive(Deserialize, ToSchema)]
pub struct CreatePayroll {
    #[schema(example = 1001)]
    pub employee_id: u64,

    #[schema(example = 3, minimum = 1, maximum = 12)]
    pub month: u8,

    #[schema(example = 2024, minimum = 2000)]
    pub year: u16,

    #[schema(example = 5000.0, value_type = f64)]
    pub base_salary: Decimal,

    #[schema(example = 500.0, value_type = Option<f64>)]
    pub bonus: Option<Decimal>,

    #[serde(default)]
    pub deductions: Vec<DeductionInput>,

    #[schema(example = "March payroll")]
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePayroll {
    #[schema(example = 5200.0, value_type = Option<f64>)]
    pub base_salary: Option<Decimal>,

    #[schema(example = 600.0, value_type = Option<f64>)]
    pub bonus: Option<Decimal>,

    /// Replaces the whole deduction list when present.
    pub deductions: Option<Vec<DeductionInput>>,

    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePayrollStatus {
    #[schema(example = "paid")]
    pub status: String,

    #[schema(example = "2024-03-31", value_type = Option<String>, format = "date")]
    pub payment_date: Option<NaiveDate>,

    #[schema(example = "bank_transfer")]
    pub payment_method: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PayrollQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,

    #[schema(example = 10)]
    pub per_page: Option<u32>,

    #[schema(example = 3)]
    pub month: Option<u8>,

    #[schema(example = 2024)]
    pub year: Option<u16>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct SummaryQuery {
    #[schema(example = 3)]
    pub month: Option<u8>,

    #[schema(example = 2024)]
    pub year: Option<u16>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedPayrollResponse {
    pub data: Vec<PayrollView>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

#[utoipa::path(
    post,
    path = "/api/payroll",
    request_body = CreatePayroll,
    responses(
        (status = 201, description = "Payroll created", body = PayrollRecord),
        (status = 400, description = "Invalid period, amount or deduction type"),
        (status = 401),
        (status = 403),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Payroll entry already exists for this month")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn create_payroll(
    auth: AuthUser,
    service: web::Data<PayrollService>,
    payload: web::Json<CreatePayroll>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    let new = NewPayroll::new(
        payload.employee_id,
        payload.month,
        payload.year,
        payload.base_salary,
        payload.bonus,
        payload.deductions,
    )?
    .with_notes(payload.notes);

    let record = service.create_payroll(&auth, new).await?;

    Ok(HttpResponse::Created().json(record))
}

#[utoipa::path(
    put,
    path = "/api/payroll/{payroll_id}",
    request_body = UpdatePayroll,
    params(
        ("payroll_id", description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll updated", body = PayrollView),
        (status = 400),
        (status = 403),
        (status = 404, description = "Payroll not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_payroll(
    auth: AuthUser,
    service: web::Data<PayrollService>,
    path: web::Path<u64>,
    body: web::Json<UpdatePayroll>,
) -> actix_web::Result<impl Responder> {
    let payroll_id = path.into_inner();
    let body = body.into_inner();

    let patch = FieldsPatch::new(body.base_salary, body.bonus, body.deductions, body.notes)?;
    let view = service.update_payroll_fields(&auth, payroll_id, patch).await?;

    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    patch,
    path = "/api/payroll/{payroll_id}/status",
    request_body = UpdatePayrollStatus,
    params(
        ("payroll_id", description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll status updated", body = PayrollView),
        (status = 400, description = "Unknown status or payment method"),
        (status = 403),
        (status = 404, description = "Payroll not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_payroll_status(
    auth: AuthUser,
    service: web::Data<PayrollService>,
    path: web::Path<u64>,
    body: web::Json<UpdatePayrollStatus>,
) -> actix_web::Result<impl Responder> {
    let payroll_id = path.into_inner();

    let patch = StatusPatch::parse(
        &body.status,
        body.payment_date,
        body.payment_method.as_deref(),
    )?;
    let view = service.update_payroll_status(&auth, payroll_id, patch).await?;

    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{payroll_id}",
    params(
        ("payroll_id", description = "Payroll ID")
    ),
    responses(
        (status = 200, body = PayrollView),
        (status = 403),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll(
    auth: AuthUser,
    service: web::Data<PayrollService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let view = service.get_payroll(&auth, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    get,
    path = "/api/payroll/employee/{employee_id}",
    params(
        ("employee_id", description = "Employee ID")
    ),
    responses(
        (status = 200, body = [PayrollView]),
        (status = 403, description = "Not authorized to view this payroll")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn employee_payrolls(
    auth: AuthUser,
    service: web::Data<PayrollService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let views = service
        .get_payrolls_for_employee(&auth, path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    get,
    path = "/api/payroll",
    params(PayrollQuery),
    responses(
        (status = 200, body = PaginatedPayrollResponse),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    auth: AuthUser,
    service: web::Data<PayrollService>,
    query: web::Query<PayrollQuery>,
) -> actix_web::Result<impl Responder> {
    let page = PageRequest::new(query.page, query.per_page, 10);

    let (data, total) = service
        .list_payrolls(&auth, PayrollFilter::new(query.month, query.year), page)
        .await?;

    Ok(HttpResponse::Ok().json(PaginatedPayrollResponse {
        data,
        page: page.page(),
        per_page: page.per_page(),
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/payroll/summary",
    params(SummaryQuery),
    responses(
        (status = 200, body = PayrollSummary),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn payroll_summary(
    auth: AuthUser,
    service: web::Data<PayrollService>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    let summary = service
        .get_summary(&auth, PayrollFilter::new(query.month, query.year))
        .await?;

    Ok(HttpResponse::Ok().json(summary))
}
