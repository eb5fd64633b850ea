use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery, UpdateEmployee};
use crate::api::payroll::{
    CreatePayroll, PaginatedPayrollResponse, PayrollQuery, SummaryQuery, UpdatePayroll,
    UpdatePayrollStatus,
};
use crate::model::employee::{Employee, EmployeeBrief};
use crate::model::payroll::{
    DeductionEntry, DeductionInput, DeductionKind, DeductionLedger, PaymentMethod, PayrollRecord,
    PayrollStatus, PayrollView,
};
use crate::model::summary::{DepartmentTotals, PayrollSummary};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payroll API",
        version = "1.0.0",
        description = r#"
## Payroll

Monthly payroll records for employees: base salary, bonus and itemised
deductions, with the net salary always derived on the server.

### 🔹 Key Features
- **Payroll Management**
  - Create one payroll entry per employee and month
  - Update amounts or move an entry through pending, approved and paid
  - Per-department totals for any month or year
- **Employee Directory**
  - Create, list and view the employees payroll is issued to

### 🔐 Security
Every `/api` endpoint requires a **JWT Bearer** access token.
Admins and managers see all payroll, employees only their own.

### 📦 Response Format
- Money amounts are JSON numbers
- Pagination supported for list endpoints
"#,
    ),
    paths(
        crate::api::health::health,

        crate::api::payroll::create_payroll,
        crate::api::payroll::update_payroll,
        crate::api::payroll::update_payroll_status,
        crate::api::payroll::get_payroll,
        crate::api::payroll::employee_payrolls,
        crate::api::payroll::list_payrolls,
        crate::api::payroll::payroll_summary,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::list_employees
    ),
    components(
        schemas(
            CreatePayroll,
            UpdatePayroll,
            UpdatePayrollStatus,
            PayrollQuery,
            SummaryQuery,
            PaginatedPayrollResponse,
            PayrollRecord,
            PayrollView,
            DeductionInput,
            DeductionEntry,
            DeductionLedger,
            DeductionKind,
            PayrollStatus,
            PaymentMethod,
            PayrollSummary,
            DepartmentTotals,
            Employee,
            EmployeeBrief,
            CreateEmployee,
            UpdateEmployee,
            EmployeeQuery,
            EmployeeListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Payroll", description = "Payroll management APIs"),
        (name = "Employee", description = "Employee directory APIs"),
        (name = "Health", description = "Liveness check"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_payroll_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/payroll"));
        assert!(doc.paths.paths.contains_key("/api/payroll/summary"));
        assert!(doc.paths.paths.contains_key("/api/payroll/{payroll_id}/status"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("PayrollSummary"));
    }
}
