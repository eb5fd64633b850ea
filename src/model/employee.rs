use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::PayrollError;
use crate::model::payroll::validate_money;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "department": "Engineering",
        "position": "Backend Developer",
        "salary": 5000,
        "hire_date": "2024-01-01",
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    /// Free-form department name; payroll summaries group by it verbatim.
    #[schema(example = "Engineering")]
    pub department: String,

    #[schema(example = "Backend Developer")]
    pub position: String,

    #[schema(example = 5000.0, value_type = f64)]
    pub salary: Decimal,

    #[schema(
        example = "2024-01-01",
        value_type = String,
        format = "date"
    )]
    pub hire_date: NaiveDate,

    #[schema(example = "active")]
    pub status: String,
}

/// Display fields attached to payroll records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmployeeBrief {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&Employee> for EmployeeBrief {
    fn from(e: &Employee) -> Self {
        Self {
            id: e.id,
            first_name: e.first_name.clone(),
            last_name: e.last_name.clone(),
            email: e.email.clone(),
        }
    }
}

pub const EMPLOYEE_STATUSES: [&str; 3] = ["active", "on_leave", "terminated"];

/// Employee fields accepted on create. The directory assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    pub position: String,
    pub salary: Decimal,
    pub hire_date: NaiveDate,
    pub status: String,
}

fn required(field: &str, value: &str) -> Result<String, PayrollError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PayrollError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn valid_email(email: &str) -> Result<String, PayrollError> {
    let email = required("email", email)?.to_lowercase();
    if !email.contains('@') {
        return Err(PayrollError::validation("email must be a valid address"));
    }
    Ok(email)
}

fn valid_status(status: &str) -> Result<String, PayrollError> {
    if !EMPLOYEE_STATUSES.contains(&status) {
        return Err(PayrollError::validation(format!(
            "Invalid status '{status}'. Allowed: active, on_leave, terminated"
        )));
    }
    Ok(status.to_string())
}

impl NewEmployee {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        first_name: &str,
        last_name: &str,
        email: &str,
        department: &str,
        position: &str,
        salary: Decimal,
        hire_date: NaiveDate,
        status: Option<&str>,
    ) -> Result<Self, PayrollError> {
        Ok(Self {
            first_name: required("first_name", first_name)?,
            last_name: required("last_name", last_name)?,
            email: valid_email(email)?,
            department: required("department", department)?,
            position: required("position", position)?,
            salary: validate_money("salary", salary)?,
            hire_date,
            status: valid_status(status.unwrap_or("active"))?,
        })
    }

    pub fn into_employee(self, id: u64) -> Employee {
        Employee {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            department: self.department,
            position: self.position,
            salary: self.salary,
            hire_date: self.hire_date,
            status: self.status,
        }
    }
}

/// A partial employee update. Present fields get the same checks as on create.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub salary: Option<Decimal>,
    pub hire_date: Option<NaiveDate>,
    pub status: Option<String>,
}

impl EmployeeChanges {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        first_name: Option<&str>,
        last_name: Option<&str>,
        email: Option<&str>,
        department: Option<&str>,
        position: Option<&str>,
        salary: Option<Decimal>,
        hire_date: Option<NaiveDate>,
        status: Option<&str>,
    ) -> Result<Self, PayrollError> {
        let changes = Self {
            first_name: first_name.map(|v| required("first_name", v)).transpose()?,
            last_name: last_name.map(|v| required("last_name", v)).transpose()?,
            email: email.map(valid_email).transpose()?,
            department: department.map(|v| required("department", v)).transpose()?,
            position: position.map(|v| required("position", v)).transpose()?,
            salary: salary.map(|v| validate_money("salary", v)).transpose()?,
            hire_date,
            status: status.map(valid_status).transpose()?,
        };
        if changes == Self::default() {
            return Err(PayrollError::validation("No fields provided for update"));
        }
        Ok(changes)
    }
}

impl Employee {
    pub fn apply(mut self, changes: &EmployeeChanges) -> Self {
        if let Some(v) = &changes.first_name {
            self.first_name = v.clone();
        }
        if let Some(v) = &changes.last_name {
            self.last_name = v.clone();
        }
        if let Some(v) = &changes.email {
            self.email = v.clone();
        }
        if let Some(v) = &changes.department {
            self.department = v.clone();
        }
        if let Some(v) = &changes.position {
            self.position = v.clone();
        }
        if let Some(v) = changes.salary {
            self.salary = v;
        }
        if let Some(v) = changes.hire_date {
            self.hire_date = v;
        }
        if let Some(v) = &changes.status {
            self.status = v.clone();
        }
        self
    }
}
