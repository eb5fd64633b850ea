use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Failure of a payroll or employee directory operation.
///
/// The first four variants are domain outcomes and carry a message that is
/// safe to show to the caller. `Storage` wraps infrastructure failures; its
/// details are logged but never sent back over HTTP.
#[derive(Debug, Display, PartialEq)]
pub enum PayrollError {
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "Employee {} not found", _0)]
    EmployeeNotFound(u64),

    #[display(fmt = "Payroll entry {} not found", _0)]
    PayrollNotFound(u64),

    #[display(
        fmt = "Payroll entry already exists for employee {} in {:02}/{}",
        employee_id,
        month,
        year
    )]
    Duplicate {
        employee_id: u64,
        month: u8,
        year: u16,
    },

    #[display(fmt = "Not authorized to access this payroll")]
    Forbidden,

    #[display(fmt = "Storage failure: {}", _0)]
    Storage(String),
}

impl std::error::Error for PayrollError {}

impl PayrollError {
    pub fn validation(message: impl Into<String>) -> Self {
        PayrollError::Validation(message.into())
    }
}

impl From<sqlx::Error> for PayrollError {
    fn from(e: sqlx::Error) -> Self {
        PayrollError::Storage(e.to_string())
    }
}

impl ResponseError for PayrollError {
    fn status_code(&self) -> StatusCode {
        match self {
            PayrollError::Validation(_) => StatusCode::BAD_REQUEST,
            PayrollError::EmployeeNotFound(_) | PayrollError::PayrollNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            PayrollError::Duplicate { .. } => StatusCode::CONFLICT,
            PayrollError::Forbidden => StatusCode::FORBIDDEN,
            PayrollError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            PayrollError::Storage(detail) => {
                tracing::error!(error = %detail, "Storage failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_status_codes() {
        assert_eq!(
            PayrollError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PayrollError::EmployeeNotFound(7).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PayrollError::Duplicate {
                employee_id: 1,
                month: 3,
                year: 2024
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(PayrollError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            PayrollError::Storage("down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicate_message_names_the_period() {
        let err = PayrollError::Duplicate {
            employee_id: 12,
            month: 3,
            year: 2024,
        };
        assert_eq!(
            err.to_string(),
            "Payroll entry already exists for employee 12 in 03/2024"
        );
    }
}
