use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{MySqlPool, types::Json};
use tracing::{debug, error};

use super::{EmployeeDirectory, PayrollPage, PayrollStore, Result};
use crate::error::PayrollError;
use crate::model::employee::{Employee, EmployeeChanges, NewEmployee};
use crate::model::page::PageRequest;
use crate::model::payroll::{
    DeductionLedger, PaymentMethod, PayrollChange, PayrollFilter, PayrollRecord, PayrollStatus,
};

const PAYROLL_COLUMNS: &str = r#"
    id, employee_id, month, year, base_salary, bonus, deductions,
    total_deductions, net_salary, status, payment_date, payment_method,
    processed_by, notes, created_at, updated_at
"#;

#[derive(sqlx::FromRow)]
struct PayrollRow {
    id: u64,
    employee_id: u64,
    month: u8,
    year: u16,
    base_salary: Decimal,
    bonus: Decimal,
    deductions: Json<DeductionLedger>,
    total_deductions: Decimal,
    net_salary: Decimal,
    status: String,
    payment_date: Option<NaiveDate>,
    payment_method: String,
    processed_by: Option<u64>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PayrollRow> for PayrollRecord {
    type Error = PayrollError;

    fn try_from(row: PayrollRow) -> Result<Self> {
        let id = row.id;
        let corrupt = move |e: PayrollError| PayrollError::Storage(format!("payroll {id}: {e}"));

        Ok(PayrollRecord {
            id,
            employee_id: row.employee_id,
            month: row.month,
            year: row.year,
            base_salary: row.base_salary,
            bonus: row.bonus,
            deductions: row.deductions.0,
            total_deductions: row.total_deductions,
            net_salary: row.net_salary,
            status: PayrollStatus::parse(&row.status).map_err(corrupt)?,
            payment_date: row.payment_date,
            payment_method: PaymentMethod::parse(&row.payment_method).map_err(corrupt)?,
            processed_by: row.processed_by,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_records(rows: Vec<PayrollRow>) -> Result<Vec<PayrollRecord>> {
    rows.into_iter().map(PayrollRecord::try_from).collect()
}

/// `WHERE` clause for the set components of `filter`, binding month then year.
fn period_where(filter: &PayrollFilter) -> String {
    let mut conditions = Vec::new();
    if filter.month.is_some() {
        conditions.push("month = ?");
    }
    if filter.year.is_some() {
        conditions.push("year = ?");
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

/// Payroll records in the `payroll` table.
///
/// Uniqueness rests on the `uq_payroll_employee_period` index; updates lock
/// the row with `SELECT ... FOR UPDATE` inside a transaction.
#[derive(Clone)]
pub struct MySqlPayrollStore {
    pool: MySqlPool,
}

impl MySqlPayrollStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PayrollStore for MySqlPayrollStore {
    async fn insert(&self, mut record: PayrollRecord) -> Result<PayrollRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO payroll
                (employee_id, month, year, base_salary, bonus, deductions,
                 total_deductions, net_salary, status, payment_date, payment_method,
                 processed_by, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.employee_id)
        .bind(record.month)
        .bind(record.year)
        .bind(record.base_salary)
        .bind(record.bonus)
        .bind(Json(&record.deductions))
        .bind(record.total_deductions)
        .bind(record.net_salary)
        .bind(record.status.as_ref())
        .bind(record.payment_date)
        .bind(record.payment_method.as_ref())
        .bind(record.processed_by)
        .bind(&record.notes)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                record.id = done.last_insert_id();
                Ok(record)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(PayrollError::Duplicate {
                    employee_id: record.employee_id,
                    month: record.month,
                    year: record.year,
                })
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                Err(PayrollError::EmployeeNotFound(record.employee_id))
            }
            Err(e) => {
                error!(error = %e, employee_id = record.employee_id, "Failed to insert payroll");
                Err(e.into())
            }
        }
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<PayrollRecord>> {
        let sql = format!("SELECT {PAYROLL_COLUMNS} FROM payroll WHERE id = ?");
        let row = sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(PayrollRecord::try_from).transpose()
    }

    async fn find_by_employee(&self, employee_id: u64) -> Result<Vec<PayrollRecord>> {
        let sql = format!(
            "SELECT {PAYROLL_COLUMNS} FROM payroll WHERE employee_id = ? \
             ORDER BY year DESC, month DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;

        into_records(rows)
    }

    async fn find_all(&self, filter: PayrollFilter) -> Result<Vec<PayrollRecord>> {
        let sql = format!(
            "SELECT {PAYROLL_COLUMNS} FROM payroll {} \
             ORDER BY year DESC, month DESC, id DESC",
            period_where(&filter)
        );
        debug!(sql = %sql, ?filter, "Fetching payroll records");

        let mut query = sqlx::query_as::<_, PayrollRow>(&sql);
        if let Some(month) = filter.month {
            query = query.bind(month);
        }
        if let Some(year) = filter.year {
            query = query.bind(year);
        }

        into_records(query.fetch_all(&self.pool).await?)
    }

    async fn find_page(&self, filter: PayrollFilter, page: PageRequest) -> Result<PayrollPage> {
        let where_clause = period_where(&filter);

        // COUNT query
        let count_sql = format!("SELECT COUNT(*) FROM payroll {where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(month) = filter.month {
            count_query = count_query.bind(month);
        }
        if let Some(year) = filter.year {
            count_query = count_query.bind(year);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let sql = format!(
            "SELECT {PAYROLL_COLUMNS} FROM payroll {where_clause} \
             ORDER BY year DESC, month DESC, id DESC LIMIT ? OFFSET ?"
        );
        debug!(sql = %sql, ?filter, ?page, "Fetching payroll page");

        let mut query = sqlx::query_as::<_, PayrollRow>(&sql);
        if let Some(month) = filter.month {
            query = query.bind(month);
        }
        if let Some(year) = filter.year {
            query = query.bind(year);
        }
        let rows = query
            .bind(page.per_page())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(PayrollPage {
            records: into_records(rows)?,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn update(
        &self,
        id: u64,
        change: &PayrollChange,
        processed_by: u64,
    ) -> Result<PayrollRecord> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {PAYROLL_COLUMNS} FROM payroll WHERE id = ? FOR UPDATE");
        let current = match sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        {
            Some(row) => PayrollRecord::try_from(row)?,
            None => return Err(PayrollError::PayrollNotFound(id)),
        };

        let updated = current.apply(change, processed_by, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE payroll
            SET base_salary = ?, bonus = ?, deductions = ?, total_deductions = ?,
                net_salary = ?, status = ?, payment_date = ?, payment_method = ?,
                processed_by = ?, notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(updated.base_salary)
        .bind(updated.bonus)
        .bind(Json(&updated.deductions))
        .bind(updated.total_deductions)
        .bind(updated.net_salary)
        .bind(updated.status.as_ref())
        .bind(updated.payment_date)
        .bind(updated.payment_method.as_ref())
        .bind(updated.processed_by)
        .bind(&updated.notes)
        .bind(updated.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }
}

const EMPLOYEE_COLUMNS: &str =
    "id, first_name, last_name, email, department, position, salary, hire_date, status";

#[derive(Clone)]
pub struct MySqlEmployeeDirectory {
    pool: MySqlPool,
}

impl MySqlEmployeeDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeDirectory for MySqlEmployeeDirectory {
    async fn find_by_id(&self, id: u64) -> Result<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(employee)
    }

    async fn list(&self) -> Result<Vec<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY id DESC");
        let employees = sqlx::query_as::<_, Employee>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(employees)
    }

    async fn insert(&self, employee: NewEmployee) -> Result<Employee> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees
                (first_name, last_name, email, department, position, salary, hire_date, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.email)
        .bind(&employee.department)
        .bind(&employee.position)
        .bind(employee.salary)
        .bind(employee.hire_date)
        .bind(&employee.status)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(employee.into_employee(done.last_insert_id())),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                PayrollError::validation(format!("Email {} is already in use", employee.email)),
            ),
            Err(e) => {
                error!(error = %e, "Failed to create employee");
                Err(e.into())
            }
        }
    }

    async fn update(&self, id: u64, changes: &EmployeeChanges) -> Result<Employee> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ? FOR UPDATE");
        let current = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(PayrollError::EmployeeNotFound(id))?;

        let updated = current.apply(changes);

        let result = sqlx::query(
            r#"
            UPDATE employees
            SET first_name = ?, last_name = ?, email = ?, department = ?,
                position = ?, salary = ?, hire_date = ?, status = ?
            WHERE id = ?
            "#,
        )
        .bind(&updated.first_name)
        .bind(&updated.last_name)
        .bind(&updated.email)
        .bind(&updated.department)
        .bind(&updated.position)
        .bind(updated.salary)
        .bind(updated.hire_date)
        .bind(&updated.status)
        .bind(id)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {
                tx.commit().await?;
                Ok(updated)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                PayrollError::validation(format!("Email {} is already in use", updated.email)),
            ),
            Err(e) => {
                error!(error = %e, employee_id = id, "Failed to update employee");
                Err(e.into())
            }
        }
    }
}
