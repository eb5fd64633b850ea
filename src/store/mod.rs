//! Storage ports for payroll records and the employee directory.

use async_trait::async_trait;

use crate::error::PayrollError;
use crate::model::employee::{Employee, EmployeeChanges, NewEmployee};
use crate::model::page::PageRequest;
use crate::model::payroll::{PayrollChange, PayrollFilter, PayrollRecord};

pub mod memory;
pub mod mysql;

pub use memory::{InMemoryEmployeeDirectory, InMemoryPayrollStore};
pub use mysql::{MySqlEmployeeDirectory, MySqlPayrollStore};

pub type Result<T> = std::result::Result<T, PayrollError>;

/// One page of records plus the number of records matching the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollPage {
    pub records: Vec<PayrollRecord>,
    pub total: u64,
}

/// Persistence of payroll records.
///
/// The `(employee_id, month, year)` triple is unique. Implementations must
/// make the duplicate check and the insert one atomic step, and must apply
/// a change to a record while holding that record exclusively.
#[async_trait]
pub trait PayrollStore: Send + Sync {
    /// Persist an already derived record and return it with its new id.
    ///
    /// Fails with `Duplicate` when the key is taken.
    async fn insert(&self, record: PayrollRecord) -> Result<PayrollRecord>;

    async fn find_by_id(&self, id: u64) -> Result<Option<PayrollRecord>>;

    async fn find_by_employee(&self, employee_id: u64) -> Result<Vec<PayrollRecord>>;

    /// Every record in the filter, newest period first.
    async fn find_all(&self, filter: PayrollFilter) -> Result<Vec<PayrollRecord>>;

    /// Same order as `find_all`, but only the requested page is loaded.
    async fn find_page(&self, filter: PayrollFilter, page: PageRequest) -> Result<PayrollPage>;

    /// Apply `change` via `PayrollRecord::apply`, which re-derives totals,
    /// and persist the result. Fails with `PayrollNotFound` for unknown ids.
    async fn update(
        &self,
        id: u64,
        change: &PayrollChange,
        processed_by: u64,
    ) -> Result<PayrollRecord>;
}

/// Employee records, consulted by payroll for existence and department.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn find_by_id(&self, id: u64) -> Result<Option<Employee>>;

    async fn list(&self) -> Result<Vec<Employee>>;

    async fn insert(&self, employee: NewEmployee) -> Result<Employee>;

    /// Fails with `EmployeeNotFound` for unknown ids and with `Validation`
    /// when the new email belongs to another employee.
    async fn update(&self, id: u64, changes: &EmployeeChanges) -> Result<Employee>;
}
