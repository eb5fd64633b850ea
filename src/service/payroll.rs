use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{info, instrument, warn};

use crate::auth::auth::AuthUser;
use crate::auth::policy::{PayrollAction, authorize};
use crate::error::PayrollError;
use crate::model::employee::{Employee, EmployeeBrief};
use crate::model::page::PageRequest;
use crate::model::payroll::{
    FieldsPatch, NewPayroll, PayrollChange, PayrollFilter, PayrollRecord, PayrollView, StatusPatch,
};
use crate::model::summary::PayrollSummary;
use crate::store::{EmployeeDirectory, PayrollStore};

type Result<T> = std::result::Result<T, PayrollError>;

/// Payroll operations behind the HTTP handlers.
///
/// Every operation checks the access policy first, then touches storage.
/// Mutations hand the store a change that re-derives totals before it is
/// written.
#[derive(Clone)]
pub struct PayrollService {
    store: Arc<dyn PayrollStore>,
    directory: Arc<dyn EmployeeDirectory>,
}

fn flag_negative_net(record: &PayrollRecord) {
    if record.has_negative_net() {
        warn!(
            payroll_id = record.id,
            employee_id = record.employee_id,
            net_salary = %record.net_salary,
            "Payroll net salary is negative"
        );
    }
}

impl PayrollService {
    pub fn new(store: Arc<dyn PayrollStore>, directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self { store, directory }
    }

    #[instrument(
        name = "payroll_create",
        skip(self, caller, new),
        fields(user_id = caller.user_id, employee_id = new.employee_id)
    )]
    pub async fn create_payroll(&self, caller: &AuthUser, new: NewPayroll) -> Result<PayrollRecord> {
        authorize(caller, PayrollAction::Create)?;

        if self.directory.find_by_id(new.employee_id).await?.is_none() {
            info!("Employee not found");
            return Err(PayrollError::EmployeeNotFound(new.employee_id));
        }

        let record = new.into_record(caller.user_id, Utc::now())?;
        let record = self.store.insert(record).await?;
        flag_negative_net(&record);

        info!(payroll_id = record.id, "Payroll created");
        Ok(record)
    }

    #[instrument(name = "payroll_update_status", skip(self, caller, patch), fields(user_id = caller.user_id))]
    pub async fn update_payroll_status(
        &self,
        caller: &AuthUser,
        id: u64,
        patch: StatusPatch,
    ) -> Result<PayrollView> {
        authorize(caller, PayrollAction::UpdateStatus)?;

        let record = self
            .store
            .update(id, &PayrollChange::Status(patch), caller.user_id)
            .await?;
        info!(status = %record.status, "Payroll status updated");

        self.with_employee(record).await
    }

    #[instrument(name = "payroll_update_fields", skip(self, caller, patch), fields(user_id = caller.user_id))]
    pub async fn update_payroll_fields(
        &self,
        caller: &AuthUser,
        id: u64,
        patch: FieldsPatch,
    ) -> Result<PayrollView> {
        authorize(caller, PayrollAction::UpdateFields)?;

        let record = self
            .store
            .update(id, &PayrollChange::Fields(patch), caller.user_id)
            .await?;
        flag_negative_net(&record);
        info!("Payroll updated");

        self.with_employee(record).await
    }

    #[instrument(name = "payroll_for_employee", skip(self, caller), fields(user_id = caller.user_id))]
    pub async fn get_payrolls_for_employee(
        &self,
        caller: &AuthUser,
        employee_id: u64,
    ) -> Result<Vec<PayrollView>> {
        authorize(caller, PayrollAction::ReadEmployee(employee_id))?;

        let records = self.store.find_by_employee(employee_id).await?;
        let brief = if records.is_empty() {
            None
        } else {
            self.directory
                .find_by_id(employee_id)
                .await?
                .map(|e| EmployeeBrief::from(&e))
        };

        Ok(records
            .into_iter()
            .map(|payroll| PayrollView {
                payroll,
                employee: brief.clone(),
            })
            .collect())
    }

    #[instrument(name = "payroll_get", skip(self, caller), fields(user_id = caller.user_id))]
    pub async fn get_payroll(&self, caller: &AuthUser, id: u64) -> Result<PayrollView> {
        authorize(caller, PayrollAction::ReadAll)?;

        let record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(PayrollError::PayrollNotFound(id))?;

        self.with_employee(record).await
    }

    /// One page of the filtered records, with the total number that match.
    /// Only employees on the page are looked up.
    #[instrument(name = "payroll_list", skip(self, caller), fields(user_id = caller.user_id))]
    pub async fn list_payrolls(
        &self,
        caller: &AuthUser,
        filter: PayrollFilter,
        page: PageRequest,
    ) -> Result<(Vec<PayrollView>, u64)> {
        authorize(caller, PayrollAction::ReadAll)?;

        let found = self.store.find_page(filter, page).await?;
        let employees = self.resolve_employees(&found.records).await?;

        let views = found
            .records
            .into_iter()
            .map(|payroll| PayrollView {
                employee: employees.get(&payroll.employee_id).map(EmployeeBrief::from),
                payroll,
            })
            .collect();
        Ok((views, found.total))
    }

    /// Totals over the filtered records, grouped by the department each
    /// employee belongs to right now.
    #[instrument(name = "payroll_summary", skip(self, caller), fields(user_id = caller.user_id))]
    pub async fn get_summary(
        &self,
        caller: &AuthUser,
        filter: PayrollFilter,
    ) -> Result<PayrollSummary> {
        authorize(caller, PayrollAction::Summarize)?;

        let records = self.store.find_all(filter).await?;
        let departments: HashMap<u64, String> = self
            .resolve_employees(&records)
            .await?
            .into_iter()
            .map(|(id, e)| (id, e.department))
            .collect();

        let summary = PayrollSummary::fold(&records, &departments)?;
        info!(
            records = summary.total_employees,
            departments = summary.by_department.len(),
            "Payroll summary generated"
        );
        Ok(summary)
    }

    async fn with_employee(&self, payroll: PayrollRecord) -> Result<PayrollView> {
        let employee = self
            .directory
            .find_by_id(payroll.employee_id)
            .await?
            .map(|e| EmployeeBrief::from(&e));

        Ok(PayrollView { payroll, employee })
    }

    /// Look up each distinct employee referenced by `records` once.
    async fn resolve_employees(&self, records: &[PayrollRecord]) -> Result<HashMap<u64, Employee>> {
        let ids: BTreeSet<u64> = records.iter().map(|r| r.employee_id).collect();
        let lookups = ids.iter().map(|id| self.directory.find_by_id(*id));

        let found = try_join_all(lookups).await?;
        Ok(found
            .into_iter()
            .flatten()
            .map(|e| (e.id, e))
            .collect())
    }
}
