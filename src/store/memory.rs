//! In-process stores, selected with `STORAGE_BACKEND=memory` and used by tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{EmployeeDirectory, PayrollPage, PayrollStore, Result};
use crate::error::PayrollError;
use crate::model::employee::{Employee, EmployeeChanges, NewEmployee};
use crate::model::page::PageRequest;
use crate::model::payroll::{PayPeriod, PayrollChange, PayrollFilter, PayrollRecord};

fn poisoned<T>(_: T) -> PayrollError {
    PayrollError::Storage("in-memory store lock poisoned".to_string())
}

#[derive(Default)]
struct PayrollTable {
    next_id: u64,
    records: BTreeMap<u64, PayrollRecord>,
    by_key: HashMap<(u64, PayPeriod), u64>,
}

/// Payroll records kept in memory behind one lock.
///
/// The write lock is held across the duplicate check and the insert, which
/// gives the same guarantee as a unique index.
#[derive(Default)]
pub struct InMemoryPayrollStore {
    table: RwLock<PayrollTable>,
}

impl InMemoryPayrollStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, PayrollTable>> {
        self.table.read().map_err(poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, PayrollTable>> {
        self.table.write().map_err(poisoned)
    }
}

#[async_trait]
impl PayrollStore for InMemoryPayrollStore {
    async fn insert(&self, mut record: PayrollRecord) -> Result<PayrollRecord> {
        let mut table = self.write()?;

        let key = (record.employee_id, record.period());
        if table.by_key.contains_key(&key) {
            return Err(PayrollError::Duplicate {
                employee_id: record.employee_id,
                month: record.month,
                year: record.year,
            });
        }

        table.next_id += 1;
        record.id = table.next_id;
        table.by_key.insert(key, record.id);
        table.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<PayrollRecord>> {
        Ok(self.read()?.records.get(&id).cloned())
    }

    async fn find_by_employee(&self, employee_id: u64) -> Result<Vec<PayrollRecord>> {
        let table = self.read()?;
        let mut records: Vec<PayrollRecord> = table
            .records
            .values()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.period().cmp(&a.period()).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn find_all(&self, filter: PayrollFilter) -> Result<Vec<PayrollRecord>> {
        let table = self.read()?;
        let mut records: Vec<PayrollRecord> = table
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.period().cmp(&a.period()).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn find_page(&self, filter: PayrollFilter, page: PageRequest) -> Result<PayrollPage> {
        let records = self.find_all(filter).await?;
        Ok(PayrollPage {
            total: records.len() as u64,
            records: page.slice(records),
        })
    }

    async fn update(
        &self,
        id: u64,
        change: &PayrollChange,
        processed_by: u64,
    ) -> Result<PayrollRecord> {
        let mut table = self.write()?;
        let current = table
            .records
            .get(&id)
            .cloned()
            .ok_or(PayrollError::PayrollNotFound(id))?;

        let updated = current.apply(change, processed_by, Utc::now())?;
        table.records.insert(id, updated.clone());
        Ok(updated)
    }
}

#[derive(Default)]
struct EmployeeTable {
    next_id: u64,
    employees: BTreeMap<u64, Employee>,
}

#[derive(Default)]
pub struct InMemoryEmployeeDirectory {
    table: RwLock<EmployeeTable>,
}

impl InMemoryEmployeeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace an employee under a fixed id.
    #[cfg(test)]
    pub fn put(&self, employee: Employee) -> Result<()> {
        let mut table = self.table.write().map_err(poisoned)?;
        table.next_id = table.next_id.max(employee.id);
        table.employees.insert(employee.id, employee);
        Ok(())
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryEmployeeDirectory {
    async fn find_by_id(&self, id: u64) -> Result<Option<Employee>> {
        let table = self.table.read().map_err(poisoned)?;
        Ok(table.employees.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Employee>> {
        let table = self.table.read().map_err(poisoned)?;
        Ok(table.employees.values().rev().cloned().collect())
    }

    async fn insert(&self, employee: NewEmployee) -> Result<Employee> {
        let mut table = self.table.write().map_err(poisoned)?;
        if table.employees.values().any(|e| e.email == employee.email) {
            return Err(PayrollError::validation(format!(
                "Email {} is already in use",
                employee.email
            )));
        }

        table.next_id += 1;
        let employee = employee.into_employee(table.next_id);
        table.employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    async fn update(&self, id: u64, changes: &EmployeeChanges) -> Result<Employee> {
        let mut table = self.table.write().map_err(poisoned)?;
        let current = table
            .employees
            .get(&id)
            .cloned()
            .ok_or(PayrollError::EmployeeNotFound(id))?;

        if let Some(email) = &changes.email {
            if table.employees.values().any(|e| e.id != id && &e.email == email) {
                return Err(PayrollError::validation(format!(
                    "Email {email} is already in use"
                )));
            }
        }

        let updated = current.apply(changes);
        table.employees.insert(id, updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::payroll::{FieldsPatch, NewPayroll, StatusPatch};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn record(employee_id: u64, month: u8, year: u16) -> PayrollRecord {
        NewPayroll::new(employee_id, month, year, dec!(1000), None, vec![])
            .unwrap()
            .into_record(1, Utc::now())
            .unwrap()
    }

    #[actix_web::test]
    async fn assigns_ids_and_rejects_duplicate_keys() {
        let store = InMemoryPayrollStore::new();

        let first = store.insert(record(1, 3, 2024)).await.unwrap();
        assert_eq!(first.id, 1);

        let err = store.insert(record(1, 3, 2024)).await.unwrap_err();
        assert_eq!(
            err,
            PayrollError::Duplicate {
                employee_id: 1,
                month: 3,
                year: 2024
            }
        );

        let second = store.insert(record(1, 4, 2024)).await.unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(store.find_by_employee(1).await.unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn concurrent_inserts_of_one_key_admit_exactly_one() {
        let store = Arc::new(InMemoryPayrollStore::new());

        let attempts = (0..8).map(|_| {
            let store = store.clone();
            async move { store.insert(record(5, 6, 2024)).await }
        });
        let results = futures::future::join_all(attempts).await;

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let dup = results
            .iter()
            .filter(|r| matches!(r, Err(PayrollError::Duplicate { .. })))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(dup, 7);
        assert_eq!(store.find_all(PayrollFilter::default()).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn find_all_narrows_by_period() {
        let store = InMemoryPayrollStore::new();
        store.insert(record(1, 3, 2024)).await.unwrap();
        store.insert(record(2, 3, 2024)).await.unwrap();
        store.insert(record(1, 3, 2023)).await.unwrap();

        let march_2024 = store
            .find_all(PayrollFilter::new(Some(3), Some(2024)))
            .await
            .unwrap();
        assert_eq!(march_2024.len(), 2);

        let all_march = store.find_all(PayrollFilter::new(Some(3), None)).await.unwrap();
        assert_eq!(all_march.len(), 3);
    }

    #[actix_web::test]
    async fn find_page_returns_window_and_filtered_total() {
        let store = InMemoryPayrollStore::new();
        for month in 1..=5 {
            store.insert(record(1, month, 2024)).await.unwrap();
        }
        store.insert(record(1, 1, 2023)).await.unwrap();

        let page = store
            .find_page(PayrollFilter::new(None, Some(2024)), PageRequest::new(Some(2), Some(2), 10))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        let months: Vec<u8> = page.records.iter().map(|r| r.month).collect();
        assert_eq!(months, vec![3, 2]);
    }

    #[actix_web::test]
    async fn update_of_unknown_id_is_not_found() {
        let store = InMemoryPayrollStore::new();
        let change = PayrollChange::Status(StatusPatch::parse("approved", None, None).unwrap());
        assert_eq!(
            store.update(42, &change, 1).await.unwrap_err(),
            PayrollError::PayrollNotFound(42)
        );
    }

    #[actix_web::test]
    async fn overflowing_update_leaves_store_usable() {
        let store = InMemoryPayrollStore::new();
        let saved = store.insert(record(1, 3, 2024)).await.unwrap();

        let change = PayrollChange::Fields(FieldsPatch {
            base_salary: Some(dec!(50000000000000000000000000000)),
            bonus: Some(dec!(50000000000000000000000000000)),
            ..FieldsPatch::default()
        });
        let err = store.update(saved.id, &change, 1).await.unwrap_err();
        assert!(matches!(err, PayrollError::Validation(_)));

        assert_eq!(store.find_by_id(saved.id).await.unwrap(), Some(saved));
        assert!(store.insert(record(1, 4, 2024)).await.is_ok());
    }

    #[actix_web::test]
    async fn directory_assigns_ids_and_rejects_taken_email() {
        let directory = InMemoryEmployeeDirectory::new();
        let new = NewEmployee::new(
            "Ada",
            "Lovelace",
            "ada@example.com",
            "Engineering",
            "Analyst",
            dec!(4200),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            None,
        )
        .unwrap();

        let saved = directory.insert(new.clone()).await.unwrap();
        assert_eq!(saved.id, 1);
        assert!(directory.insert(new).await.is_err());

        let other = NewEmployee::new(
            "Grace",
            "Hopper",
            "grace@example.com",
            "Navy",
            "Admiral",
            dec!(5000),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            None,
        )
        .unwrap();
        directory.insert(other).await.unwrap();

        let taken = EmployeeChanges {
            email: Some("ada@example.com".into()),
            ..EmployeeChanges::default()
        };
        assert!(matches!(
            directory.update(2, &taken).await,
            Err(PayrollError::Validation(_))
        ));
        assert_eq!(
            directory.update(9, &taken).await.unwrap_err(),
            PayrollError::EmployeeNotFound(9)
        );

        let own_email = EmployeeChanges {
            email: Some("ada@example.com".into()),
            department: Some("Research".into()),
            ..EmployeeChanges::default()
        };
        assert_eq!(directory.update(1, &own_email).await.unwrap().department, "Research");
        assert_eq!(
            directory.find_by_id(1).await.unwrap().map(|e| e.department),
            Some("Research".to_string())
        );
    }
}
