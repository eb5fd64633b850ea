use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::PayrollError;
use crate::model::payroll::PayrollRecord;

/// Department key for records whose employee no longer resolves.
pub const UNASSIGNED_DEPARTMENT: &str = "unassigned";

#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
pub struct DepartmentTotals {
    pub count: u64,
    #[schema(value_type = f64)]
    pub total_base_salary: Decimal,
    #[schema(value_type = f64)]
    pub total_bonus: Decimal,
    #[schema(value_type = f64)]
    pub total_deductions: Decimal,
    #[schema(value_type = f64)]
    pub total_net_salary: Decimal,
}

fn accumulate(field: &str, total: Decimal, amount: Decimal) -> Result<Decimal, PayrollError> {
    total
        .checked_add(amount)
        .ok_or_else(|| PayrollError::Storage(format!("summary {field} overflowed")))
}

impl DepartmentTotals {
    fn add(&mut self, record: &PayrollRecord) -> Result<(), PayrollError> {
        self.total_base_salary =
            accumulate("total_base_salary", self.total_base_salary, record.base_salary)?;
        self.total_bonus = accumulate("total_bonus", self.total_bonus, record.bonus)?;
        self.total_deductions =
            accumulate("total_deductions", self.total_deductions, record.total_deductions)?;
        self.total_net_salary =
            accumulate("total_net_salary", self.total_net_salary, record.net_salary)?;
        self.count += 1;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "total_employees": 3,
    "total_base_salary": 11000,
    "total_bonus": 500,
    "total_deductions": 1800,
    "total_net_salary": 9700,
    "by_department": {
        "Engineering": {
            "count": 2,
            "total_base_salary": 8500,
            "total_bonus": 500,
            "total_deductions": 1300,
            "total_net_salary": 7700
        },
        "Sales": {
            "count": 1,
            "total_base_salary": 2500,
            "total_bonus": 0,
            "total_deductions": 500,
            "total_net_salary": 2000
        }
    }
}))]
pub struct PayrollSummary {
    /// Number of payroll records, not distinct employees.
    pub total_employees: u64,
    #[schema(value_type = f64)]
    pub total_base_salary: Decimal,
    #[schema(value_type = f64)]
    pub total_bonus: Decimal,
    #[schema(value_type = f64)]
    pub total_deductions: Decimal,
    #[schema(value_type = f64)]
    pub total_net_salary: Decimal,
    pub by_department: BTreeMap<String, DepartmentTotals>,
}

impl PayrollSummary {
    /// Fold records into overall and per-department totals.
    ///
    /// `departments` maps employee id to the department the directory
    /// reports; department names are used as given.
    pub fn fold(
        records: &[PayrollRecord],
        departments: &HashMap<u64, String>,
    ) -> Result<Self, PayrollError> {
        let mut overall = DepartmentTotals::default();
        let mut by_department: BTreeMap<String, DepartmentTotals> = BTreeMap::new();

        for record in records {
            overall.add(record)?;

            let department = departments
                .get(&record.employee_id)
                .map(String::as_str)
                .unwrap_or(UNASSIGNED_DEPARTMENT);
            by_department
                .entry(department.to_string())
                .or_default()
                .add(record)?;
        }

        Ok(Self {
            total_employees: overall.count,
            total_base_salary: overall.total_base_salary,
            total_bonus: overall.total_bonus,
            total_deductions: overall.total_deductions,
            total_net_salary: overall.total_net_salary,
            by_department,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::payroll::{DeductionInput, NewPayroll};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn record(employee_id: u64, month: u8, base: Decimal, tax: Decimal) -> PayrollRecord {
        NewPayroll::new(
            employee_id,
            month,
            2024,
            base,
            None,
            vec![DeductionInput {
                kind: "tax".into(),
                amount: tax,
                description: None,
            }],
        )
        .unwrap()
        .into_record(1, Utc::now())
        .unwrap()
    }

    fn departments(pairs: &[(u64, &str)]) -> HashMap<u64, String> {
        pairs.iter().map(|(id, d)| (*id, d.to_string())).collect()
    }

    #[test]
    fn groups_by_department_and_totals_match() {
        let records = vec![
            record(1, 3, dec!(5500), dec!(800)),
            record(2, 3, dec!(3500), dec!(500)),
            record(3, 3, dec!(2500), dec!(500)),
        ];
        let summary = PayrollSummary::fold(
            &records,
            &departments(&[(1, "Engineering"), (2, "Engineering"), (3, "Sales")]),
        )
        .unwrap();

        assert_eq!(summary.total_employees, 3);
        assert_eq!(summary.total_net_salary, dec!(9700));
        assert_eq!(summary.by_department["Engineering"].count, 2);
        assert_eq!(summary.by_department["Engineering"].total_net_salary, dec!(7700));
        assert_eq!(summary.by_department["Sales"].count, 1);

        let dept_net: Decimal = summary
            .by_department
            .values()
            .map(|d| d.total_net_salary)
            .sum();
        let dept_count: u64 = summary.by_department.values().map(|d| d.count).sum();
        assert_eq!(dept_net, summary.total_net_salary);
        assert_eq!(dept_count, summary.total_employees);
    }

    #[test]
    fn counts_records_not_distinct_employees() {
        let records = vec![record(1, 3, dec!(1000), dec!(0)), record(1, 4, dec!(1000), dec!(0))];
        let summary = PayrollSummary::fold(&records, &departments(&[(1, "Ops")])).unwrap();
        assert_eq!(summary.total_employees, 2);
        assert_eq!(summary.by_department["Ops"].count, 2);
    }

    #[test]
    fn department_names_are_not_normalized() {
        let records = vec![record(1, 3, dec!(1000), dec!(0)), record(2, 3, dec!(1000), dec!(0))];
        let summary = PayrollSummary::fold(
            &records,
            &departments(&[(1, "Sales"), (2, "sales ")]),
        )
        .unwrap();
        assert_eq!(summary.by_department.len(), 2);
    }

    #[test]
    fn unresolved_employees_fall_into_unassigned() {
        let records = vec![record(9, 3, dec!(1000), dec!(100))];
        let summary = PayrollSummary::fold(&records, &HashMap::new()).unwrap();
        assert_eq!(summary.by_department[UNASSIGNED_DEPARTMENT].count, 1);
        assert_eq!(summary.total_net_salary, dec!(900));
    }

    #[test]
    fn empty_input_yields_zero_summary() {
        let summary = PayrollSummary::fold(&[], &HashMap::new()).unwrap();
        assert_eq!(summary, PayrollSummary::default());
    }

    #[test]
    fn overflowing_totals_are_an_error() {
        let mut huge = record(1, 3, dec!(1000), dec!(0));
        huge.base_salary = Decimal::MAX;
        let records = vec![huge.clone(), huge];

        let err = PayrollSummary::fold(&records, &HashMap::new()).unwrap_err();
        assert!(matches!(err, PayrollError::Storage(_)));
    }
}
