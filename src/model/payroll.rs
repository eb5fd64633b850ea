use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::PayrollError;
use crate::model::employee::EmployeeBrief;

/// Earliest year a pay period may belong to.
pub const MIN_PAYROLL_YEAR: u16 = 2000;

/// Money is kept in cents.
pub const MONEY_SCALE: u32 = 2;

/// Largest magnitude a `DECIMAL(12,2)` money column holds: 9999999999.99.
pub const MAX_MONEY: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, MONEY_SCALE);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeductionKind {
    Tax,
    Insurance,
    Pension,
    Other,
}

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PayrollStatus {
    #[default]
    Pending,
    Approved,
    Paid,
}

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    BankTransfer,
    Check,
    Cash,
}

fn parse_enum<T: FromStr>(field: &str, value: &str, allowed: &str) -> Result<T, PayrollError> {
    T::from_str(value).map_err(|_| {
        PayrollError::validation(format!(
            "Invalid {field} '{value}'. Allowed: {allowed}"
        ))
    })
}

/// Check a submitted amount: not negative, whole cents, and within `MAX_MONEY`.
pub fn validate_money(field: &str, value: Decimal) -> Result<Decimal, PayrollError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(PayrollError::validation(format!(
            "{field} must not be negative"
        )));
    }
    if value.normalize().scale() > MONEY_SCALE {
        return Err(PayrollError::validation(format!(
            "{field} must have at most {MONEY_SCALE} decimal places"
        )));
    }
    if value > MAX_MONEY {
        return Err(PayrollError::validation(format!(
            "{field} must not exceed {MAX_MONEY}"
        )));
    }
    Ok(value)
}

/// A derived amount, `None` when the arithmetic overflowed.
fn derived_money(field: &str, value: Option<Decimal>) -> Result<Decimal, PayrollError> {
    value.filter(|v| v.abs() <= MAX_MONEY).ok_or_else(|| {
        PayrollError::validation(format!("{field} is out of range, limit is {MAX_MONEY}"))
    })
}

impl DeductionKind {
    pub fn parse(value: &str) -> Result<Self, PayrollError> {
        parse_enum("deduction type", value, "tax, insurance, pension, other")
    }
}

impl PayrollStatus {
    pub fn parse(value: &str) -> Result<Self, PayrollError> {
        parse_enum("status", value, "pending, approved, paid")
    }
}

impl PaymentMethod {
    pub fn parse(value: &str) -> Result<Self, PayrollError> {
        parse_enum("payment method", value, "bank_transfer, check, cash")
    }
}

/// A (month, year) pay period. Part of the payroll uniqueness key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PayPeriod {
    month: u8,
    year: u16,
}

impl PayPeriod {
    pub fn new(month: u8, year: u16) -> Result<Self, PayrollError> {
        if !(1..=12).contains(&month) {
            return Err(PayrollError::validation(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        if year < MIN_PAYROLL_YEAR {
            return Err(PayrollError::validation(format!(
                "year must be {MIN_PAYROLL_YEAR} or later, got {year}"
            )));
        }
        Ok(Self { month, year })
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn year(&self) -> u16 {
        self.year
    }
}

/// Deduction as submitted by a client, before validation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeductionInput {
    #[schema(example = "tax")]
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,

    #[schema(example = 600.0, value_type = f64)]
    pub amount: Decimal,

    #[schema(example = "Income tax", nullable = true)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeductionEntry {
    #[serde(rename = "type")]
    pub kind: DeductionKind,

    #[schema(example = 600.0, value_type = f64)]
    pub amount: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DeductionEntry {
    pub fn new(
        kind: DeductionKind,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Self, PayrollError> {
        Ok(Self {
            kind,
            amount: validate_money("deduction amount", amount)?,
            description,
        })
    }
}

impl TryFrom<DeductionInput> for DeductionEntry {
    type Error = PayrollError;

    fn try_from(input: DeductionInput) -> Result<Self, Self::Error> {
        DeductionEntry::new(
            DeductionKind::parse(&input.kind)?,
            input.amount,
            input.description,
        )
    }
}

/// Ordered deductions of one payroll record.
///
/// Entries keep the order they were submitted in. The ledger is replaced
/// wholesale on update, never edited entry by entry.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct DeductionLedger(Vec<DeductionEntry>);

impl DeductionLedger {
    #[cfg(test)]
    pub fn new(entries: Vec<DeductionEntry>) -> Self {
        Self(entries)
    }

    pub fn from_inputs(inputs: Vec<DeductionInput>) -> Result<Self, PayrollError> {
        inputs
            .into_iter()
            .map(DeductionEntry::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn total(&self) -> Result<Decimal, PayrollError> {
        let sum = self
            .0
            .iter()
            .try_fold(Decimal::ZERO, |acc, d| acc.checked_add(d.amount));
        derived_money("total_deductions", sum)
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[DeductionEntry] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1001,
    "month": 3,
    "year": 2024,
    "base_salary": 5000,
    "bonus": 500,
    "deductions": [
        { "type": "tax", "amount": 600 },
        { "type": "insurance", "amount": 200 }
    ],
    "total_deductions": 800,
    "net_salary": 4700,
    "status": "pending",
    "payment_date": null,
    "payment_method": "bank_transfer",
    "processed_by": 1,
    "notes": null,
    "created_at": "2024-03-31T00:00:00Z",
    "updated_at": "2024-03-31T00:00:00Z"
}))]
pub struct PayrollRecord {
    pub id: u64,
    pub employee_id: u64,
    pub month: u8,
    pub year: u16,

    #[schema(value_type = f64)]
    pub base_salary: Decimal,
    #[schema(value_type = f64)]
    pub bonus: Decimal,
    pub deductions: DeductionLedger,
    #[schema(value_type = f64)]
    pub total_deductions: Decimal,
    #[schema(value_type = f64)]
    pub net_salary: Decimal,

    pub status: PayrollStatus,
    #[schema(value_type = Option<String>, format = "date")]
    pub payment_date: Option<NaiveDate>,
    pub payment_method: PaymentMethod,
    pub processed_by: Option<u64>,
    pub notes: Option<String>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

/// Recompute the derived money fields from the record's own inputs.
///
/// Every create and update path calls this right before persisting, so
/// `total_deductions` and `net_salary` can never disagree with the ledger.
/// Running it twice changes nothing. Fails when a total leaves the range a
/// money column can hold.
pub fn derive_totals(mut record: PayrollRecord) -> Result<PayrollRecord, PayrollError> {
    let total_deductions = record.deductions.total()?;
    let net_salary = record
        .base_salary
        .checked_add(record.bonus)
        .and_then(|gross| gross.checked_sub(total_deductions));

    record.net_salary = derived_money("net_salary", net_salary)?;
    record.total_deductions = total_deductions;
    Ok(record)
}

impl PayrollRecord {
    pub fn period(&self) -> PayPeriod {
        PayPeriod {
            month: self.month,
            year: self.year,
        }
    }

    /// Net pay below zero is stored as derived; callers are expected to flag it.
    pub fn has_negative_net(&self) -> bool {
        self.net_salary < Decimal::ZERO
    }

    /// Apply a change, stamp it and re-derive the totals.
    pub fn apply(
        mut self,
        change: &PayrollChange,
        processed_by: u64,
        now: DateTime<Utc>,
    ) -> Result<Self, PayrollError> {
        match change {
            PayrollChange::Status(patch) => {
                self.status = patch.status;
                if let Some(date) = patch.payment_date {
                    self.payment_date = Some(date);
                }
                if let Some(method) = patch.payment_method {
                    self.payment_method = method;
                }
            }
            PayrollChange::Fields(patch) => {
                if let Some(base_salary) = patch.base_salary {
                    self.base_salary = base_salary;
                }
                if let Some(bonus) = patch.bonus {
                    self.bonus = bonus;
                }
                if let Some(deductions) = &patch.deductions {
                    self.deductions = deductions.clone();
                }
                if let Some(notes) = &patch.notes {
                    self.notes = Some(notes.clone());
                }
            }
        }
        self.processed_by = Some(processed_by);
        self.updated_at = now;
        derive_totals(self)
    }
}

/// A validated request to create a payroll record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayroll {
    pub employee_id: u64,
    pub period: PayPeriod,
    pub base_salary: Decimal,
    pub bonus: Decimal,
    pub deductions: DeductionLedger,
    pub notes: Option<String>,
}

impl NewPayroll {
    pub fn new(
        employee_id: u64,
        month: u8,
        year: u16,
        base_salary: Decimal,
        bonus: Option<Decimal>,
        deductions: Vec<DeductionInput>,
    ) -> Result<Self, PayrollError> {
        Ok(Self {
            employee_id,
            period: PayPeriod::new(month, year)?,
            base_salary: validate_money("base_salary", base_salary)?,
            bonus: validate_money("bonus", bonus.unwrap_or(Decimal::ZERO))?,
            deductions: DeductionLedger::from_inputs(deductions)?,
            notes: None,
        })
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    /// Build the record to persist. The store assigns the id.
    pub fn into_record(
        self,
        processed_by: u64,
        now: DateTime<Utc>,
    ) -> Result<PayrollRecord, PayrollError> {
        derive_totals(PayrollRecord {
            id: 0,
            employee_id: self.employee_id,
            month: self.period.month(),
            year: self.period.year(),
            base_salary: self.base_salary,
            bonus: self.bonus,
            deductions: self.deductions,
            total_deductions: Decimal::ZERO,
            net_salary: Decimal::ZERO,
            status: PayrollStatus::default(),
            payment_date: None,
            payment_method: PaymentMethod::default(),
            processed_by: Some(processed_by),
            notes: self.notes,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusPatch {
    pub status: PayrollStatus,
    pub payment_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
}

impl StatusPatch {
    pub fn parse(
        status: &str,
        payment_date: Option<NaiveDate>,
        payment_method: Option<&str>,
    ) -> Result<Self, PayrollError> {
        Ok(Self {
            status: PayrollStatus::parse(status)?,
            payment_date,
            payment_method: payment_method.map(PaymentMethod::parse).transpose()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldsPatch {
    pub base_salary: Option<Decimal>,
    pub bonus: Option<Decimal>,
    pub deductions: Option<DeductionLedger>,
    pub notes: Option<String>,
}

impl FieldsPatch {
    pub fn new(
        base_salary: Option<Decimal>,
        bonus: Option<Decimal>,
        deductions: Option<Vec<DeductionInput>>,
        notes: Option<String>,
    ) -> Result<Self, PayrollError> {
        if base_salary.is_none() && bonus.is_none() && deductions.is_none() && notes.is_none() {
            return Err(PayrollError::validation("No fields provided for update"));
        }

        Ok(Self {
            base_salary: base_salary
                .map(|v| validate_money("base_salary", v))
                .transpose()?,
            bonus: bonus.map(|v| validate_money("bonus", v)).transpose()?,
            deductions: deductions.map(DeductionLedger::from_inputs).transpose()?,
            notes,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PayrollChange {
    Status(StatusPatch),
    Fields(FieldsPatch),
}

/// Optional period narrowing for list and summary queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayrollFilter {
    pub month: Option<u8>,
    pub year: Option<u16>,
}

impl PayrollFilter {
    pub fn new(month: Option<u8>, year: Option<u16>) -> Self {
        Self { month, year }
    }

    pub fn matches(&self, record: &PayrollRecord) -> bool {
        self.month.is_none_or(|m| m == record.month) && self.year.is_none_or(|y| y == record.year)
    }
}

/// A payroll record together with the display fields of its employee.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PayrollView {
    #[serde(flatten)]
    pub payroll: PayrollRecord,

    /// `null` when the employee no longer resolves in the directory.
    pub employee: Option<EmployeeBrief>,
}
