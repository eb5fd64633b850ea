pub mod employee;
pub mod health;
pub mod payroll;

#[cfg(test)]
pub(crate) mod test_support;
