pub mod employee;
pub mod page;
pub mod payroll;
pub mod role;
pub mod summary;
