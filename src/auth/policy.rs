use crate::{auth::auth::AuthUser, error::PayrollError};

/// Payroll operations subject to access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayrollAction {
    /// List every record, or fetch one by id.
    ReadAll,
    Summarize,
    /// Read the records of one employee.
    ReadEmployee(u64),
    Create,
    UpdateStatus,
    UpdateFields,
}

/// Decide whether `caller` may perform `action`.
///
/// Evaluated before any record lookup, so a denial says nothing about
/// whether the target exists. Self access compares the target with the
/// employee linked to the caller's token.
pub fn authorize(caller: &AuthUser, action: PayrollAction) -> Result<(), PayrollError> {
    if caller.role.is_privileged() {
        return Ok(());
    }

    match action {
        PayrollAction::ReadEmployee(target) if caller.employee_id == Some(target) => Ok(()),
        _ => {
            tracing::debug!(
                user_id = caller.user_id,
                role = %caller.role,
                ?action,
                "Payroll access denied"
            );
            Err(PayrollError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn caller(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 50,
            username: "someone".into(),
            role,
            employee_id,
        }
    }

    #[test]
    fn privileged_roles_may_do_everything() {
        for role in [Role::Admin, Role::Manager] {
            let c = caller(role, None);
            for action in [
                PayrollAction::ReadAll,
                PayrollAction::Summarize,
                PayrollAction::ReadEmployee(9),
                PayrollAction::Create,
                PayrollAction::UpdateStatus,
                PayrollAction::UpdateFields,
            ] {
                assert!(authorize(&c, action).is_ok(), "{role} denied {action:?}");
            }
        }
    }

    #[test]
    fn employee_reads_only_own_records() {
        let c = caller(Role::Employee, Some(1001));
        assert!(authorize(&c, PayrollAction::ReadEmployee(1001)).is_ok());
        assert_eq!(
            authorize(&c, PayrollAction::ReadEmployee(1002)),
            Err(PayrollError::Forbidden)
        );
    }

    #[test]
    fn employee_without_profile_reads_nothing() {
        let c = caller(Role::Employee, None);
        assert!(authorize(&c, PayrollAction::ReadEmployee(50)).is_err());
    }

    #[test]
    fn employee_cannot_list_summarize_or_write() {
        let c = caller(Role::Employee, Some(1001));
        for action in [
            PayrollAction::ReadAll,
            PayrollAction::Summarize,
            PayrollAction::Create,
            PayrollAction::UpdateStatus,
            PayrollAction::UpdateFields,
        ] {
            assert_eq!(authorize(&c, action), Err(PayrollError::Forbidden));
        }
    }
}
