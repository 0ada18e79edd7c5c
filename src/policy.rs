//! Role based authorization. Every handler asks [`authorize`] before acting,
//! so this is the one place where capabilities are decided.

use crate::error::{AppError, AppResult};
use crate::schemas::{User, UserRole};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    ViewMembers,
    EditMembers,
    DeleteMembers,
    ViewPayments,
    EditPayments,
    DeletePayments,
    ViewReports,
}

impl Action {
    fn describe(self) -> &'static str {
        match self {
            Action::ViewMembers => "view members",
            Action::EditMembers => "edit members",
            Action::DeleteMembers => "delete members",
            Action::ViewPayments => "view payments",
            Action::EditPayments => "edit payments",
            Action::DeletePayments => "delete payments",
            Action::ViewReports => "view reports",
        }
    }
}

pub fn capabilities(role: UserRole) -> &'static [Action] {
    use Action::*;
    match role {
        UserRole::Admin | UserRole::Editor => &[
            ViewMembers,
            EditMembers,
            DeleteMembers,
            ViewPayments,
            EditPayments,
            DeletePayments,
            ViewReports,
        ],
        UserRole::Viewer => &[ViewMembers, ViewPayments, ViewReports],
    }
}

pub fn can(user: &User, action: Action) -> bool {
    capabilities(user.role).contains(&action)
}

pub fn authorize(user: &User, action: Action) -> AppResult<()> {
    if can(user, action) {
        Ok(())
    } else {
        tracing::warn!(user = %user.username, action = action.describe(), "action denied");
        Err(AppError::Forbidden(format!(
            "{} is not allowed to {}",
            user.username,
            action.describe()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: "u1".to_string(),
            username: "someone".to_string(),
            name: "Someone".to_string(),
            role,
        }
    }

    #[test]
    fn viewer_is_read_only() {
        let viewer = user(UserRole::Viewer);
        assert!(authorize(&viewer, Action::ViewPayments).is_ok());
        assert!(authorize(&viewer, Action::ViewReports).is_ok());
        for action in [
            Action::EditMembers,
            Action::DeleteMembers,
            Action::EditPayments,
            Action::DeletePayments,
        ] {
            assert!(matches!(
                authorize(&viewer, action),
                Err(AppError::Forbidden(_))
            ));
        }
    }

    #[test]
    fn editors_and_admins_can_do_everything() {
        for role in [UserRole::Admin, UserRole::Editor] {
            let operator = user(role);
            assert!(can(&operator, Action::EditMembers));
            assert!(can(&operator, Action::DeletePayments));
        }
    }
}
