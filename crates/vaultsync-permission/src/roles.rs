//! Rule sets behind the built-in project roles.

use crate::types::{PermissionRule, ProjectPermissionAction, ProjectPermissionSub, ProjectRole};

/// Expand a role into its rules
pub fn role_rules(role: ProjectRole) -> Vec<PermissionRule> {
    use crate::types::ProjectPermissionAction::*;
    use crate::types::ProjectPermissionSub::*;

    match role {
        ProjectRole::Admin | ProjectRole::Member => [Integrations, Secrets]
            .into_iter()
            .flat_map(|subject| {
                ProjectPermissionAction::ALL
                    .into_iter()
                    .map(move |action| PermissionRule::allow(action, subject))
            })
            .collect(),
        ProjectRole::Viewer => vec![
            PermissionRule::allow(Read, Integrations),
            PermissionRule::allow(Read, Secrets),
        ],
        ProjectRole::NoAccess | ProjectRole::Custom => Vec::new(),
    }
}
