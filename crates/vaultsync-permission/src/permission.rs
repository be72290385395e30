//! Per-request permission handle.

use crate::errors::{PermissionError, Result};
use crate::evaluator::PermissionEvaluator;
use crate::types::*;
use uuid::Uuid;

/// Capability set of one actor within one project
///
/// Built fresh for every request by a [`crate::PermissionService`] and never
/// persisted.
#[derive(Debug, Clone)]
pub struct ProjectPermission {
    project_id: Uuid,
    actor: ActorContext,
    rules: Vec<PermissionRule>,
}

impl ProjectPermission {
    pub fn new(project_id: Uuid, actor: ActorContext, rules: Vec<PermissionRule>) -> Self {
        Self {
            project_id,
            actor,
            rules,
        }
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn actor(&self) -> &ActorContext {
        &self.actor
    }

    /// Answer a capability query
    pub fn can(
        &self,
        action: ProjectPermissionAction,
        subject: ProjectPermissionSub,
        attributes: Option<&SecretScope>,
    ) -> bool {
        PermissionEvaluator::can(&self.rules, action, subject, attributes)
    }

    /// Like [`Self::can`], failing with `Forbidden` carrying the check
    pub fn ensure(
        &self,
        action: ProjectPermissionAction,
        subject: ProjectPermissionSub,
        attributes: Option<&SecretScope>,
    ) -> Result<()> {
        if self.can(action, subject, attributes) {
            return Ok(());
        }

        tracing::warn!(
            actor_id = %self.actor.actor_id,
            project_id = %self.project_id,
            action = %action,
            subject = %subject,
            attributes = ?attributes,
            "Permission denied"
        );

        Err(PermissionError::Forbidden {
            action,
            subject,
            attributes: attributes.cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> ActorContext {
        ActorContext {
            actor: ActorType::User,
            actor_id: Uuid::new_v4(),
            actor_org_id: Uuid::new_v4(),
            actor_auth_method: Some(ActorAuthMethod::Email),
        }
    }

    #[test]
    fn test_ensure_reports_failed_check() {
        let permission = ProjectPermission::new(
            Uuid::new_v4(),
            actor(),
            vec![PermissionRule::allow(
                ProjectPermissionAction::Read,
                ProjectPermissionSub::Integrations,
            )],
        );

        assert!(permission
            .ensure(
                ProjectPermissionAction::Read,
                ProjectPermissionSub::Integrations,
                None
            )
            .is_ok());

        let scope = SecretScope::new("prod", "/app");
        match permission.ensure(
            ProjectPermissionAction::Read,
            ProjectPermissionSub::Secrets,
            Some(&scope),
        ) {
            Err(PermissionError::Forbidden {
                action,
                subject,
                attributes,
            }) => {
                assert_eq!(action, ProjectPermissionAction::Read);
                assert_eq!(subject, ProjectPermissionSub::Secrets);
                assert_eq!(attributes, Some(scope));
            }
            other => panic!("Expected Forbidden, got {:?}", other),
        }
    }
}
