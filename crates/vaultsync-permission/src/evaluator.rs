//! Rule evaluation.

use crate::types::*;

/// Evaluates capability checks against an ordered rule list
///
/// Rules are scanned last-to-first and the first rule matching the action,
/// subject and conditions decides: a grant allows, an inverted rule denies.
/// No matching rule means deny.
///
/// For a check without attributes, conditional grants still match (the actor
/// can act on *some* scope) while conditional denials are skipped.
pub struct PermissionEvaluator;

impl PermissionEvaluator {
    pub fn can(
        rules: &[PermissionRule],
        action: ProjectPermissionAction,
        subject: ProjectPermissionSub,
        attributes: Option<&SecretScope>,
    ) -> bool {
        for rule in rules.iter().rev() {
            if rule.action != action || rule.subject != subject {
                continue;
            }

            let matched = match (&rule.conditions, attributes) {
                (None, _) => true,
                (Some(_), None) => !rule.inverted,
                (Some(conditions), Some(scope)) => Self::conditions_match(conditions, scope),
            };

            if matched {
                return !rule.inverted;
            }
        }

        false
    }

    fn conditions_match(conditions: &RuleConditions, scope: &SecretScope) -> bool {
        if let Some(environment) = &conditions.environment {
            if environment != &scope.environment {
                return false;
            }
        }

        match &conditions.secret_path {
            Some(pattern) => match glob::Pattern::new(pattern) {
                Ok(pattern) => pattern.matches(&scope.secret_path),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "Ignoring rule with invalid secret path glob");
                    false
                }
            },
            None => true,
        }
    }
}
