//! Permission type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of principal issuing a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    User,
    Service,
    Identity,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::User => "user",
            ActorType::Service => "service",
            ActorType::Identity => "identity",
        }
    }
}

/// How the actor authenticated for this request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActorAuthMethod {
    Email,
    Google,
    Github,
    Gitlab,
    Saml,
    Oidc,
    Ldap,
    UniversalAuth,
}

/// Caller identity passed to every permission-checked operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub actor: ActorType,
    pub actor_id: Uuid,
    pub actor_org_id: Uuid,
    pub actor_auth_method: Option<ActorAuthMethod>,
}

/// Action half of a capability check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPermissionAction {
    Read,
    Create,
    Edit,
    Delete,
}

impl ProjectPermissionAction {
    pub const ALL: [ProjectPermissionAction; 4] = [
        ProjectPermissionAction::Read,
        ProjectPermissionAction::Create,
        ProjectPermissionAction::Edit,
        ProjectPermissionAction::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectPermissionAction::Read => "read",
            ProjectPermissionAction::Create => "create",
            ProjectPermissionAction::Edit => "edit",
            ProjectPermissionAction::Delete => "delete",
        }
    }
}

impl fmt::Display for ProjectPermissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subject half of a capability check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPermissionSub {
    Integrations,
    Secrets,
}

impl ProjectPermissionSub {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectPermissionSub::Integrations => "integrations",
            ProjectPermissionSub::Secrets => "secrets",
        }
    }
}

impl fmt::Display for ProjectPermissionSub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute bag qualifying a `Secrets` check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretScope {
    pub environment: String,
    pub secret_path: String,
}

impl SecretScope {
    pub fn new(environment: impl Into<String>, secret_path: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            secret_path: secret_path.into(),
        }
    }
}

/// Conditions restricting a rule to part of the secret tree
///
/// `secret_path` is a glob (`/app/**`); `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConditions {
    pub environment: Option<String>,
    pub secret_path: Option<String>,
}

/// One grant (or, when `inverted`, one denial)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub action: ProjectPermissionAction,
    pub subject: ProjectPermissionSub,
    pub conditions: Option<RuleConditions>,
    pub inverted: bool,
}

impl PermissionRule {
    /// Unconditional grant
    pub fn allow(action: ProjectPermissionAction, subject: ProjectPermissionSub) -> Self {
        Self {
            action,
            subject,
            conditions: None,
            inverted: false,
        }
    }

    /// Unconditional denial
    pub fn deny(action: ProjectPermissionAction, subject: ProjectPermissionSub) -> Self {
        Self {
            inverted: true,
            ..Self::allow(action, subject)
        }
    }

    pub fn with_conditions(mut self, conditions: RuleConditions) -> Self {
        self.conditions = Some(conditions);
        self
    }
}

/// Built-in project roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectRole {
    Admin,
    Member,
    Viewer,
    NoAccess,
    /// Only the membership's custom rules apply
    Custom,
}

/// An actor's membership in one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMembership {
    pub project_id: Uuid,
    pub actor_id: Uuid,
    pub actor: ActorType,
    pub actor_org_id: Uuid,
    pub role: ProjectRole,
    /// Applied after the role's rules, so they can narrow or widen it
    pub custom_rules: Vec<PermissionRule>,
    pub created_at: u64,
}

impl ProjectMembership {
    /// Role rules followed by custom rules
    pub fn effective_rules(&self) -> Vec<PermissionRule> {
        let mut rules = crate::roles::role_rules(self.role);
        rules.extend(self.custom_rules.iter().cloned());
        rules
    }
}

/// Get current Unix timestamp in seconds
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
