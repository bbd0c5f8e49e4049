//! Domain error model.
//!
//! Every failure the core can report is a caller-visible, non-retryable domain
//! error. The transport layer maps each variant to exactly one HTTP status via
//! [`DomainError::http_status`]; nothing in the core retries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{NodeId, RecordId, UserId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type returned by storage adapters.
pub type StoreResult<T> = Result<T, StoreError>;

/// A leaf record that blocks deletion of a tree node (e.g. a product filed
/// under a category).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependentRef {
    pub id: RecordId,
    /// Record kind, e.g. `"product"`.
    pub kind: String,
    /// Display title shown to the caller so the conflict can be resolved.
    pub title: String,
}

/// Storage adapter failure.
///
/// These are infrastructure errors; they surface to callers as
/// [`DomainError::Store`] and are never retried by the core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    /// A precondition checked under the write lock no longer holds.
    #[error("write conflict: {0}")]
    Conflict(String),
}

/// Domain-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A role, node, entity code or rule could not be found.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// The parent referenced by a create/update does not exist.
    #[error("parent {parent} not found")]
    ParentNotFound { parent: NodeId },

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A permission grant references rules the entity does not support.
    #[error("{entity}: rules not found: {}", .rules.join(", "))]
    UnknownRules { entity: String, rules: Vec<String> },

    /// The principal lacks the required `(entity, rule)` scope.
    #[error("permission denied: {entity}.{rule}")]
    PermissionDenied { entity: String, rule: String },

    /// A reparent would make a node its own ancestor.
    #[error("node {node} cannot be placed under {parent}: recursive parent")]
    RecursiveParent { node: NodeId, parent: NodeId },

    /// A node cannot be deleted while it has live children.
    #[error("node {node} has {} child node(s)", .children.len())]
    HasChildren { node: NodeId, children: Vec<NodeId> },

    /// A node cannot be deleted while leaf records reference it.
    #[error("node {node} is referenced by {} record(s)", .dependents.len())]
    HasDependents {
        node: NodeId,
        dependents: Vec<DependentRef>,
    },

    /// A bulk delete committed the safe subset but had to skip some ids.
    #[error(
        "bulk delete skipped {} node(s) with children and {} with dependents ({} deleted)",
        .has_children.len(),
        .has_dependents.len(),
        .deleted.len()
    )]
    BulkDeleteBlocked {
        deleted: Vec<NodeId>,
        has_children: Vec<NodeId>,
        has_dependents: Vec<NodeId>,
    },

    /// A bulk role delete committed the unreferenced roles but skipped roles
    /// still assigned to users.
    #[error("roles still assigned to users: {}", .blocked.join(", "))]
    RolesHaveUser {
        deleted: Vec<String>,
        blocked: Vec<String>,
        users: Vec<UserId>,
    },

    /// A uniqueness or state conflict (e.g. role name already taken).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage reported zero rows affected despite passing preconditions.
    #[error("delete failed: {0}")]
    DeleteFailed(String),

    /// Storage reported zero rows affected (or a stale version) on update.
    #[error("update failed: {0}")]
    UpdateFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError {
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn permission_denied(entity: impl Into<String>, rule: impl Into<String>) -> Self {
        Self::PermissionDenied {
            entity: entity.into(),
            rule: rule.into(),
        }
    }

    /// Stable machine-readable code for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::ParentNotFound { .. } => "ParentNotFound",
            Self::Validation(_) => "ValidationError",
            Self::UnknownRules { .. } => "ValidationError",
            Self::PermissionDenied { .. } => "PermissionDenied",
            Self::RecursiveParent { .. } => "RecursiveParentError",
            Self::HasChildren { .. } => "HasChildren",
            Self::HasDependents { .. } => "HasDependents",
            Self::BulkDeleteBlocked { .. } => "BulkDeleteBlocked",
            Self::RolesHaveUser { .. } => "RolesHaveUser",
            Self::Conflict(_) => "Conflict",
            Self::DeleteFailed(_) => "DeleteFailed",
            Self::UpdateFailed(_) => "UpdateFailed",
            Self::Store(_) => "StoreError",
        }
    }

    /// HTTP status the transport layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } | Self::ParentNotFound { .. } => 404,
            Self::Validation(_)
            | Self::UnknownRules { .. }
            | Self::RecursiveParent { .. }
            | Self::HasChildren { .. }
            | Self::HasDependents { .. } => 422,
            Self::PermissionDenied { .. } => 403,
            Self::BulkDeleteBlocked { .. } | Self::RolesHaveUser { .. } => 400,
            Self::Conflict(_) => 409,
            Self::DeleteFailed(_) | Self::UpdateFailed(_) | Self::Store(_) => 500,
        }
    }

    /// Actionable detail lines (blocking ids, dependent titles, rule names).
    pub fn detail(&self) -> Vec<String> {
        match self {
            Self::UnknownRules { rules, .. } => rules.clone(),
            Self::HasChildren { children, .. } => children.iter().map(|c| c.to_string()).collect(),
            Self::HasDependents { dependents, .. } => dependents
                .iter()
                .map(|d| format!("{} {}: {}", d.kind, d.id, d.title))
                .collect(),
            Self::BulkDeleteBlocked {
                has_children,
                has_dependents,
                ..
            } => has_children
                .iter()
                .map(|id| format!("has_children: {id}"))
                .chain(has_dependents.iter().map(|id| format!("has_dependents: {id}")))
                .collect(),
            Self::RolesHaveUser { blocked, .. } => blocked.clone(),
            _ => Vec::new(),
        }
    }

    /// Serializable error body handed to the transport layer.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            http_status: self.http_status(),
            message: self.to_string(),
            detail: self.detail(),
        }
    }
}

/// Structured error payload, e.g. `{"kind": "PermissionDenied", "http_status": 403, ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub http_status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub detail: Vec<String>,
}
