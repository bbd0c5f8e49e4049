use serde::{Deserialize, Serialize};

use emporium_core::{DomainError, DomainResult, NodeId};

use crate::node::{NodeData, TreeNode};
use crate::store::{DependentLookup, TreeStore};
use crate::tree::{Hierarchy, NodeUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationCategory {
    Government,
    Private,
    SemiState,
}

/// Admin review state of an organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    /// External registration code.
    pub code: String,
    pub category: Option<OrganizationCategory>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub web_site: Option<String>,
    #[serde(default)]
    pub confirm_status: ConfirmStatus,
}

impl Organization {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            category: None,
            email: None,
            phone: None,
            web_site: None,
            confirm_status: ConfirmStatus::Pending,
        }
    }

    pub fn with_category(mut self, category: OrganizationCategory) -> Self {
        self.category = Some(category);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub category: Option<OrganizationCategory>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub web_site: Option<String>,
    pub confirm_status: Option<ConfirmStatus>,
}

impl NodeData for Organization {
    const KIND: &'static str = "organization";
    type Patch = OrganizationPatch;

    fn title(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, patch: OrganizationPatch) {
        let OrganizationPatch {
            name,
            code,
            category,
            email,
            phone,
            web_site,
            confirm_status,
        } = patch;
        if let Some(v) = name {
            self.name = v;
        }
        if let Some(v) = code {
            self.code = v;
        }
        if category.is_some() {
            self.category = category;
        }
        if email.is_some() {
            self.email = email;
        }
        if phone.is_some() {
            self.phone = phone;
        }
        if web_site.is_some() {
            self.web_site = web_site;
        }
        if let Some(v) = confirm_status {
            self.confirm_status = v;
        }
    }

    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("organization name must not be empty"));
        }
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("organization code must not be empty"));
        }
        if self.email.as_deref().is_some_and(|e| !e.contains('@')) {
            return Err(DomainError::validation("organization email is malformed"));
        }
        Ok(())
    }
}

impl<S, P> Hierarchy<Organization, S, P>
where
    S: TreeStore<Organization>,
    P: DependentLookup,
{
    /// Record the admin review decision for an organization.
    pub fn confirm(
        &self,
        id: NodeId,
        status: ConfirmStatus,
    ) -> DomainResult<TreeNode<Organization>> {
        let node = self.update(
            id,
            NodeUpdate::patch(OrganizationPatch {
                confirm_status: Some(status),
                ..OrganizationPatch::default()
            }),
        )?;
        tracing::info!(organization = %id, status = ?status, "organization confirmation recorded");
        Ok(node)
    }
}
