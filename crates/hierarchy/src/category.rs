use serde::{Deserialize, Serialize};

use emporium_core::{DomainError, DomainResult};

use crate::node::NodeData;

/// Product category. Products reference categories by id; a category with
/// products filed under it cannot be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl Category {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl NodeData for Category {
    const KIND: &'static str = "category";
    type Patch = CategoryPatch;

    fn title(&self) -> &str {
        &self.title
    }

    fn apply(&mut self, patch: CategoryPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(icon) = patch.icon {
            self.icon = Some(icon);
        }
    }

    fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("category title must not be empty"));
        }
        if self.title.contains('>') {
            return Err(DomainError::validation("category title must not contain '>'"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_only_touches_given_fields() {
        let mut cat = Category::new("Tea").with_icon("leaf.svg");
        cat.apply(CategoryPatch {
            title: Some("Teas".into()),
            ..CategoryPatch::default()
        });
        assert_eq!(cat.title, "Teas");
        assert_eq!(cat.icon.as_deref(), Some("leaf.svg"));
    }

    #[test]
    fn blank_or_path_like_titles_are_rejected() {
        assert!(Category::new("  ").validate().is_err());
        assert!(Category::new("A > B").validate().is_err());
        assert!(Category::new("Tea").validate().is_ok());
    }
}
