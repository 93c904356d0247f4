//! Category Models

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Category UUID
pub type CategoryUuid = TypedUuid<Category>;

/// Longest allowed category name.
pub const MAX_NAME_LEN: usize = 100;

/// Longest allowed category description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Category Model
#[derive(Debug, Clone)]
pub struct Category {
    pub uuid: CategoryUuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_uuid: Option<CategoryUuid>,
    pub image: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// New Category Model
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub uuid: CategoryUuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_uuid: Option<CategoryUuid>,
    pub image: Option<String>,
    pub display_order: i32,
}

/// Category Update Model
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,
}

impl CategoryUpdate {
    /// Fold this update into an existing category, leaving `slug` alone.
    pub(crate) fn apply_to(self, category: &mut Category) {
        if let Some(name) = self.name {
            category.name = name;
        }
        if let Some(description) = self.description {
            category.description = description;
        }
        if let Some(image) = self.image {
            category.image = image;
        }
        if let Some(is_active) = self.is_active {
            category.is_active = is_active;
        }
        if let Some(display_order) = self.display_order {
            category.display_order = display_order;
        }
    }
}
