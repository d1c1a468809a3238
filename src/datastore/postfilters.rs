//! Ways to filter posts based on their fields. Filter semantics work just like SQL:
//! If a field is unset, its filter won't be applied.
//! If set, filter out posts that don't match the filter.
use serde::Deserialize;
use uuid::Uuid;

/// Filters that can be applied to post queries on the datastore.
#[derive(Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct PostFilters {
    pub id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub is_deleted: Option<bool>,
    pub text_contains: Option<String>,
    /// Rows to skip before the slice starts (pagination offset).
    #[serde(default)]
    pub offset: i64,
    /// Maximum number of posts to let match the filter
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl PostFilters {
    /// Filters for what readers see: everything that isn't soft-deleted.
    pub fn visible() -> Self {
        Self {
            is_deleted: Some(false),
            ..Default::default()
        }
    }
}

impl Default for PostFilters {
    fn default() -> Self {
        Self {
            id: None,
            author_id: None,
            group_id: None,
            is_deleted: None,
            text_contains: None,
            offset: 0,
            limit: default_limit(),
        }
    }
}

fn default_limit() -> i64 {
    100
}
