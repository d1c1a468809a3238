use crate::datastore::postfilters::PostFilters;
use crate::datastore::tables::{comments, follows, groups, posts, users};
use chrono::{offset::Utc, DateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered author/reader of the site.
#[derive(Queryable, Identifiable, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Parameters for the database statement which inserts new users.
#[derive(Insertable)]
#[table_name = "users"]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// A named community posts can be filed under.
#[derive(Queryable, Identifiable, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Group {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Insertable)]
#[table_name = "groups"]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// A post from a user, optionally filed under a group.
#[derive(
    Queryable, Identifiable, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, Associations,
)]
#[belongs_to(User, foreign_key = "author_id")]
#[belongs_to(Group)]
pub struct Post {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub text: String,
    pub image: Option<String>,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
}

impl Post {
    /// Has this post been deleted?
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Does this post match all specified filters?
    pub fn matches(&self, filters: &PostFilters) -> bool {
        if let Some(id) = filters.id {
            if id != self.id {
                return false;
            }
        }
        if let Some(author_id) = filters.author_id {
            if author_id != self.author_id {
                return false;
            }
        }
        if let Some(group_id) = filters.group_id {
            if Some(group_id) != self.group_id {
                return false;
            }
        }
        if let Some(is_deleted) = filters.is_deleted {
            if is_deleted != self.is_deleted() {
                return false;
            }
        }
        if let Some(substring) = &filters.text_contains {
            if !self.text.contains(substring) {
                return false;
            }
        }
        true
    }
}

/// Parameters for the database statement which inserts new posts.
#[derive(Insertable)]
#[table_name = "posts"]
pub struct NewPost {
    pub text: String,
    pub image: Option<String>,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
}

/// Field updates applied when an author edits their post.
#[derive(Clone, Debug)]
pub struct PostEdit {
    pub text: String,
    pub image: Option<String>,
    pub group_id: Option<Uuid>,
}

/// A reader's comment under a post.
#[derive(
    Queryable, Identifiable, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, Associations,
)]
#[belongs_to(User, foreign_key = "author_id")]
#[belongs_to(Post)]
pub struct Comment {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub author_id: Uuid,
    pub post_id: Uuid,
}

#[derive(Insertable)]
#[table_name = "comments"]
pub struct NewComment {
    pub text: String,
    pub author_id: Uuid,
    pub post_id: Uuid,
}

/// A directed follower -> author edge.
#[derive(Queryable, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Follow {
    pub follower_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[table_name = "follows"]
pub struct NewFollow {
    pub follower_id: Uuid,
    pub author_id: Uuid,
}

/// One post joined with its author and (if it has one) its group.
pub type PostRecord = (Post, User, Option<Group>);
