#[cfg(test)]
pub mod mock;
pub mod postfilters;
pub mod postgres;
pub mod structs;
pub mod tables;

use crate::facade::Fallible;
use async_trait::async_trait;
use postfilters::PostFilters;
use structs::{
    Comment, Follow, Group, NewComment, NewGroup, NewPost, NewUser, Post, PostEdit, PostRecord,
    User,
};
use uuid::Uuid;

#[async_trait]
/// The interface for storing blog data.
pub trait Client: Clone {
    // Users
    async fn create_user(&self, new_user: NewUser) -> Fallible<User>;
    async fn get_user(&self, user_id: Uuid) -> Fallible<Option<User>>;
    async fn find_user(&self, username: &str) -> Fallible<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Fallible<Option<User>>;
    async fn set_password(&self, user_id: Uuid, password_hash: String) -> Fallible<()>;

    // Groups
    async fn create_group(&self, new_group: NewGroup) -> Fallible<Group>;
    async fn find_group(&self, slug: &str) -> Fallible<Option<Group>>;
    async fn group_exists(&self, group_id: Uuid) -> Fallible<bool>;

    // Posts
    async fn new_post(&self, new_post: NewPost) -> Fallible<Post>;
    async fn edit_post(&self, post_id: Uuid, edit: PostEdit) -> Fallible<Option<Post>>;
    async fn find_post(&self, post_id: Uuid) -> Fallible<Option<PostRecord>>;
    async fn delete_post(&self, post_id: Uuid) -> Fallible<Option<Post>>;
    async fn list_posts(&self, filters: PostFilters) -> Fallible<Vec<PostRecord>>;
    async fn count_posts(&self, filters: PostFilters) -> Fallible<i64>;

    // Comments
    async fn new_comment(&self, new_comment: NewComment) -> Fallible<Comment>;
    async fn list_comments(&self, post_id: Uuid) -> Fallible<Vec<(Comment, User)>>;

    // Follow edges and the feed they produce
    async fn follow(&self, follower_id: Uuid, author_id: Uuid) -> Fallible<Follow>;
    async fn unfollow(&self, follower_id: Uuid, author_id: Uuid) -> Fallible<bool>;
    async fn is_following(&self, follower_id: Uuid, author_id: Uuid) -> Fallible<bool>;
    async fn feed(&self, follower_id: Uuid, offset: i64, limit: i64) -> Fallible<Vec<PostRecord>>;
    async fn count_feed(&self, follower_id: Uuid) -> Fallible<i64>;
}
