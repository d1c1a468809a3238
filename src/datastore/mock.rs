use crate::datastore::{
    postfilters::PostFilters,
    structs::{
        Comment, Follow, Group, NewComment, NewGroup, NewPost, NewUser, Post, PostEdit, PostRecord,
        User,
    },
};
use crate::facade::{Describe, Fallible, Kind, PublicFace};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::offset::Utc;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

type Store<T> = Arc<Mutex<Vec<T>>>;

/// A mock implementation of datastore::Client
#[derive(Clone, Default, Debug)]
pub struct Client {
    users: Store<User>,
    groups: Store<Group>,
    posts: Store<Post>,
    comments: Store<Comment>,
    follows: Store<Follow>,
}

/// Seeding and inspection helpers for tests.
impl Client {
    pub fn add_user(&self, username: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            username: username.to_owned(),
            email: format!("{}@example.com", username),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn add_user_with_password(&self, username: &str, password: &str) -> User {
        let mut user = self.add_user(username);
        let hash = crate::auth::hash_password(password).unwrap();
        self.users
            .lock()
            .unwrap()
            .iter_mut()
            .find(|u| u.id == user.id)
            .unwrap()
            .password_hash = hash.clone();
        user.password_hash = hash;
        user
    }

    pub fn add_group(&self, title: &str, slug: &str) -> Group {
        let group = Group {
            id: Uuid::new_v4(),
            title: title.to_owned(),
            slug: slug.to_owned(),
            description: format!("all about {}", title),
        };
        self.groups.lock().unwrap().push(group.clone());
        group
    }

    pub fn add_post(&self, author: &User, group: Option<&Group>, text: &str) -> Post {
        let post = Post {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            deleted_at: None,
            text: text.to_owned(),
            image: None,
            author_id: author.id,
            group_id: group.map(|g| g.id),
        };
        self.posts.lock().unwrap().push(post.clone());
        post
    }

    pub fn clear_posts(&self) {
        self.posts.lock().unwrap().clear();
    }

    pub fn follow_count(&self) -> usize {
        self.follows.lock().unwrap().len()
    }

    pub fn user(&self, user_id: Uuid) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
    }

    fn hydrate(&self, post: Post) -> PostRecord {
        let author = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == post.author_id)
            .cloned()
            .expect("post author missing from mock");
        let group = post.group_id.and_then(|group_id| {
            self.groups
                .lock()
                .unwrap()
                .iter()
                .find(|g| g.id == group_id)
                .cloned()
        });
        (post, author, group)
    }

    fn page<I: Iterator<Item = Post>>(&self, posts: I, offset: i64, limit: i64) -> Vec<PostRecord> {
        posts
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|post| self.hydrate(post))
            .collect()
    }
}

fn newest_first(mut posts: Vec<Post>) -> Vec<Post> {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    posts
}

#[async_trait]
impl super::Client for Client {
    async fn create_user(&self, new_user: NewUser) -> Fallible<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == new_user.username) {
            return Err(anyhow!("duplicate key value violates unique constraint")
                .describe(PublicFace {
                    kind: Kind::Conflict,
                    text: "username already taken",
                }));
        }
        let user = User {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> Fallible<Option<User>> {
        Ok(self.user(user_id))
    }

    async fn find_user(&self, username: &str) -> Fallible<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Fallible<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn set_password(&self, user_id: Uuid, password_hash: String) -> Fallible<()> {
        if let Some(user) = self
            .users
            .lock()
            .unwrap()
            .iter_mut()
            .find(|u| u.id == user_id)
        {
            user.password_hash = password_hash;
        }
        Ok(())
    }

    async fn create_group(&self, new_group: NewGroup) -> Fallible<Group> {
        let mut groups = self.groups.lock().unwrap();
        if groups.iter().any(|g| g.slug == new_group.slug) {
            return Err(anyhow!("duplicate key value violates unique constraint")
                .describe(PublicFace {
                    kind: Kind::Conflict,
                    text: "group slug already in use",
                }));
        }
        let group = Group {
            id: Uuid::new_v4(),
            title: new_group.title,
            slug: new_group.slug,
            description: new_group.description,
        };
        groups.push(group.clone());
        Ok(group)
    }

    async fn find_group(&self, slug: &str) -> Fallible<Option<Group>> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.slug == slug)
            .cloned())
    }

    async fn group_exists(&self, group_id: Uuid) -> Fallible<bool> {
        Ok(self.groups.lock().unwrap().iter().any(|g| g.id == group_id))
    }

    async fn new_post(&self, new_post: NewPost) -> Fallible<Post> {
        let post = Post {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            deleted_at: None,
            text: new_post.text,
            image: new_post.image,
            author_id: new_post.author_id,
            group_id: new_post.group_id,
        };
        self.posts.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn edit_post(&self, post_id: Uuid, edit: PostEdit) -> Fallible<Option<Post>> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter_mut()
            .find(|p| p.id == post_id)
            .map(|post| {
                post.text = edit.text;
                post.image = edit.image;
                post.group_id = edit.group_id;
                post.clone()
            }))
    }

    async fn find_post(&self, post_id: Uuid) -> Fallible<Option<PostRecord>> {
        let post = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == post_id && !p.is_deleted())
            .cloned();
        Ok(post.map(|post| self.hydrate(post)))
    }

    async fn delete_post(&self, post_id: Uuid) -> Fallible<Option<Post>> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter_mut()
            .find(|p| p.id == post_id)
            .map(|post| {
                post.deleted_at = Some(Utc::now());
                post.clone()
            }))
    }

    async fn list_posts(&self, filters: PostFilters) -> Fallible<Vec<PostRecord>> {
        let matching: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.matches(&filters))
            .cloned()
            .collect();
        Ok(self.page(
            newest_first(matching).into_iter(),
            filters.offset,
            filters.limit,
        ))
    }

    async fn count_posts(&self, filters: PostFilters) -> Fallible<i64> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.matches(&filters))
            .count() as i64)
    }

    async fn new_comment(&self, new_comment: NewComment) -> Fallible<Comment> {
        let comment = Comment {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            text: new_comment.text,
            author_id: new_comment.author_id,
            post_id: new_comment.post_id,
        };
        self.comments.lock().unwrap().push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, post_id: Uuid) -> Fallible<Vec<(Comment, User)>> {
        let mut matching: Vec<Comment> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching
            .into_iter()
            .map(|comment| {
                let author = self
                    .user(comment.author_id)
                    .expect("comment author missing from mock");
                (comment, author)
            })
            .collect())
    }

    async fn follow(&self, follower_id: Uuid, author_id: Uuid) -> Fallible<Follow> {
        let mut follows = self.follows.lock().unwrap();
        if follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.author_id == author_id)
        {
            return Err(anyhow!("duplicate key value violates unique constraint")
                .describe(PublicFace {
                    kind: Kind::Conflict,
                    text: "you already follow this author",
                }));
        }
        let follow = Follow {
            follower_id,
            author_id,
            created_at: Utc::now(),
        };
        follows.push(follow.clone());
        Ok(follow)
    }

    async fn unfollow(&self, follower_id: Uuid, author_id: Uuid) -> Fallible<bool> {
        let mut follows = self.follows.lock().unwrap();
        let before = follows.len();
        follows.retain(|f| !(f.follower_id == follower_id && f.author_id == author_id));
        Ok(follows.len() < before)
    }

    async fn is_following(&self, follower_id: Uuid, author_id: Uuid) -> Fallible<bool> {
        Ok(self
            .follows
            .lock()
            .unwrap()
            .iter()
            .any(|f| f.follower_id == follower_id && f.author_id == author_id))
    }

    async fn feed(&self, follower_id: Uuid, offset: i64, limit: i64) -> Fallible<Vec<PostRecord>> {
        let followed: Vec<Uuid> = self
            .follows
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.follower_id == follower_id)
            .map(|f| f.author_id)
            .collect();
        let matching: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| followed.contains(&p.author_id) && !p.is_deleted())
            .cloned()
            .collect();
        Ok(self.page(newest_first(matching).into_iter(), offset, limit))
    }

    async fn count_feed(&self, follower_id: Uuid) -> Fallible<i64> {
        let followed: Vec<Uuid> = self
            .follows
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.follower_id == follower_id)
            .map(|f| f.author_id)
            .collect();
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| followed.contains(&p.author_id) && !p.is_deleted())
            .count() as i64)
    }
}
