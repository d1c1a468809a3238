use crate::datastore::{
    postfilters::PostFilters,
    postgres::{
        errors::{BlockingResp, DbPoolResult},
        PostgresStore,
    },
    structs::{
        Comment, Follow, Group, NewComment, NewFollow, NewGroup, NewPost, NewUser, Post, PostEdit,
        PostRecord, User,
    },
    tables::{comments, follows, groups, posts, users},
    Client,
};
use crate::facade::{Describe, FacadeError, Fallible, Kind, PublicFace};
use actix_web::web::block;
use async_trait::async_trait;
use diesel::{
    dsl::{exists, now},
    query_dsl::{QueryDsl, RunQueryDsl},
    result::{DatabaseErrorKind, Error as DieselError},
    Connection, ExpressionMethods, OptionalExtension, TextExpressionMethods,
};
use uuid::Uuid;

// Applies each set field of a PostFilters to a boxed posts query. A macro rather
// than a function so the same filters work on both the bare table (counts) and the
// author/group join (listings).
macro_rules! with_filters {
    ($query:expr, $filters:expr) => {{
        let filters = &$filters;
        let mut query = $query;
        if let Some(id) = filters.id {
            query = query.filter(posts::id.eq(id));
        }
        if let Some(author_id) = filters.author_id {
            query = query.filter(posts::author_id.eq(author_id));
        }
        if let Some(group_id) = filters.group_id {
            query = query.filter(posts::group_id.eq(group_id));
        }
        if let Some(is_deleted) = filters.is_deleted {
            if is_deleted {
                query = query.filter(posts::deleted_at.is_not_null());
            } else {
                query = query.filter(posts::deleted_at.is_null());
            }
        }
        if let Some(substring) = &filters.text_contains {
            query = query.filter(posts::text.like(format!("%{}%", substring)));
        }
        query
    }};
}

#[async_trait]
impl Client for PostgresStore {
    async fn create_user(&self, new_user: NewUser) -> Fallible<User> {
        let conn = self.pool.get()?;
        let user = block(move || {
            let inserted: Result<User, DieselError> = diesel::insert_into(users::table)
                .values(&new_user)
                .get_result(&conn);
            match inserted {
                Err(err @ DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                    Err(err.describe(PublicFace {
                        kind: Kind::Conflict,
                        text: "username already taken",
                    }))
                }
                other => other.map_err(FacadeError::from),
            }
        })
        .await
        .to_resp()?;
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> Fallible<Option<User>> {
        let conn = self.pool.get()?;
        let query_result: DbPoolResult<_> = block(move || {
            let user: Option<User> = users::table.find(user_id).first(&conn).optional()?;
            Ok(user)
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn find_user(&self, username: &str) -> Fallible<Option<User>> {
        let conn = self.pool.get()?;
        let username = username.to_owned();
        let query_result: DbPoolResult<_> = block(move || {
            let user: Option<User> = users::table
                .filter(users::username.eq(username))
                .first(&conn)
                .optional()?;
            Ok(user)
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn find_user_by_email(&self, email: &str) -> Fallible<Option<User>> {
        let conn = self.pool.get()?;
        let email = email.to_owned();
        let query_result: DbPoolResult<_> = block(move || {
            let user: Option<User> = users::table
                .filter(users::email.eq(email))
                .first(&conn)
                .optional()?;
            Ok(user)
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn set_password(&self, user_id: Uuid, password_hash: String) -> Fallible<()> {
        let conn = self.pool.get()?;
        let query_result: DbPoolResult<_> = block(move || {
            diesel::update(users::table.find(user_id))
                .set(users::password_hash.eq(password_hash))
                .execute(&conn)?;
            Ok(())
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn create_group(&self, new_group: NewGroup) -> Fallible<Group> {
        let conn = self.pool.get()?;
        let group = block(move || {
            let inserted: Result<Group, DieselError> = diesel::insert_into(groups::table)
                .values(&new_group)
                .get_result(&conn);
            match inserted {
                Err(err @ DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                    Err(err.describe(PublicFace {
                        kind: Kind::Conflict,
                        text: "group slug already in use",
                    }))
                }
                other => other.map_err(FacadeError::from),
            }
        })
        .await
        .to_resp()?;
        Ok(group)
    }

    async fn find_group(&self, slug: &str) -> Fallible<Option<Group>> {
        let conn = self.pool.get()?;
        let slug = slug.to_owned();
        let query_result: DbPoolResult<_> = block(move || {
            let group: Option<Group> = groups::table
                .filter(groups::slug.eq(slug))
                .first(&conn)
                .optional()?;
            Ok(group)
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn group_exists(&self, group_id: Uuid) -> Fallible<bool> {
        let conn = self.pool.get()?;
        let query_result: DbPoolResult<_> = block(move || {
            let found: bool =
                diesel::select(exists(groups::table.find(group_id))).get_result(&conn)?;
            Ok(found)
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn new_post(&self, new_post: NewPost) -> Fallible<Post> {
        let conn = self.pool.get()?;
        let post = block(move || {
            conn.transaction::<_, FacadeError, _>(|| {
                // Insert the new post
                let post: Post = diesel::insert_into(posts::table)
                    .values(&new_post)
                    .get_result(&conn)?;

                Ok(post)
            })
        })
        .await
        .to_resp()?;
        Ok(post)
    }

    async fn edit_post(&self, post_id: Uuid, edit: PostEdit) -> Fallible<Option<Post>> {
        let conn = self.pool.get()?;
        let query_result: DbPoolResult<_> = block(move || {
            let post: Option<Post> = diesel::update(posts::table.find(post_id))
                .set((
                    posts::text.eq(edit.text),
                    posts::image.eq(edit.image),
                    posts::group_id.eq(edit.group_id),
                ))
                .get_result(&conn)
                .optional()?;
            Ok(post)
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn find_post(&self, post_id: Uuid) -> Fallible<Option<PostRecord>> {
        let conn = self.pool.get()?;
        let query_result: DbPoolResult<_> = block(move || {
            let record: Option<PostRecord> = posts::table
                .inner_join(users::table)
                .left_join(groups::table)
                .filter(posts::id.eq(post_id))
                .filter(posts::deleted_at.is_null())
                .first(&conn)
                .optional()?;
            Ok(record)
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn delete_post(&self, post_id: Uuid) -> Fallible<Option<Post>> {
        let conn = self.pool.get()?;
        let post = block(move || {
            conn.transaction::<_, anyhow::Error, _>(|| {
                // Soft-delete: listings filter on deleted_at instead of losing the row.
                let target = posts::table.find(post_id);
                let query_result: Option<Post> = diesel::update(target)
                    .set(posts::deleted_at.eq(now))
                    .get_result::<Post>(&conn)
                    .optional()?;

                Ok(query_result)
            })
        })
        .await
        .to_resp()?;
        Ok(post)
    }

    async fn list_posts(&self, filters: PostFilters) -> Fallible<Vec<PostRecord>> {
        let conn = self.pool.get()?;
        let query_result: DbPoolResult<_> = block(move || {
            let query = with_filters!(
                posts::table
                    .inner_join(users::table)
                    .left_join(groups::table)
                    .into_boxed(),
                filters
            );
            let records: Vec<PostRecord> = query
                .order_by(posts::created_at.desc())
                .offset(filters.offset)
                .limit(filters.limit)
                .get_results(&conn)?;
            Ok(records)
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn count_posts(&self, filters: PostFilters) -> Fallible<i64> {
        let conn = self.pool.get()?;
        let query_result: DbPoolResult<_> = block(move || {
            let query = with_filters!(posts::table.into_boxed(), filters);
            let total: i64 = query.count().get_result(&conn)?;
            Ok(total)
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn new_comment(&self, new_comment: NewComment) -> Fallible<Comment> {
        let conn = self.pool.get()?;
        let comment = block(move || {
            conn.transaction::<_, FacadeError, _>(|| {
                let comment: Comment = diesel::insert_into(comments::table)
                    .values(&new_comment)
                    .get_result(&conn)?;

                Ok(comment)
            })
        })
        .await
        .to_resp()?;
        Ok(comment)
    }

    async fn list_comments(&self, post_id: Uuid) -> Fallible<Vec<(Comment, User)>> {
        let conn = self.pool.get()?;
        let query_result: DbPoolResult<_> = block(move || {
            let comments: Vec<(Comment, User)> = comments::table
                .inner_join(users::table)
                .filter(comments::post_id.eq(post_id))
                .order_by(comments::created_at.asc())
                .get_results(&conn)?;
            Ok(comments)
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn follow(&self, follower_id: Uuid, author_id: Uuid) -> Fallible<Follow> {
        let conn = self.pool.get()?;
        let new_follow = NewFollow {
            follower_id,
            author_id,
        };
        let follow = block(move || {
            // The composite primary key is the enforcement mechanism for edge
            // uniqueness; racing inserts leave exactly one winner.
            let inserted: Result<Follow, DieselError> = diesel::insert_into(follows::table)
                .values(&new_follow)
                .get_result(&conn);
            match inserted {
                Err(err @ DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                    Err(err.describe(PublicFace {
                        kind: Kind::Conflict,
                        text: "you already follow this author",
                    }))
                }
                other => other.map_err(FacadeError::from),
            }
        })
        .await
        .to_resp()?;
        Ok(follow)
    }

    async fn unfollow(&self, follower_id: Uuid, author_id: Uuid) -> Fallible<bool> {
        let conn = self.pool.get()?;
        let query_result: DbPoolResult<_> = block(move || {
            // Removing an absent edge is not an error, just a no-op.
            let deleted = diesel::delete(follows::table.find((follower_id, author_id)))
                .execute(&conn)?;
            Ok(deleted > 0)
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn is_following(&self, follower_id: Uuid, author_id: Uuid) -> Fallible<bool> {
        let conn = self.pool.get()?;
        let query_result: DbPoolResult<_> = block(move || {
            let found: bool =
                diesel::select(exists(follows::table.find((follower_id, author_id))))
                    .get_result(&conn)?;
            Ok(found)
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn feed(&self, follower_id: Uuid, offset: i64, limit: i64) -> Fallible<Vec<PostRecord>> {
        let conn = self.pool.get()?;
        let query_result: DbPoolResult<_> = block(move || {
            let followed_authors = follows::table
                .filter(follows::follower_id.eq(follower_id))
                .select(follows::author_id);
            let records: Vec<PostRecord> = posts::table
                .inner_join(users::table)
                .left_join(groups::table)
                .filter(posts::author_id.eq_any(followed_authors))
                .filter(posts::deleted_at.is_null())
                .order_by(posts::created_at.desc())
                .offset(offset)
                .limit(limit)
                .get_results(&conn)?;
            Ok(records)
        })
        .await;
        Ok(query_result.to_resp()?)
    }

    async fn count_feed(&self, follower_id: Uuid) -> Fallible<i64> {
        let conn = self.pool.get()?;
        let query_result: DbPoolResult<_> = block(move || {
            let followed_authors = follows::table
                .filter(follows::follower_id.eq(follower_id))
                .select(follows::author_id);
            let total: i64 = posts::table
                .filter(posts::author_id.eq_any(followed_authors))
                .filter(posts::deleted_at.is_null())
                .count()
                .get_result(&conn)?;
            Ok(total)
        })
        .await;
        Ok(query_result.to_resp()?)
    }
}
