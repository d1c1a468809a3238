#[allow(unused_imports)]
use diesel::sql_types::*;

table! {
    users (id) {
        id -> Uuid,
        created_at -> Timestamptz,
        username -> Text,
        email -> Text,
        password_hash -> Text,
        first_name -> Text,
        last_name -> Text,
    }
}

table! {
    groups (id) {
        id -> Uuid,
        title -> Text,
        slug -> Text,
        description -> Text,
    }
}

table! {
    posts (id) {
        id -> Uuid,
        created_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
        text -> Text,
        image -> Nullable<Text>,
        author_id -> Uuid,
        group_id -> Nullable<Uuid>,
    }
}

table! {
    comments (id) {
        id -> Uuid,
        created_at -> Timestamptz,
        text -> Text,
        author_id -> Uuid,
        post_id -> Uuid,
    }
}

// The composite primary key doubles as the uniqueness constraint on the
// (follower, author) edge: a second insert of the same pair is a constraint
// violation, not a duplicate row.
table! {
    follows (follower_id, author_id) {
        follower_id -> Uuid,
        author_id -> Uuid,
        created_at -> Timestamptz,
    }
}

joinable!(posts -> users (author_id));
joinable!(posts -> groups (group_id));
joinable!(comments -> users (author_id));
joinable!(comments -> posts (post_id));

allow_tables_to_appear_in_same_query!(comments, follows, groups, posts, users);
