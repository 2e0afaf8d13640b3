// Mirrors migrations/2025-01-01-000000_create_social/up.sql

diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    posts (id) {
        id -> Uuid,
        user_id -> Uuid,
        content -> Text,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    comments (id) {
        id -> Uuid,
        post_id -> Uuid,
        user_id -> Uuid,
        parent_comment_id -> Nullable<Uuid>,
        content -> Text,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    chats (id) {
        id -> Uuid,
        chat_type -> Text,
        name -> Nullable<Text>,
        direct_key -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    chat_participants (chat_id, user_id) {
        chat_id -> Uuid,
        user_id -> Uuid,
        joined_at -> Timestamptz,
    }
}

diesel::table! {
    messages (id) {
        id -> Uuid,
        chat_id -> Uuid,
        user_id -> Uuid,
        content -> Text,
        sent_at -> Timestamptz,
        is_deleted -> Bool,
    }
}

diesel::table! {
    reactions (id) {
        id -> Uuid,
        user_id -> Uuid,
        target_type -> Text,
        target_id -> Uuid,
        reaction_type -> Int2,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(posts -> users (user_id));
diesel::joinable!(comments -> posts (post_id));
diesel::joinable!(comments -> users (user_id));
diesel::joinable!(chat_participants -> chats (chat_id));
diesel::joinable!(chat_participants -> users (user_id));
diesel::joinable!(messages -> chats (chat_id));
diesel::joinable!(messages -> users (user_id));
diesel::joinable!(reactions -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    posts,
    comments,
    chats,
    chat_participants,
    messages,
    reactions,
);
