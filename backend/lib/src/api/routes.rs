//! Route definitions for the social API

use axum::{
    routing::{delete, get},
    Router,
};

use super::handlers::{self, chats, comments, posts, reactions, users};
use crate::services::Services;

/// Creates the router with all API routes
pub fn routes(services: Services) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(handlers::health_check))
        // Users
        .route("/users/current", get(users::current_user))
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/posts", get(posts::list_user_posts))
        // Posts
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/explore", get(posts::explore_posts))
        .route(
            "/posts/{post_id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/posts/{post_id}/reactions",
            get(reactions::list_post_reactions)
                .put(reactions::react_to_post)
                .delete(reactions::remove_post_reaction),
        )
        // Comments
        .route(
            "/posts/{post_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/posts/{post_id}/comments/{comment_id}",
            get(comments::get_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route(
            "/posts/{post_id}/comments/{comment_id}/reactions",
            get(reactions::list_comment_reactions)
                .put(reactions::react_to_comment)
                .delete(reactions::remove_comment_reaction),
        )
        // Chats
        .route("/chats", get(chats::list_chats))
        .route(
            "/chats/direct/{other_user_id}/messages",
            get(chats::list_direct_messages).post(chats::send_direct_message),
        )
        .route(
            "/chats/messages/{message_id}",
            delete(chats::delete_message),
        )
        // Add state to all routes
        .with_state(services)
}

#[cfg(all(test, feature = "mocks"))]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    use super::*;
    use crate::constants::{
        api::USER_ID_HEADER,
        mocks::{DEMO_ALICE_ID, DEMO_BOB_ID, DEMO_CAROL_ID, DEMO_MESSAGES, DEMO_POSTS_PER_USER},
    };

    fn server() -> TestServer {
        TestServer::new(routes(Services::mocks())).unwrap()
    }

    /// Newest post of the demo feed, written by carol
    async fn newest_post(server: &TestServer) -> Value {
        let page: Value = server
            .get("/posts")
            .add_header(USER_ID_HEADER, DEMO_CAROL_ID.to_string())
            .add_query_param("pageSize", 1)
            .await
            .json();
        page["items"][0].clone()
    }

    #[tokio::test]
    async fn test_feed_pages_through_all_posts() {
        let server = server();
        let total = DEMO_POSTS_PER_USER * 3;

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut request = server
                .get("/posts")
                .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
                .add_query_param("pageSize", 7);
            if let Some(cursor) = &cursor {
                request = request.add_query_param("cursor", cursor);
            }

            let response = request.await;
            assert_eq!(response.status_code(), StatusCode::OK);

            let page: Value = response.json();
            for item in page["items"].as_array().unwrap() {
                seen.push(item["postId"].as_str().unwrap().to_string());
            }

            if !page["hasMore"].as_bool().unwrap() {
                break;
            }
            cursor = page["nextCursor"].as_str().map(str::to_string);
        }

        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(seen.len(), total);
        assert_eq!(unique.len(), total);
    }

    #[tokio::test]
    async fn test_default_page_size_applied() {
        let response = server()
            .get("/posts")
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .await;

        let page: Value = response.json();
        assert_eq!(page["items"].as_array().unwrap().len(), 10);
        assert_eq!(page["hasMore"], true);
    }

    #[tokio::test]
    async fn test_out_of_range_page_size_rejected() {
        let server = server();

        for size in [0, 101] {
            let response = server
                .get("/posts")
                .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
                .add_query_param("pageSize", size)
                .await;
            assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_tampered_cursor_rejected() {
        let response = server()
            .get("/posts")
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .add_query_param("cursor", "%%%not-base64%%%")
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("Invalid cursor"));
    }

    #[tokio::test]
    async fn test_missing_user_header_unauthorized() {
        let response = server().get("/posts").await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_user_posts_only_from_author() {
        let response = server()
            .get(&format!("/users/{DEMO_BOB_ID}/posts"))
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .add_query_param("pageSize", 100)
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let page: Value = response.json();
        let items = page["items"].as_array().unwrap();
        assert_eq!(items.len(), DEMO_POSTS_PER_USER);
        assert!(items
            .iter()
            .all(|item| item["author"]["userId"] == DEMO_BOB_ID.to_string()));
        assert_eq!(page["hasMore"], false);
    }

    #[tokio::test]
    async fn test_explore_never_runs_dry() {
        let server = server();
        let total = DEMO_POSTS_PER_USER * 3;

        // walk to the last forward page, then ask once more
        let mut cursor: Option<String> = None;
        for _ in 0..(total / 10) {
            let mut request = server
                .get("/posts/explore")
                .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string());
            if let Some(cursor) = &cursor {
                request = request.add_query_param("cursor", cursor);
            }
            let page: Value = request.await.json();
            assert_eq!(page["items"].as_array().unwrap().len(), 10);
            cursor = page["nextCursor"].as_str().map(str::to_string);
        }

        let page: Value = server
            .get("/posts/explore")
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .add_query_param("cursor", cursor.unwrap())
            .await
            .json();

        // the short tail is topped up with the oldest posts
        assert_eq!(page["items"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_create_post_then_comment() {
        let server = server();

        let post = server
            .post("/posts")
            .add_header(USER_ID_HEADER, DEMO_CAROL_ID.to_string())
            .json(&json!({ "content": "fresh post" }))
            .await;
        assert_eq!(post.status_code(), StatusCode::CREATED);
        let post: Value = post.json();
        let post_id = post["postId"].as_str().unwrap().to_string();

        let comment = server
            .post(&format!("/posts/{post_id}/comments"))
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .json(&json!({ "content": "nice" }))
            .await;
        assert_eq!(comment.status_code(), StatusCode::CREATED);
        let comment_id = comment.json::<Value>()["commentId"]
            .as_str()
            .unwrap()
            .to_string();

        let reply = server
            .post(&format!("/posts/{post_id}/comments"))
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .json(&json!({ "content": "agreed", "parentCommentId": comment_id }))
            .await;
        assert_eq!(reply.status_code(), StatusCode::CREATED);

        let top: Value = server
            .get(&format!("/posts/{post_id}/comments"))
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .await
            .json();
        assert_eq!(top["items"][0]["totalReplies"], 1);

        let replies: Value = server
            .get(&format!("/posts/{post_id}/comments"))
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .add_query_param("parentCommentId", &comment_id)
            .await
            .json();
        assert_eq!(replies["items"][0]["content"], "agreed");
    }

    #[tokio::test]
    async fn test_comments_of_unknown_post_not_found() {
        let response = server()
            .get(&format!("/posts/{}/comments", uuid::Uuid::new_v4()))
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .await;

        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_direct_messages_newest_first() {
        let response = server()
            .get(&format!("/chats/direct/{DEMO_BOB_ID}/messages"))
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .add_query_param("pageSize", 5)
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let page: Value = response.json();
        assert_eq!(page["items"][0]["content"], format!("Message {DEMO_MESSAGES}"));
        assert_eq!(page["hasMore"], true);
    }

    #[tokio::test]
    async fn test_send_message_opens_chat() {
        let server = server();

        let empty: Value = server
            .get(&format!("/chats/direct/{DEMO_CAROL_ID}/messages"))
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .await
            .json();
        assert_eq!(empty["items"].as_array().unwrap().len(), 0);
        assert_eq!(empty["hasMore"], false);

        let sent = server
            .post(&format!("/chats/direct/{DEMO_CAROL_ID}/messages"))
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .json(&json!({ "content": "hi carol" }))
            .await;
        assert_eq!(sent.status_code(), StatusCode::CREATED);

        let chats: Value = server
            .get("/chats")
            .add_header(USER_ID_HEADER, DEMO_CAROL_ID.to_string())
            .await
            .json();
        assert_eq!(chats["items"].as_array().unwrap().len(), 1);
        assert_eq!(chats["items"][0]["chatType"], "direct");
    }

    #[tokio::test]
    async fn test_user_profiles() {
        let server = server();

        let me: Value = server
            .get("/users/current")
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .await
            .json();
        assert_eq!(me["userId"], DEMO_BOB_ID.to_string());
        assert_eq!(me["username"], "bob");

        let carol: Value = server
            .get(&format!("/users/{DEMO_CAROL_ID}"))
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .await
            .json();
        assert_eq!(carol["username"], "carol");

        let missing = server
            .get(&format!("/users/{}", uuid::Uuid::new_v4()))
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .await;
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_posts_carry_counts_for_the_viewer() {
        let post = newest_post(&server()).await;

        assert_eq!(post["author"]["userId"], DEMO_CAROL_ID.to_string());
        assert_eq!(post["commentCount"], 2);
        assert_eq!(post["reactions"]["total"], 2);
        assert_eq!(post["reactions"]["counts"]["love"], 1);
        assert_eq!(post["reactions"]["userReaction"], "love");
    }

    #[tokio::test]
    async fn test_only_author_edits_and_deletes_post() {
        let server = server();
        let post_id = newest_post(&server).await["postId"]
            .as_str()
            .unwrap()
            .to_string();
        let path = format!("/posts/{post_id}");

        let forbidden = server
            .put(&path)
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .json(&json!({ "content": "hijacked" }))
            .await;
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

        let edited = server
            .put(&path)
            .add_header(USER_ID_HEADER, DEMO_CAROL_ID.to_string())
            .json(&json!({ "content": "edited" }))
            .await;
        assert_eq!(edited.status_code(), StatusCode::OK);
        let edited: Value = edited.json();
        assert_eq!(edited["content"], "edited");
        assert!(edited["updatedAt"].is_string());

        let denied = server
            .delete(&path)
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .await;
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);

        let deleted = server
            .delete(&path)
            .add_header(USER_ID_HEADER, DEMO_CAROL_ID.to_string())
            .await;
        assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

        let gone = server
            .get(&path)
            .add_header(USER_ID_HEADER, DEMO_CAROL_ID.to_string())
            .await;
        assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_comment_edit_and_delete() {
        let server = server();
        let post_id = newest_post(&server).await["postId"]
            .as_str()
            .unwrap()
            .to_string();

        let top: Value = server
            .get(&format!("/posts/{post_id}/comments"))
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .await
            .json();
        let comment_id = top["items"][0]["commentId"].as_str().unwrap().to_string();
        let path = format!("/posts/{post_id}/comments/{comment_id}");

        let edited: Value = server
            .put(&path)
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .json(&json!({ "content": "First! (edited)" }))
            .await
            .json();
        assert_eq!(edited["content"], "First! (edited)");
        assert_eq!(edited["totalReplies"], 1);

        let forbidden = server
            .delete(&path)
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .await;
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

        let deleted = server
            .delete(&path)
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .await;
        assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

        let post: Value = server
            .get(&format!("/posts/{post_id}"))
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .await
            .json();
        assert_eq!(post["commentCount"], 0);
    }

    #[tokio::test]
    async fn test_reactions_on_posts_and_comments() {
        let server = server();
        let post_id = newest_post(&server).await["postId"]
            .as_str()
            .unwrap()
            .to_string();

        let summary: Value = server
            .put(&format!("/posts/{post_id}/reactions"))
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .json(&json!({ "reactionType": "wow" }))
            .await
            .json();
        assert_eq!(summary["total"], 3);
        assert_eq!(summary["userReaction"], "wow");

        let listed: Value = server
            .get(&format!("/posts/{post_id}/reactions"))
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .await
            .json();
        assert_eq!(listed["items"][0]["user"]["userId"], DEMO_ALICE_ID.to_string());
        assert_eq!(listed["items"][0]["reactionType"], "wow");

        let unknown = server
            .put(&format!("/posts/{post_id}/reactions"))
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .json(&json!({ "reactionType": "meh" }))
            .await;
        assert_eq!(unknown.status_code(), StatusCode::BAD_REQUEST);

        let removed = server
            .delete(&format!("/posts/{post_id}/reactions"))
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .await;
        assert_eq!(removed.status_code(), StatusCode::NO_CONTENT);

        let post: Value = server
            .get(&format!("/posts/{post_id}"))
            .add_header(USER_ID_HEADER, DEMO_CAROL_ID.to_string())
            .await
            .json();
        assert_eq!(post["reactions"]["total"], 2);
        assert_eq!(post["reactions"]["counts"]["like"], 0);

        let top: Value = server
            .get(&format!("/posts/{post_id}/comments"))
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .await
            .json();
        let comment_id = top["items"][0]["commentId"].as_str().unwrap();
        let path = format!("/posts/{post_id}/comments/{comment_id}/reactions");

        let summary: Value = server
            .put(&path)
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .json(&json!({ "reactionType": "Haha" }))
            .await
            .json();
        assert_eq!(summary["counts"]["haha"], 1);

        let comment: Value = server
            .get(&format!("/posts/{post_id}/comments/{comment_id}"))
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .await
            .json();
        assert_eq!(comment["reactions"]["userReaction"], "haha");
    }

    #[tokio::test]
    async fn test_direct_messages_before_and_after() {
        let server = server();
        let path = format!("/chats/direct/{DEMO_BOB_ID}/messages");

        let first: Value = server
            .get(&path)
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .add_query_param("pageSize", 5)
            .await
            .json();
        let boundary = first["nextCursor"].as_str().unwrap().to_string();

        let older: Value = server
            .get(&path)
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .add_query_param("pageSize", 5)
            .add_query_param("before", &boundary)
            .await
            .json();
        assert_eq!(
            older["items"][0]["content"],
            format!("Message {}", DEMO_MESSAGES - 5)
        );

        let newer: Value = server
            .get(&path)
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .add_query_param("pageSize", 50)
            .add_query_param("after", &boundary)
            .await
            .json();
        let items = newer["items"].as_array().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0]["content"], format!("Message {DEMO_MESSAGES}"));
        assert_eq!(newer["hasMore"], false);

        let conflicting = server
            .get(&path)
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .add_query_param("cursor", &boundary)
            .add_query_param("before", first["items"][0]["messageId"].as_str().unwrap())
            .await;
        assert_eq!(conflicting.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sender_deletes_message() {
        let server = server();
        let path = format!("/chats/direct/{DEMO_BOB_ID}/messages");

        let sent: Value = server
            .post(&path)
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .json(&json!({ "content": "oops" }))
            .await
            .json();
        let message_path = format!("/chats/messages/{}", sent["messageId"].as_str().unwrap());

        let forbidden = server
            .delete(&message_path)
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .await;
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

        let deleted = server
            .delete(&message_path)
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .await;
        assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

        let again = server
            .delete(&message_path)
            .add_header(USER_ID_HEADER, DEMO_ALICE_ID.to_string())
            .await;
        assert_eq!(again.status_code(), StatusCode::NOT_FOUND);

        let latest: Value = server
            .get(&path)
            .add_header(USER_ID_HEADER, DEMO_BOB_ID.to_string())
            .add_query_param("pageSize", 1)
            .await
            .json();
        assert_eq!(latest["items"][0]["content"], format!("Message {DEMO_MESSAGES}"));
    }
}
