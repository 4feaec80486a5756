use chrono::Utc;
use forum_backend::models::{
    CascadeReport, Comment, CreatePostRequest, DeleteResponse, Post, UpdatePostRequest, User,
    UserSnapshot,
};
use serde_json::json;

#[test]
fn test_user_snapshot_uses_integer_admin_flag() {
    let snapshot = UserSnapshot {
        id: 7,
        username: "grace".to_string(),
        is_admin: true,
    };
    assert_eq!(
        serde_json::to_value(&snapshot).unwrap(),
        json!({"id": 7, "username": "grace", "isAdmin": 1})
    );

    let parsed: UserSnapshot =
        serde_json::from_value(json!({"id": 7, "username": "grace", "isAdmin": 0})).unwrap();
    assert!(!parsed.is_admin);

    assert!(
        serde_json::from_value::<UserSnapshot>(json!({"id": 7, "username": "g", "isAdmin": true}))
            .is_err()
    );
}

#[test]
fn test_user_debug_redacts_hash_and_snapshot_drops_it() {
    let user = User {
        id: 1,
        username: "root".to_string(),
        password_hash: "$argon2id$secret".to_string(),
        is_admin: true,
    };

    assert!(!format!("{user:?}").contains("secret"));
    let snapshot = serde_json::to_string(&user.snapshot()).unwrap();
    assert!(!snapshot.contains("argon2"));
    assert!(!snapshot.contains("password"));
}

#[test]
fn test_post_and_comment_field_names() {
    let now = Utc::now();
    let post = Post {
        id: 1,
        title: "t".to_string(),
        topic: "Physics".to_string(),
        content: "c".to_string(),
        author: 2,
        username: "alice".to_string(),
        created_at: now,
    };
    let value = serde_json::to_value(&post).unwrap();
    for key in ["id", "title", "topic", "content", "author", "username", "created_at"] {
        assert!(value.get(key).is_some(), "post is missing {key}");
    }

    let root = Comment {
        id: 3,
        post_id: 1,
        parent_id: None,
        author: 2,
        username: "alice".to_string(),
        content: "hi".to_string(),
        created_at: now,
    };
    assert_eq!(serde_json::to_value(&root).unwrap()["parent_id"], json!(null));
}

#[test]
fn test_request_payloads_default_missing_fields() {
    let create: CreatePostRequest = serde_json::from_value(json!({"title": "only"})).unwrap();
    assert_eq!(create.title, "only");
    assert!(create.content.is_empty());

    let update: UpdatePostRequest =
        serde_json::from_value(json!({"title": "t", "content": "c"})).unwrap();
    assert!(update.topic.is_none());
}

#[test]
fn test_delete_response_shape() {
    let response = DeleteResponse::from(CascadeReport {
        comments: 4,
        posts: 1,
    });
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"success": true, "removed": {"comments": 4, "posts": 1}})
    );
}
