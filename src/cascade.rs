//! # Comment Tree Engine
//!
//! Cascading deletes for comments, posts and topics. Every function here takes the
//! caller's open transaction as a plain `&mut SqliteConnection` and never begins or
//! commits one itself. The caller opens the transaction once, threads it through,
//! and commits only if the whole cascade succeeded. Any error leaves the caller
//! to drop the transaction, which rolls back every row touched so far.

use std::collections::HashSet;

use sqlx::SqliteConnection;

use crate::{models::CascadeReport, repository::StoreError};

/// Deletes comment `comment_id` of post `post_id` together with its whole subtree.
///
/// The subtree is walked depth-first with an explicit stack, then deleted in reverse
/// discovery order so every child goes before its parent. No intermediate state has
/// an orphan, and the `parent_id` foreign key holds after every statement.
pub async fn delete_comment_tree(
    conn: &mut SqliteConnection,
    post_id: i64,
    comment_id: i64,
) -> Result<CascadeReport, StoreError> {
    let root: Option<i64> = sqlx::query_scalar("SELECT id FROM comments WHERE id = ? AND post_id = ?")
        .bind(comment_id)
        .bind(post_id)
        .fetch_optional(&mut *conn)
        .await?;
    if root.is_none() {
        return Err(StoreError::NotFound("comment"));
    }

    // Pre-order: a node is always recorded after its parent.
    let mut discovered = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![comment_id];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        discovered.push(id);

        let children: Vec<i64> = sqlx::query_scalar("SELECT id FROM comments WHERE parent_id = ?")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
        stack.extend(children);
    }

    let mut removed = 0;
    for &id in discovered.iter().skip(1).rev() {
        removed += sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }

    let result = sqlx::query("DELETE FROM comments WHERE id = ? AND post_id = ?")
        .bind(comment_id)
        .bind(post_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("comment"));
    }

    Ok(CascadeReport {
        comments: removed + result.rows_affected(),
        posts: 0,
    })
}

/// Deletes every comment on `post_id`, whatever its depth, then the post itself.
pub async fn delete_post_cascade(
    conn: &mut SqliteConnection,
    post_id: i64,
) -> Result<CascadeReport, StoreError> {
    // One statement: the self-referencing key is checked once the whole forest is gone.
    let comments = sqlx::query("DELETE FROM comments WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let posts = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(post_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if posts == 0 {
        return Err(StoreError::NotFound("post"));
    }

    Ok(CascadeReport { comments, posts })
}

/// Deletes topic `topic`, every post tagged with it and every comment on those posts.
///
/// A missing topic row is `NotFound` even when posts carrying the label were removed
/// first; the caller's rollback makes that earlier work invisible.
pub async fn delete_topic_cascade(
    conn: &mut SqliteConnection,
    topic: &str,
) -> Result<CascadeReport, StoreError> {
    let post_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM posts WHERE topic = ?")
        .bind(topic)
        .fetch_all(&mut *conn)
        .await?;

    let mut report = CascadeReport::default();
    for post_id in post_ids {
        let removed = delete_post_cascade(&mut *conn, post_id).await?;
        report.comments += removed.comments;
        report.posts += removed.posts;
    }

    let topics = sqlx::query("DELETE FROM topics WHERE topic = ?")
        .bind(topic)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if topics == 0 {
        return Err(StoreError::NotFound("topic"));
    }

    Ok(report)
}
