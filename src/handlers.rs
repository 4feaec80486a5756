use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{
        CascadeReport, Comment, CommentRequest, CreatePostRequest, Credentials, DeleteResponse,
        MessageResponse, Post, Topic, TopicRequest, UpdatePostRequest, UserSnapshot,
        UsernameResponse,
    },
    password,
    token,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::info;

/// Label the frontend uses for "no topic filter"; it can never be created as a topic.
pub const ALL_POSTS_LABEL: &str = "All Posts";

// --- Filter Structs ---

/// PostFilter
///
/// Query parameters for `GET /api/posts`.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct PostFilter {
    /// Only return posts tagged with this topic.
    pub topic: Option<String>,
}

/// Rejects a missing or blank required field with a 400.
fn require(value: &str, message: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::Validation(message.to_string()))
    } else {
        Ok(())
    }
}

/// Runs a CPU-bound password operation off the async workers.
async fn blocking<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, argon2::password_hash::Error> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))
}

// --- Accounts & Session ---

/// create_account
///
/// [Public Route] Registers a new, non-admin user.
#[utoipa::path(
    post,
    path = "/api/create_account",
    request_body = Credentials,
    responses(
        (status = 201, description = "Account Created", body = MessageResponse),
        (status = 400, description = "Missing Field"),
        (status = 409, description = "Username Taken")
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    require(&payload.username, "username and password are required")?;
    require(&payload.password, "username and password are required")?;

    let plain = payload.password;
    let hash = blocking(move || password::hash_password(&plain)).await?;

    let user = state.repo.create_user(&payload.username, &hash).await?;
    info!(user_id = user.id, username = %user.username, "account created");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Account created successfully")),
    ))
}

/// login
///
/// [Public Route] Verifies the password and sets the `jwt` session cookie.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Logged In", body = MessageResponse),
        (status = 401, description = "Wrong Password"),
        (status = 404, description = "Unknown User")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<Credentials>,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    require(&payload.username, "username and password are required")?;
    require(&payload.password, "username and password are required")?;

    let user = state
        .repo
        .find_user_by_username(&payload.username)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let stored = user.password_hash.clone();
    let plain = payload.password;
    if !blocking(move || password::verify_password(&plain, &stored)).await? {
        info!(username = %user.username, "login rejected: wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let issued = state.tokens.issue(&user.snapshot())?;
    info!(user_id = user.id, "login succeeded");

    Ok((
        jar.add(token::session_cookie(&issued)),
        Json(MessageResponse::new("Login successful")),
    ))
}

/// logout
///
/// [Public Route] Clears the session cookie. The credential itself stays valid until
/// it expires; no server-side state is touched.
#[utoipa::path(
    get,
    path = "/api/logout",
    responses((status = 200, description = "Logged Out", body = MessageResponse))
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.add(token::cleared_cookie()),
        Json(MessageResponse::new("Logged out successfully")),
    )
}

/// protected
///
/// [Authenticated Route] Echoes the caller's sanitized identity.
#[utoipa::path(
    get,
    path = "/api/protected",
    responses(
        (status = 200, description = "Current User", body = UserSnapshot),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn protected(user: AuthUser) -> Json<UserSnapshot> {
    Json(UserSnapshot::from(&user))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Username", body = UsernameResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_username(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UsernameResponse>, ApiError> {
    let username = state
        .repo
        .get_username(user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(UsernameResponse { username }))
}

// --- Posts ---

/// list_posts
///
/// [Public Route] All posts, newest first. An empty topic or the "All Posts" label
/// means no filter.
#[utoipa::path(
    get,
    path = "/api/posts",
    params(PostFilter),
    responses((status = 200, description = "Posts", body = [Post]))
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let topic = filter
        .topic
        .as_deref()
        .filter(|t| !t.is_empty() && *t != ALL_POSTS_LABEL);
    Ok(Json(state.repo.list_posts(topic).await?))
}

#[utoipa::path(
    get,
    path = "/api/posts/{post_id}",
    params(("post_id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post", body = Post),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Post>, ApiError> {
    let post = state
        .repo
        .get_post(post_id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(post))
}

/// create_post
///
/// [Authenticated Route] The author is the caller, whatever the body says.
#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post Created", body = Post),
        (status = 400, description = "Missing Field"),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn create_post(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    require(&payload.title, "post title and content are required")?;
    require(&payload.content, "post title and content are required")?;

    let post = state.repo.create_post(user_id, &payload).await?;
    info!(user_id, post_id = post.id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Owner-or-Admin Route] Ownership was checked by the guard layer.
#[utoipa::path(
    patch,
    path = "/api/posts/{post_id}",
    params(("post_id" = i64, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Post Updated", body = Post),
        (status = 400, description = "Missing Field"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    require(&payload.title, "post title and content are required")?;
    require(&payload.content, "post title and content are required")?;

    Ok(Json(state.repo.update_post(post_id, &payload).await?))
}

/// delete_post
///
/// [Owner-or-Admin Route] Removes the post and its whole comment forest atomically.
#[utoipa::path(
    delete,
    path = "/api/posts/{post_id}",
    params(("post_id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Deleted", body = DeleteResponse),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let report = state.repo.delete_post(post_id).await?;
    Ok(Json(report.into()))
}

// --- Comments ---

#[utoipa::path(
    get,
    path = "/api/posts/{post_id}/comments",
    params(("post_id" = i64, Path, description = "Post id")),
    responses((status = 200, description = "Top-level Comments", body = [Comment]))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.repo.list_root_comments(post_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/posts/{post_id}/comments/{comment_id}",
    params(
        ("post_id" = i64, Path, description = "Post id"),
        ("comment_id" = i64, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment", body = Comment),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Json<Comment>, ApiError> {
    let comment = state
        .repo
        .get_comment(post_id, comment_id)
        .await?
        .ok_or(ApiError::NotFound("comment"))?;
    Ok(Json(comment))
}

#[utoipa::path(
    get,
    path = "/api/posts/{post_id}/comments/{comment_id}/subcomments",
    params(
        ("post_id" = i64, Path, description = "Post id"),
        ("comment_id" = i64, Path, description = "Parent comment id")
    ),
    responses((status = 200, description = "Direct Replies", body = [Comment]))
)]
pub async fn list_subcomments(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.repo.list_replies(post_id, comment_id).await?))
}

/// create_comment
///
/// [Authenticated Route] Adds a top-level comment to an existing post.
#[utoipa::path(
    post,
    path = "/api/posts/{post_id}/comments",
    params(("post_id" = i64, Path, description = "Post id")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment Added", body = Comment),
        (status = 400, description = "Missing Field"),
        (status = 404, description = "No Such Post")
    )
)]
pub async fn create_comment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    require(&payload.content, "comment content is required")?;

    let comment = state
        .repo
        .create_comment(post_id, None, user_id, &payload.content)
        .await?;
    info!(user_id, post_id, comment_id = comment.id, "comment created");
    Ok((StatusCode::CREATED, Json(comment)))
}

/// create_subcomment
///
/// [Authenticated Route] Replies to `comment_id`, which must belong to `post_id`.
#[utoipa::path(
    post,
    path = "/api/posts/{post_id}/comments/{comment_id}",
    params(
        ("post_id" = i64, Path, description = "Post id"),
        ("comment_id" = i64, Path, description = "Parent comment id")
    ),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Reply Added", body = Comment),
        (status = 400, description = "Missing Field"),
        (status = 404, description = "No Such Post Or Parent")
    )
)]
pub async fn create_subcomment(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path((post_id, parent_id)): Path<(i64, i64)>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    require(&payload.content, "comment content is required")?;

    let comment = state
        .repo
        .create_comment(post_id, Some(parent_id), user_id, &payload.content)
        .await?;
    info!(user_id, post_id, parent_id, comment_id = comment.id, "reply created");
    Ok((StatusCode::CREATED, Json(comment)))
}

/// update_comment
///
/// [Owner-or-Admin Route]
#[utoipa::path(
    patch,
    path = "/api/posts/{post_id}/comments/{comment_id}",
    params(
        ("post_id" = i64, Path, description = "Post id"),
        ("comment_id" = i64, Path, description = "Comment id")
    ),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Comment Updated", body = Comment),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    require(&payload.content, "comment content is required")?;

    Ok(Json(
        state
            .repo
            .update_comment(post_id, comment_id, &payload.content)
            .await?,
    ))
}

/// delete_comment
///
/// [Owner-or-Admin Route] Removes the comment and every reply below it, or nothing.
#[utoipa::path(
    delete,
    path = "/api/posts/{post_id}/comments/{comment_id}",
    params(
        ("post_id" = i64, Path, description = "Post id"),
        ("comment_id" = i64, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Subtree Deleted", body = DeleteResponse),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let report: CascadeReport = state.repo.delete_comment(post_id, comment_id).await?;
    Ok(Json(report.into()))
}

// --- Topics ---

#[utoipa::path(
    get,
    path = "/api/topics",
    responses((status = 200, description = "Topics", body = [Topic]))
)]
pub async fn list_topics(State(state): State<AppState>) -> Result<Json<Vec<Topic>>, ApiError> {
    Ok(Json(state.repo.list_topics().await?))
}

/// create_topic
///
/// [Admin Route]
#[utoipa::path(
    post,
    path = "/api/topics",
    request_body = TopicRequest,
    responses(
        (status = 201, description = "Topic Created", body = Topic),
        (status = 400, description = "Empty Or Reserved Name"),
        (status = 403, description = "Not Admin"),
        (status = 409, description = "Duplicate")
    )
)]
pub async fn create_topic(
    State(state): State<AppState>,
    Json(payload): Json<TopicRequest>,
) -> Result<(StatusCode, Json<Topic>), ApiError> {
    require(&payload.topic_name, "topic name is required")?;
    if payload.topic_name == ALL_POSTS_LABEL {
        return Err(ApiError::Validation(format!(
            "'{ALL_POSTS_LABEL}' is reserved"
        )));
    }

    let topic = state.repo.create_topic(&payload.topic_name).await?;
    info!(topic = %topic.topic_name, "topic created");
    Ok((StatusCode::CREATED, Json(topic)))
}

/// delete_topic
///
/// [Admin Route] Removes the topic with every post tagged with it and their comments.
#[utoipa::path(
    delete,
    path = "/api/topics/{topic_name}",
    params(("topic_name" = String, Path, description = "Topic label")),
    responses(
        (status = 200, description = "Topic Deleted", body = DeleteResponse),
        (status = 403, description = "Not Admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_topic(
    State(state): State<AppState>,
    Path(topic_name): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let report = state.repo.delete_topic(&topic_name).await?;
    Ok(Json(report.into()))
}
