use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
};
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};

use super::{AppState, CurrentUser};
use crate::error::AppError;
use crate::models::{
    Comment, CommentRow, CreateComment, DeletedComment, LikeToggled, UpdateComment,
    UpdatedComment,
};

const COMMENT_SELECT: &str = r#"
    SELECT
        c.id AS id,
        c.message AS message,
        c.parent_id AS parent_id,
        c.created_at AS created_at,
        u.id AS user_id,
        u.name AS user_name,
        (SELECT COUNT(*) FROM likes l WHERE l.comment_id = c.id) AS like_count,
        EXISTS (
            SELECT 1 FROM likes l WHERE l.comment_id = c.id AND l.user_id = ?
        ) AS liked_by_me
    FROM comments c
    JOIN users u ON u.id = c.user_id
"#;

#[derive(Debug, FromRow)]
struct CommentOwner {
    id: i64,
    user_id: i64,
}

pub fn comments_routes() -> Router<AppState> {
    Router::new()
        .route("/{post_id}/comments", post(create_comment))
        .route(
            "/{post_id}/comments/{comment_id}",
            put(update_comment).delete(delete_comment),
        )
        .route(
            "/{post_id}/comments/{comment_id}/toggleLike",
            post(toggle_comment_like),
        )
}

pub async fn fetch_post_comments(
    pool: &SqlitePool,
    post_id: i64,
    viewer_id: i64,
) -> Result<Vec<Comment>, sqlx::Error> {
    let query = format!("{COMMENT_SELECT} WHERE c.post_id = ? ORDER BY c.created_at DESC, c.id DESC");
    let rows = sqlx::query_as::<_, CommentRow>(&query)
        .bind(viewer_id)
        .bind(post_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Comment::from).collect())
}

async fn fetch_comment(
    pool: &SqlitePool,
    comment_id: i64,
    viewer_id: i64,
) -> Result<Comment, sqlx::Error> {
    let query = format!("{COMMENT_SELECT} WHERE c.id = ?");
    let row = sqlx::query_as::<_, CommentRow>(&query)
        .bind(viewer_id)
        .bind(comment_id)
        .fetch_one(pool)
        .await?;

    Ok(row.into())
}

async fn create_comment(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(post_id): Path<i64>,
    Json(input): Json<CreateComment>,
) -> Result<impl IntoResponse, AppError> {
    let message = required_message(&input.message)?;
    ensure_post_exists(&state.pool, post_id).await?;

    if let Some(parent_id) = input.parent_id {
        let (parent_post_id,) =
            sqlx::query_as::<_, (i64,)>("SELECT post_id FROM comments WHERE id = ?")
                .bind(parent_id)
                .fetch_optional(&state.pool)
                .await?
                .ok_or_else(|| AppError::NotFound("Parent comment not found".to_string()))?;

        if parent_post_id != post_id {
            return Err(AppError::BadRequest(
                "Parent comment does not belong to this post".to_string(),
            ));
        }
    }

    let result = sqlx::query(
        "INSERT INTO comments (message, created_at, user_id, post_id, parent_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(message)
    .bind(Utc::now())
    .bind(user.id)
    .bind(post_id)
    .bind(input.parent_id)
    .execute(&state.pool)
    .await?;

    let comment = fetch_comment(&state.pool, result.last_insert_rowid(), user.id).await?;
    tracing::debug!(post_id, comment_id = comment.id, parent_id = ?comment.parent_id, "Comment created");

    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Json(input): Json<UpdateComment>,
) -> Result<impl IntoResponse, AppError> {
    let message = required_message(&input.message)?;
    let comment = find_comment_owner(&state.pool, post_id, comment_id).await?;

    if comment.user_id != user.id {
        return Err(AppError::Unauthorized(
            "You don't have permission to edit this message".to_string(),
        ));
    }

    sqlx::query("UPDATE comments SET message = ?, updated_at = ? WHERE id = ?")
        .bind(message)
        .bind(Utc::now())
        .bind(comment.id)
        .execute(&state.pool)
        .await?;

    tracing::debug!(post_id, comment_id, "Comment updated");
    Ok(Json(UpdatedComment {
        message: message.to_string(),
    }))
}

async fn delete_comment(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let comment = find_comment_owner(&state.pool, post_id, comment_id).await?;

    if comment.user_id != user.id {
        return Err(AppError::Unauthorized(
            "You don't have permission to delete this message".to_string(),
        ));
    }

    // Replies and likes go with it through ON DELETE CASCADE.
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment.id)
        .execute(&state.pool)
        .await?;

    tracing::debug!(post_id, comment_id, "Comment deleted");
    Ok(Json(DeletedComment { id: comment.id }))
}

async fn toggle_comment_like(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let comment = find_comment_owner(&state.pool, post_id, comment_id).await?;

    let existing = sqlx::query_as::<_, (i64,)>(
        "SELECT comment_id FROM likes WHERE user_id = ? AND comment_id = ?",
    )
    .bind(user.id)
    .bind(comment.id)
    .fetch_optional(&state.pool)
    .await?;

    let add_like = existing.is_none();
    if add_like {
        sqlx::query("INSERT INTO likes (user_id, comment_id) VALUES (?, ?)")
            .bind(user.id)
            .bind(comment.id)
            .execute(&state.pool)
            .await?;
    } else {
        sqlx::query("DELETE FROM likes WHERE user_id = ? AND comment_id = ?")
            .bind(user.id)
            .bind(comment.id)
            .execute(&state.pool)
            .await?;
    }

    tracing::debug!(post_id, comment_id, add_like, "Comment like toggled");
    Ok(Json(LikeToggled { add_like }))
}

fn required_message(message: &str) -> Result<&str, AppError> {
    if message.is_empty() {
        return Err(AppError::BadRequest("Message is required".to_string()));
    }
    Ok(message)
}

async fn ensure_post_exists(pool: &SqlitePool, post_id: i64) -> Result<(), AppError> {
    sqlx::query_as::<_, (i64,)>("SELECT id FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    Ok(())
}

async fn find_comment_owner(
    pool: &SqlitePool,
    post_id: i64,
    comment_id: i64,
) -> Result<CommentOwner, AppError> {
    sqlx::query_as::<_, CommentOwner>(
        "SELECT id, user_id FROM comments WHERE id = ? AND post_id = ?",
    )
    .bind(comment_id)
    .bind(post_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
}
