use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    response::IntoResponse,
    routing::get,
};

use super::{AppState, CurrentUser, comments::fetch_post_comments};
use crate::error::AppError;
use crate::models::{Post, PostDetail, PostSummary};

pub fn posts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts))
        .route("/{post_id}", get(get_post))
}

async fn list_posts(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let posts = sqlx::query_as::<_, PostSummary>("SELECT id, title FROM posts ORDER BY id ASC")
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(posts))
}

async fn get_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = sqlx::query_as::<_, Post>("SELECT id, title, body FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let comments = fetch_post_comments(&state.pool, post.id, user.id).await?;
    tracing::debug!(post_id, comment_count = comments.len(), "Loaded post");

    Ok(Json(PostDetail {
        title: post.title,
        body: post.body,
        comments,
    }))
}
