mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Comment, DeletedComment, LikeToggled, PostDetail, PostSummary, UpdatedComment,
};

pub use http::HttpCommentsApi;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Permission(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Server(String),
}

impl ApiError {
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => Self::Validation(message),
            401 | 403 => Self::Permission(message),
            404 => Self::NotFound(message),
            _ => Self::Server(message),
        }
    }
}

#[async_trait]
pub trait CommentsApi {
    async fn list_posts(&self) -> Result<Vec<PostSummary>, ApiError>;

    async fn fetch_post(&self, post_id: i64) -> Result<PostDetail, ApiError>;

    async fn create_comment(
        &self,
        post_id: i64,
        message: &str,
        parent_id: Option<i64>,
    ) -> Result<Comment, ApiError>;

    async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        message: &str,
    ) -> Result<UpdatedComment, ApiError>;

    async fn delete_comment(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> Result<DeletedComment, ApiError>;

    async fn toggle_comment_like(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> Result<LikeToggled, ApiError>;
}
