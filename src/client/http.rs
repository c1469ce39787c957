use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};

use super::{ApiError, CommentsApi};
use crate::models::{
    Comment, CreateComment, DeletedComment, LikeToggled, PostDetail, PostSummary, UpdateComment,
    UpdatedComment,
};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug, Clone)]
pub struct HttpCommentsApi {
    client: Client,
    base_url: String,
}

impl HttpCommentsApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ApiError::Server(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Server(e.to_string()))?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Server(e.to_string()));
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => status.canonical_reason().unwrap_or("Error").to_string(),
        };
        tracing::debug!(status = status.as_u16(), %message, "Request failed");
        Err(ApiError::from_status(status.as_u16(), message))
    }
}

#[async_trait]
impl CommentsApi for HttpCommentsApi {
    async fn list_posts(&self) -> Result<Vec<PostSummary>, ApiError> {
        self.send(self.client.get(self.url("/posts"))).await
    }

    async fn fetch_post(&self, post_id: i64) -> Result<PostDetail, ApiError> {
        self.send(self.client.get(self.url(&format!("/posts/{post_id}"))))
            .await
    }

    async fn create_comment(
        &self,
        post_id: i64,
        message: &str,
        parent_id: Option<i64>,
    ) -> Result<Comment, ApiError> {
        let body = CreateComment {
            message: message.to_string(),
            parent_id,
        };
        self.send(
            self.client
                .post(self.url(&format!("/posts/{post_id}/comments")))
                .json(&body),
        )
        .await
    }

    async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        message: &str,
    ) -> Result<UpdatedComment, ApiError> {
        let body = UpdateComment {
            message: message.to_string(),
        };
        self.send(
            self.client
                .put(self.url(&format!("/posts/{post_id}/comments/{comment_id}")))
                .json(&body),
        )
        .await
    }

    async fn delete_comment(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> Result<DeletedComment, ApiError> {
        self.send(
            self.client
                .delete(self.url(&format!("/posts/{post_id}/comments/{comment_id}"))),
        )
        .await
    }

    async fn toggle_comment_like(
        &self,
        post_id: i64,
        comment_id: i64,
    ) -> Result<LikeToggled, ApiError> {
        self.send(self.client.post(self.url(&format!(
            "/posts/{post_id}/comments/{comment_id}/toggleLike"
        ))))
        .await
    }
}
