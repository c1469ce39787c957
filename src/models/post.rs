use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::comment::Comment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetail {
    pub title: String,
    pub body: String,
    pub comments: Vec<Comment>,
}
