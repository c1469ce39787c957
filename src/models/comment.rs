use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub message: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub user: CommentAuthor,
    pub like_count: i64,
    pub liked_by_me: bool,
}

#[derive(Debug, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub message: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
    pub user_name: String,
    pub like_count: i64,
    // EXISTS (...) yields an integer in SQLite.
    pub liked_by_me: i64,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            message: row.message,
            parent_id: row.parent_id,
            created_at: row.created_at,
            user: CommentAuthor {
                id: row.user_id,
                name: row.user_name,
            },
            like_count: row.like_count,
            liked_by_me: row.liked_by_me != 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateComment {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
}

// A null message is rejected the same way as a missing one.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedComment {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedComment {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggled {
    pub add_like: bool,
}
