use std::str::FromStr;

use chrono::{Duration, Utc};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::models::User;

pub async fn init_db(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // Every connection to an in-memory database sees its own empty database,
    // so keep exactly one alive for the whole pool lifetime.
    let pool_options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = pool_options.connect_with(options).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            body TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            updated_at DATETIME,
            user_id INTEGER NOT NULL,
            post_id INTEGER NOT NULL,
            parent_id INTEGER,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
            FOREIGN KEY (parent_id) REFERENCES comments(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_comments_post_id_created_at ON comments (post_id, created_at)",
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS likes (
            user_id INTEGER NOT NULL,
            comment_id INTEGER NOT NULL,
            PRIMARY KEY (user_id, comment_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (comment_id) REFERENCES comments(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}

pub async fn ensure_user(pool: &SqlitePool, name: &str) -> Result<User, sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO users (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;

    sqlx::query_as::<_, User>("SELECT id, name FROM users WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
}

pub async fn insert_post(pool: &SqlitePool, title: &str, body: &str) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO posts (title, body) VALUES (?, ?)")
        .bind(title)
        .bind(body)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

pub async fn seed_demo_data(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let (post_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;
    if post_count > 0 {
        tracing::debug!(post_count, "Skipping demo seed, posts already present");
        return Ok(());
    }

    let kyle = ensure_user(pool, "Kyle").await?;
    let sally = ensure_user(pool, "Sally").await?;

    let first_post = insert_post(
        pool,
        "Post 1",
        "Lorem ipsum dolor sit amet, consectetur adipiscing elit. Integer porta \
         pharetra lorem, a facilisis lacus faucibus vel.",
    )
    .await?;
    insert_post(
        pool,
        "Post 2",
        "Curabitur vulputate, nisl sit amet euismod aliquam, tortor ligula \
         vehicula justo, sed sodales nisi purus eu mauris.",
    )
    .await?;

    let start = Utc::now() - Duration::minutes(10);
    let root = insert_seed_comment(pool, first_post, kyle.id, None, "I am a root comment", start)
        .await?;
    insert_seed_comment(
        pool,
        first_post,
        sally.id,
        Some(root),
        "I am a nested comment",
        start + Duration::minutes(1),
    )
    .await?;
    insert_seed_comment(
        pool,
        first_post,
        sally.id,
        None,
        "I am another root comment",
        start + Duration::minutes(2),
    )
    .await?;

    tracing::info!("Demo data seeded");
    Ok(())
}

async fn insert_seed_comment(
    pool: &SqlitePool,
    post_id: i64,
    user_id: i64,
    parent_id: Option<i64>,
    message: &str,
    created_at: chrono::DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO comments (message, created_at, user_id, post_id, parent_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(message)
    .bind(created_at)
    .bind(user_id)
    .bind(post_id)
    .bind(parent_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}
