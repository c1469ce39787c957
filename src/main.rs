use blog_comments::{config::Config, db, routes};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog_comments=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::init_db(&config.database_url).await?;
    tracing::info!(database_url = %config.database_url, "Database initialized");

    if config.seed_demo_data {
        db::seed_demo_data(&pool).await?;
    }

    let current_user = db::ensure_user(&pool, &config.current_user_name).await?;
    tracing::info!(user_id = current_user.id, name = %current_user.name, "Acting as user");

    let cors = routes::cors_layer(config.client_url.as_deref())?;
    let app = routes::create_router(routes::AppState { pool, current_user }, cors);

    let addr = config.listen_addr();
    tracing::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
