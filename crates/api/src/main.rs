use studyx_api::{build_router, state::AppState};
use studyx_config::Settings;
use studyx_db::connect;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "studyx_api=debug,studyx_services=debug,studyx_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!("Starting StudyX API on {}:{}", settings.app.host, settings.app.port);
    info!(
        backend = ?settings.database.backend,
        storage_root = %settings.storage.root_dir,
        "Storage config"
    );

    // Connects and ensures indexes for MongoDB
    let store = connect(&settings).await?;

    let app_state = AppState::new(store, settings.clone());
    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
