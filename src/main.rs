use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use space_recommender::{
    api::{create_router, AppState},
    config::Config,
    services::Recommender,
    store::{EmbeddingStore, PlaceDirectory},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "space_recommender=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Both tables are loaded once; a broken artifact aborts startup
    let places = PlaceDirectory::from_path(config.places_path())
        .with_context(|| format!("Failed to load places from {}", config.places_path().display()))?;
    let embeddings = EmbeddingStore::from_path(config.embeddings_path(), config.embedding_layout)
        .with_context(|| {
            format!(
                "Failed to load embeddings from {}",
                config.embeddings_path().display()
            )
        })?;

    let state = AppState::new(Recommender::new(places, embeddings));
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server running");

    axum::serve(listener, app).await?;

    Ok(())
}
