use anyhow::Context;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use research_portal::{
    create_portal_router, taxonomy, PgProposalStore, PortalConfig, PortalState, ProposalWorkflow,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = PortalConfig::from_env();

    // Initialize tracing; RUST_LOG overrides the configured filter
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = PgProposalStore::connect(&config.database)
        .await
        .context("connecting to database")?;
    store
        .run_migrations()
        .await
        .context("running migrations")?;

    if config.seed_taxonomy {
        let inserted = store
            .seed_taxonomy(
                &taxonomy::default_verticals(),
                &taxonomy::default_special_areas(),
            )
            .await
            .context("seeding taxonomy")?;
        info!("Taxonomy seeded ({} new rows)", inserted);
    }

    let workflow = ProposalWorkflow::new(Arc::new(store));
    let app = create_portal_router(PortalState::new(workflow)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    );

    info!("Starting research portal on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
