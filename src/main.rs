use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use church_api::app::{router, AppState};
use church_api::auth::{OnboardingRoutes, PgAuthPlatform};
use church_api::config;
use church_api::database::DatabaseManager;
use church_api::hooks::HookPipeline;
use church_api::members::{ChurchMemberStore, CreateChurchMemberHook, PgChurchMemberStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SITE_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("church_api=debug,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::config();
    config.validate()?;
    tracing::info!("Starting church-api in {:?} mode", config.environment);

    let database = DatabaseManager::connect(&config.database).await?;
    let members: Arc<dyn ChurchMemberStore> = Arc::new(PgChurchMemberStore::new(database.pool()));

    let hooks = HookPipeline::new().with_hook(Arc::new(CreateChurchMemberHook::new(members.clone())));
    let platform = PgAuthPlatform::new(database.pool(), config.auth.session_cookie.clone(), hooks);

    let state = AppState {
        platform: Arc::new(platform),
        members,
        onboarding: OnboardingRoutes::from(&config.auth),
        members_config: config.members.clone(),
    };
    let app = router(state, &config.security.cors_origins);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("church-api listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
