use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::context::OnboardingRoutes;
use crate::auth::platform::AuthPlatform;
use crate::config::MembersConfig;
use crate::handlers;
use crate::members::store::ChurchMemberStore;
use crate::middleware::auth_context_middleware;

/// Shared, read-only application state
#[derive(Clone)]
pub struct AppState {
    pub platform: Arc<dyn AuthPlatform>,
    pub members: Arc<dyn ChurchMemberStore>,
    pub onboarding: OnboardingRoutes,
    pub members_config: MembersConfig,
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/api/auth/session", get(handlers::session::get))
        .route(
            "/api/organizations",
            get(handlers::organizations::list).post(handlers::organizations::create),
        )
        .route("/api/organizations/active", put(handlers::organizations::set_active))
        .route("/api/members", get(handlers::members::list))
        .route("/api/members/:id", get(handlers::members::get))
        .route("/api/members/:id/milestones", get(handlers::members::milestones))
        .route("/api/milestones", get(handlers::milestones::list))
        .layer(middleware::from_fn_with_state(state.clone(), auth_context_middleware));

    Router::new()
        .route("/health", get(handlers::health::get))
        .merge(api)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
