use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::context::AuthContext;

/// Builds the request-scoped `AuthContext` from the incoming headers. No
/// session lookup happens here; handlers resolve what they need through the
/// guards.
pub async fn auth_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = AuthContext::new(
        state.platform.clone(),
        request.headers().clone(),
        state.onboarding.clone(),
    );
    request.extensions_mut().insert(ctx);

    next.run(request).await
}
