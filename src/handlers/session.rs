use axum::Extension;

use crate::auth::context::AuthContext;
use crate::auth::guards::assert_authenticated;
use crate::auth::platform::SessionWithUser;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/auth/session - Current session and user
pub async fn get(Extension(ctx): Extension<AuthContext>) -> ApiResult<SessionWithUser> {
    let session = assert_authenticated(&ctx).await?;
    Ok(ApiResponse::success(session))
}
