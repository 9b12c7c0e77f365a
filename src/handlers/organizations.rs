use axum::Extension;

use crate::auth::context::AuthContext;
use crate::auth::platform::{Member, Organization};
use crate::hooks::OrganizationCreated;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::organizations::{self, CreateOrganizationRequest, SetActiveOrganizationRequest};

/// GET /api/organizations - Organizations the caller belongs to
pub async fn list(Extension(ctx): Extension<AuthContext>) -> ApiResult<Vec<Organization>> {
    let orgs = organizations::list_organizations(&ctx).await?;
    Ok(ApiResponse::success(orgs))
}

/// POST /api/organizations - Register a church with the caller as owner
pub async fn create(
    Extension(ctx): Extension<AuthContext>,
    ApiJson(request): ApiJson<CreateOrganizationRequest>,
) -> ApiResult<OrganizationCreated> {
    let created = organizations::create_organization(&ctx, request).await?;
    Ok(ApiResponse::created(created))
}

/// PUT /api/organizations/active - Switch the session's active organization
pub async fn set_active(
    Extension(ctx): Extension<AuthContext>,
    ApiJson(request): ApiJson<SetActiveOrganizationRequest>,
) -> ApiResult<Member> {
    let member = organizations::set_active_organization(&ctx, request).await?;
    Ok(ApiResponse::success(member))
}
