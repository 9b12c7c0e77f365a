use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::auth::access::{Action, Resource, Statements};
use crate::auth::context::AuthContext;
use crate::auth::guards::assert_permitted;
use crate::members::models::Milestone;
use crate::members::service;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/milestones - Milestones defined by the active organization
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Vec<Milestone>> {
    let required = Statements::new().allow(Resource::Milestone, [Action::Read]);
    let active = assert_permitted(&ctx, &required).await?;
    let milestones =
        service::milestones_in_organization(state.members.as_ref(), active.organization_id).await?;
    Ok(ApiResponse::success(milestones))
}
