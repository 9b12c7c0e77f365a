use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::access::{Action, Resource, Statements};
use crate::auth::context::AuthContext;
use crate::auth::guards::assert_permitted;
use crate::error::ApiError;
use crate::members::models::{MemberView, Milestone};
use crate::members::service::{self, ListMembersArgs, MemberPage};
use crate::middleware::{ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::pagination::{Cursor, PageRequest, PaginationMeta};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    /// Continuation token from the previous page
    pub cursor: Option<String>,
    pub limit: Option<u32>,
    /// Also count the matches and return display metadata
    pub include_total: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    #[serde(flatten)]
    pub members: MemberPage,
    pub can_load_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

fn read_members() -> Statements {
    Statements::new().allow(Resource::ChurchMember, [Action::Read])
}

fn page_request(state: &AppState, query: &ListQuery) -> Result<PageRequest, ApiError> {
    let num_items = state.members_config.page_size(query.limit);
    match query.cursor.as_deref().filter(|c| !c.is_empty()) {
        None => Ok(PageRequest::first(num_items)),
        Some(raw) => {
            let cursor: Cursor = raw.parse().map_err(ApiError::bad_request)?;
            Ok(PageRequest::after(num_items, cursor))
        }
    }
}

/// GET /api/members - Search the active organization's members directory
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<MembersResponse> {
    let active = assert_permitted(&ctx, &read_members()).await?;
    let pagination = page_request(&state, &query)?;
    let search = query.search.clone().unwrap_or_default();

    let members = service::list_in_organization(
        ctx.platform(),
        state.members.as_ref(),
        active.organization_id,
        ListMembersArgs {
            search: Some(search.clone()),
            pagination: pagination.clone(),
        },
    )
    .await?;

    let pagination = if query.include_total.unwrap_or(false) {
        let total = state.members.count(active.organization_id, &search).await?;
        Some(PaginationMeta::for_request(&pagination, total))
    } else {
        None
    };

    Ok(ApiResponse::success(MembersResponse {
        can_load_more: members.results.can_load_more(),
        members,
        pagination,
    }))
}

/// GET /api/members/:id - One directory row
pub async fn get(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<MemberView> {
    let active = assert_permitted(&ctx, &read_members()).await?;
    let member =
        service::get_in_organization(ctx.platform(), state.members.as_ref(), active.organization_id, id)
            .await?;
    Ok(ApiResponse::success(member))
}

/// GET /api/members/:id/milestones - Milestones the member has achieved
pub async fn milestones(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Vec<Milestone>> {
    let required = read_members().allow(Resource::Milestone, [Action::Read]);
    let active = assert_permitted(&ctx, &required).await?;
    let milestones =
        service::milestones_for_member(state.members.as_ref(), active.organization_id, id).await?;
    Ok(ApiResponse::success(milestones))
}
