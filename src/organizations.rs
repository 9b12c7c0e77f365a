// Organization registration, listing and selection on behalf of the caller.

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::context::AuthContext;
use crate::auth::guards::{assert_authenticated, get_active_member, get_organizations};
use crate::auth::platform::{Member, NewOrganization, Organization};
use crate::auth::slug::generate_slug;
use crate::error::ApiError;
use crate::hooks::OrganizationCreated;

pub const MIN_NAME_LEN: usize = 2;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetActiveOrganizationRequest {
    pub organization_id: Uuid,
}

/// Registers a new organization owned by the caller. The platform makes it
/// the active organization and runs the organization hooks.
pub async fn create_organization(
    ctx: &AuthContext,
    request: CreateOrganizationRequest,
) -> Result<OrganizationCreated, ApiError> {
    let session = assert_authenticated(ctx).await?;

    let name = request.name.trim();
    if name.chars().count() < MIN_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Organization name must be at least {} characters",
            MIN_NAME_LEN
        )));
    }

    let new = NewOrganization {
        name: name.to_string(),
        slug: generate_slug(name),
    };
    info!("User {} registering organization '{}'", session.user.id, new.slug);

    Ok(ctx.platform().create_organization(ctx.headers(), new).await?)
}

pub async fn list_organizations(ctx: &AuthContext) -> Result<Vec<Organization>, ApiError> {
    assert_authenticated(ctx).await?;
    get_organizations(ctx).await
}

/// Switches the session's active organization and returns the new active
/// membership.
pub async fn set_active_organization(
    ctx: &AuthContext,
    request: SetActiveOrganizationRequest,
) -> Result<Member, ApiError> {
    assert_authenticated(ctx).await?;
    ctx.platform()
        .set_active_organization(ctx.headers(), request.organization_id)
        .await?;

    get_active_member(ctx).await?.ok_or_else(ApiError::forbidden)
}
