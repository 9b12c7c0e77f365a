// Authorization helper chain used by every tenant-scoped handler.
//
// Ordering matters: the permission evaluator works against the session's
// active organization, so assert_permitted resolves the active organization
// before it asks the platform anything about permissions.

use tracing::{debug, error, warn};

use crate::auth::access::Statements;
use crate::auth::context::AuthContext;
use crate::auth::platform::{Member, Organization, SessionWithUser};
use crate::error::ApiError;

pub async fn assert_authenticated(ctx: &AuthContext) -> Result<SessionWithUser, ApiError> {
    get_server_session(ctx).await?.ok_or_else(ApiError::unauthorized)
}

/// Resolve the caller's active membership, auto-selecting the organization
/// when the caller belongs to exactly one.
pub async fn assert_active_organization(ctx: &AuthContext) -> Result<Member, ApiError> {
    assert_authenticated(ctx).await?;

    match get_active_member(ctx).await? {
        Some(member) => Ok(member),
        None => handle_no_active_org(ctx).await,
    }
}

pub async fn assert_permitted(ctx: &AuthContext, statements: &Statements) -> Result<Member, ApiError> {
    let active_member = assert_active_organization(ctx).await?;

    if !get_has_permission(ctx, statements).await? {
        debug!(
            "Permission denied for member {} in organization {}",
            active_member.id, active_member.organization_id
        );
        return Err(ApiError::forbidden());
    }

    Ok(active_member)
}

/// Current session, or `None` when the caller is anonymous. Any other platform
/// failure is returned as an error.
pub async fn get_server_session(ctx: &AuthContext) -> Result<Option<SessionWithUser>, ApiError> {
    match ctx.platform().get_session(ctx.headers()).await {
        Ok(session) => {
            debug!(
                "Resolved server session: {}",
                session.as_ref().map(|s| s.user.id.to_string()).unwrap_or_else(|| "none".to_string())
            );
            Ok(session)
        }
        Err(e) => {
            error!("Error getting server session: {}", e);
            Err(e.into())
        }
    }
}

pub async fn get_has_permission(ctx: &AuthContext, statements: &Statements) -> Result<bool, ApiError> {
    Ok(ctx.platform().has_permission(ctx.headers(), statements).await?)
}

/// Active membership, with platform rejections read as "no active member"
pub async fn get_active_member(ctx: &AuthContext) -> Result<Option<Member>, ApiError> {
    match ctx.platform().get_active_member(ctx.headers()).await {
        Ok(member) => Ok(Some(member)),
        Err(e) if e.is_rejection() => {
            debug!("No active member: {}", e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn get_organizations(ctx: &AuthContext) -> Result<Vec<Organization>, ApiError> {
    Ok(ctx.platform().list_organizations(ctx.headers()).await?)
}

pub async fn handle_no_active_org(ctx: &AuthContext) -> Result<Member, ApiError> {
    let orgs = get_organizations(ctx).await?;
    debug!("Caller has no active organization, {} candidate(s)", orgs.len());

    match orgs.as_slice() {
        [] => Err(ApiError::redirect(&ctx.onboarding().no_organization)),
        [only] => {
            ctx.platform()
                .set_active_organization(ctx.headers(), only.id)
                .await?;

            match get_active_member(ctx).await? {
                Some(member) => Ok(member),
                None => {
                    warn!(
                        "Failed to activate organization {}, sending caller to organization selection",
                        only.id
                    );
                    Err(ApiError::redirect(&ctx.onboarding().select_organization))
                }
            }
        }
        _ => Err(ApiError::redirect(&ctx.onboarding().select_organization)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::access::{Action, Resource};
    use crate::testing::FakePlatform;

    fn read_members() -> Statements {
        Statements::new().allow(Resource::ChurchMember, [Action::Read])
    }

    #[tokio::test]
    async fn anonymous_callers_are_unauthorized() {
        let platform = FakePlatform::anonymous();
        let ctx = platform.context();

        assert_eq!(assert_active_organization(&ctx).await, Err(ApiError::Unauthorized));
        assert_eq!(platform.calls(), vec!["get_session"]);
    }

    #[tokio::test]
    async fn zero_organizations_redirect_to_registration() {
        let platform = FakePlatform::signed_in("Alice");
        let ctx = platform.context();

        assert_eq!(
            assert_active_organization(&ctx).await,
            Err(ApiError::redirect("/ob/no-church"))
        );
        assert!(!platform.calls().contains(&"create_organization"));
        assert!(!platform.calls().contains(&"set_active_organization"));
    }

    #[tokio::test]
    async fn single_organization_is_activated_and_returned() {
        let platform = FakePlatform::signed_in("Alice");
        let org = platform.join_organization("Grace Chapel");
        let ctx = platform.context();

        let member = assert_active_organization(&ctx).await.unwrap();
        assert_eq!(member.organization_id, org.id);
        assert_eq!(platform.active_organization(), Some(org.id));
        assert_eq!(
            platform.calls(),
            vec![
                "get_session",
                "get_active_member",
                "list_organizations",
                "set_active_organization",
                "get_active_member",
            ]
        );
    }

    #[tokio::test]
    async fn single_organization_that_will_not_activate_redirects_to_selection() {
        let platform = FakePlatform::signed_in("Alice");
        platform.join_organization("Grace Chapel");
        platform.break_activation();
        let ctx = platform.context();

        assert_eq!(
            assert_active_organization(&ctx).await,
            Err(ApiError::redirect("/ob/select-church"))
        );
    }

    #[tokio::test]
    async fn several_organizations_always_redirect_to_selection() {
        for reversed in [false, true] {
            let platform = FakePlatform::signed_in("Alice");
            let names = if reversed { ["Zion", "Bethel"] } else { ["Bethel", "Zion"] };
            for name in names {
                platform.join_organization(name);
            }
            let ctx = platform.context();

            assert_eq!(
                assert_active_organization(&ctx).await,
                Err(ApiError::redirect("/ob/select-church"))
            );
            assert_eq!(platform.active_organization(), None);
        }
    }

    #[tokio::test]
    async fn existing_active_membership_is_returned_directly() {
        let platform = FakePlatform::signed_in("Alice");
        let first = platform.join_organization("Bethel");
        platform.join_organization("Zion");
        platform.activate(first.id);
        let ctx = platform.context();

        let member = assert_active_organization(&ctx).await.unwrap();
        assert_eq!(member.organization_id, first.id);
        assert_eq!(platform.calls(), vec!["get_session", "get_active_member"]);
    }

    #[tokio::test]
    async fn permission_is_checked_only_after_active_organization_resolves() {
        let platform = FakePlatform::signed_in("Alice");
        platform.join_organization("Grace Chapel");
        let ctx = platform.context();

        assert_permitted(&ctx, &read_members()).await.unwrap();

        let calls = platform.calls();
        let permission_at = calls.iter().position(|c| *c == "has_permission").unwrap();
        let activated_at = calls.iter().rposition(|c| *c == "get_active_member").unwrap();
        assert!(activated_at < permission_at);
        assert_eq!(permission_at, calls.len() - 1);
    }

    #[tokio::test]
    async fn permission_is_never_checked_when_resolution_fails() {
        let platform = FakePlatform::signed_in("Alice");
        platform.join_organization("Bethel");
        platform.join_organization("Zion");
        let ctx = platform.context();

        assert!(matches!(
            assert_permitted(&ctx, &read_members()).await,
            Err(ApiError::Redirect { .. })
        ));
        assert!(!platform.calls().contains(&"has_permission"));
    }

    #[tokio::test]
    async fn missing_permission_is_forbidden() {
        let platform = FakePlatform::signed_in("Alice");
        let org = platform.join_organization("Grace Chapel");
        platform.activate(org.id);
        platform.deny_permissions();
        let ctx = platform.context();

        assert_eq!(assert_permitted(&ctx, &read_members()).await, Err(ApiError::Forbidden));
    }

    #[tokio::test]
    async fn platform_outages_propagate_instead_of_reading_as_anonymous() {
        let platform = FakePlatform::signed_in("Alice");
        platform.fail_sessions();
        let ctx = platform.context();

        assert!(matches!(
            get_server_session(&ctx).await,
            Err(ApiError::InternalServerError(_))
        ));
    }
}
