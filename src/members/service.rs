use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::context::AuthContext;
use crate::auth::guards::assert_active_organization;
use crate::auth::platform::AuthPlatform;
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::members::models::{ChurchMember, MemberView, Milestone, NewChurchMember};
use crate::members::store::ChurchMemberStore;
use crate::pagination::{Page, PageRequest};

#[derive(Debug, Clone, Default)]
pub struct ListMembersArgs {
    pub search: Option<String>,
    pub pagination: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberPage {
    #[serde(flatten)]
    pub results: Page<MemberView>,
    /// Domain rows considered for this page, before dangling references
    /// were dropped
    pub scanned: usize,
}

/// Members directory for the caller's active organization
pub async fn list(
    ctx: &AuthContext,
    store: &dyn ChurchMemberStore,
    args: ListMembersArgs,
) -> Result<MemberPage, ApiError> {
    let active = assert_active_organization(ctx).await?;
    list_in_organization(ctx.platform(), store, active.organization_id, args).await
}

pub async fn list_in_organization(
    platform: &dyn AuthPlatform,
    store: &dyn ChurchMemberStore,
    organization_id: Uuid,
    args: ListMembersArgs,
) -> Result<MemberPage, ApiError> {
    let term = args.search.as_deref().unwrap_or("");
    let found = store.search(organization_id, term, &args.pagination).await?;
    let scanned = found.page.len();

    // One lookup per row, all in flight together; results come back in
    // input order.
    let identities = join_all(
        found
            .page
            .iter()
            .map(|member| platform.get_member(organization_id, member.organization_member_id)),
    )
    .await;

    let mut views = Vec::with_capacity(scanned);
    for (member, identity) in found.page.into_iter().zip(identities) {
        match identity? {
            Some(identity) => views.push(MemberView::merge(member, identity)),
            None => tracing::warn!(
                "Dropping church member {}: membership {} no longer resolves",
                member.id,
                member.organization_member_id
            ),
        }
    }

    Ok(MemberPage {
        results: Page {
            page: views,
            is_done: found.is_done,
            continue_cursor: found.continue_cursor,
        },
        scanned,
    })
}

/// Single directory row in the caller's active organization
pub async fn get_member(
    ctx: &AuthContext,
    store: &dyn ChurchMemberStore,
    id: Uuid,
) -> Result<MemberView, ApiError> {
    let active = assert_active_organization(ctx).await?;
    get_in_organization(ctx.platform(), store, active.organization_id, id).await
}

pub async fn get_in_organization(
    platform: &dyn AuthPlatform,
    store: &dyn ChurchMemberStore,
    organization_id: Uuid,
    id: Uuid,
) -> Result<MemberView, ApiError> {
    let member = store
        .find(organization_id, id)
        .await?
        .ok_or_else(ApiError::not_found)?;
    let identity = platform
        .get_member(organization_id, member.organization_member_id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    Ok(MemberView::merge(member, identity))
}

/// Milestones achieved by a member of the caller's active organization
pub async fn member_milestones(
    ctx: &AuthContext,
    store: &dyn ChurchMemberStore,
    id: Uuid,
) -> Result<Vec<Milestone>, ApiError> {
    let active = assert_active_organization(ctx).await?;
    milestones_for_member(store, active.organization_id, id).await
}

pub async fn list_milestones(
    ctx: &AuthContext,
    store: &dyn ChurchMemberStore,
) -> Result<Vec<Milestone>, ApiError> {
    let active = assert_active_organization(ctx).await?;
    milestones_in_organization(store, active.organization_id).await
}

/// Milestones a member has achieved, in achievement order. Ids that do not
/// resolve in the organization are skipped.
pub async fn milestones_for_member(
    store: &dyn ChurchMemberStore,
    organization_id: Uuid,
    id: Uuid,
) -> Result<Vec<Milestone>, ApiError> {
    let member = store
        .find(organization_id, id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    let mut by_id: HashMap<Uuid, Milestone> = store
        .milestones_by_ids(organization_id, &member.milestones_achieved)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    Ok(member
        .milestones_achieved
        .iter()
        .filter_map(|id| by_id.remove(id))
        .collect())
}

pub async fn milestones_in_organization(
    store: &dyn ChurchMemberStore,
    organization_id: Uuid,
) -> Result<Vec<Milestone>, ApiError> {
    Ok(store.list_milestones(organization_id).await?)
}

/// Internal write used by the organization hook; not reachable over HTTP
pub async fn create_church_member_internal(
    store: &dyn ChurchMemberStore,
    member: NewChurchMember,
) -> Result<ChurchMember, DatabaseError> {
    tracing::info!(
        "Creating church member '{}' for organization {}",
        member.name,
        member.organization_id
    );
    store.insert(member).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePlatform, FakeStore};
    use std::time::Duration;

    struct Tenant {
        platform: FakePlatform,
        store: FakeStore,
        organization_id: Uuid,
    }

    /// Signed-in caller with an active organization holding the named members
    fn tenant(names: &[&str]) -> (Tenant, Vec<ChurchMember>) {
        let platform = FakePlatform::signed_in("Admin");
        let org = platform.join_organization("Grace Chapel");
        platform.activate(org.id);
        let store = FakeStore::new();
        let members = names
            .iter()
            .map(|name| {
                let identity = platform.add_identity(org.id, name);
                store.seed(org.id, identity.member_id, name)
            })
            .collect();
        (
            Tenant {
                platform,
                store,
                organization_id: org.id,
            },
            members,
        )
    }

    fn names(page: &MemberPage) -> Vec<&str> {
        page.results.page.iter().map(|m| m.name.as_str()).collect()
    }

    #[tokio::test]
    async fn dangling_identity_is_dropped_and_order_preserved() {
        let (t, members) = tenant(&["Alice", "Bob", "Charlie"]);
        t.platform.remove_identity(members[1].organization_member_id);

        let args = ListMembersArgs {
            search: Some(String::new()),
            pagination: PageRequest::first(10),
        };
        let page = list(&t.platform.context(), &t.store, args).await.unwrap();

        assert_eq!(names(&page), vec!["Alice", "Charlie"]);
        assert_eq!(page.scanned, 3);
        assert_eq!(page.results.page.len(), 2);
        assert!(page.results.is_done);
        assert_eq!(page.results.page[0].email, "alice@example.com");
    }

    #[tokio::test]
    async fn search_returns_only_true_matches_in_stable_order() {
        let (t, _) = tenant(&["Mary Wanjiku", "Peter Ochieng", "Mary Brown", "Grace Mwangi"]);

        let args = ListMembersArgs {
            search: Some("mary".to_string()),
            pagination: PageRequest::first(10),
        };
        let page = list_in_organization(&t.platform, &t.store, t.organization_id, args)
            .await
            .unwrap();

        assert_eq!(names(&page), vec!["Mary Wanjiku", "Mary Brown"]);
    }

    #[tokio::test]
    async fn page_of_only_dangling_references_is_empty_but_pagination_continues() {
        let (t, members) = tenant(&["Alice", "Bob", "Charlie"]);
        t.platform.remove_identity(members[0].organization_member_id);
        t.platform.remove_identity(members[1].organization_member_id);

        let first = list_in_organization(
            &t.platform,
            &t.store,
            t.organization_id,
            ListMembersArgs {
                search: None,
                pagination: PageRequest::first(2),
            },
        )
        .await
        .unwrap();
        assert!(first.results.page.is_empty());
        assert_eq!(first.scanned, 2);
        assert!(first.results.can_load_more());

        let second = list_in_organization(
            &t.platform,
            &t.store,
            t.organization_id,
            ListMembersArgs {
                search: None,
                pagination: PageRequest::after(2, first.results.continue_cursor),
            },
        )
        .await
        .unwrap();
        assert_eq!(names(&second), vec!["Charlie"]);
        assert!(second.results.is_done);
    }

    #[tokio::test]
    async fn identity_lookups_run_concurrently() {
        let (t, _) = tenant(&["A", "B", "C", "D", "E"]);
        t.platform.delay_lookups(Duration::from_millis(20));

        let page = list_in_organization(
            &t.platform,
            &t.store,
            t.organization_id,
            ListMembersArgs::default(),
        )
        .await
        .unwrap();

        assert_eq!(page.results.page.len(), 5);
        assert_eq!(t.platform.max_lookups_in_flight(), 5);
    }

    #[tokio::test]
    async fn other_tenants_are_invisible() {
        let (t, _) = tenant(&["Alice"]);
        let elsewhere = Uuid::new_v4();
        t.store.seed(elsewhere, Uuid::new_v4(), "Mallory");

        let page = list(&t.platform.context(), &t.store, ListMembersArgs::default())
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["Alice"]);
    }

    #[tokio::test]
    async fn get_member_is_not_found_across_tenants_or_for_dangling_identity() {
        let (t, members) = tenant(&["Alice", "Bob"]);
        let ctx = t.platform.context();

        let alice = get_member(&ctx, &t.store, members[0].id).await.unwrap();
        assert_eq!(alice.name, "Alice");

        t.platform.remove_identity(members[1].organization_member_id);
        assert_eq!(
            get_member(&ctx, &t.store, members[1].id).await,
            Err(ApiError::not_found())
        );

        let stranger = t.store.seed(Uuid::new_v4(), Uuid::new_v4(), "Mallory");
        assert_eq!(
            get_member(&ctx, &t.store, stranger.id).await,
            Err(ApiError::not_found())
        );
    }

    #[tokio::test]
    async fn member_milestones_follow_achievement_order() {
        let (t, members) = tenant(&["Alice"]);
        let baptism = t.store.add_milestone(t.organization_id, "Baptism");
        let membership = t.store.add_milestone(t.organization_id, "Membership class");
        let foreign = t.store.add_milestone(Uuid::new_v4(), "Elsewhere");
        t.store
            .achieve(members[0].id, &[membership.id, foreign.id, baptism.id]);

        let achieved = milestones_for_member(&t.store, t.organization_id, members[0].id)
            .await
            .unwrap();
        let titles: Vec<_> = achieved.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Membership class", "Baptism"]);
    }

    #[tokio::test]
    async fn milestones_are_scoped_to_the_active_organization() {
        let (t, _) = tenant(&[]);
        t.store.add_milestone(t.organization_id, "Baptism");
        t.store.add_milestone(Uuid::new_v4(), "Elsewhere");

        let milestones = list_milestones(&t.platform.context(), &t.store).await.unwrap();
        assert_eq!(milestones.len(), 1);
        assert_eq!(milestones[0].title, "Baptism");

        let missing = member_milestones(&t.platform.context(), &t.store, Uuid::new_v4()).await;
        assert_eq!(missing, Err(ApiError::not_found()));
    }

    #[tokio::test]
    async fn hook_write_is_idempotent_per_membership() {
        let store = FakeStore::new();
        let new = NewChurchMember {
            organization_id: Uuid::new_v4(),
            organization_member_id: Uuid::new_v4(),
            name: "Alice".to_string(),
        };

        let first = create_church_member_internal(&store, new.clone()).await.unwrap();
        let second = create_church_member_internal(&store, new).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.milestones_achieved.is_empty());
    }
}
