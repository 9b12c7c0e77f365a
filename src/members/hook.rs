use async_trait::async_trait;
use std::sync::Arc;

use crate::hooks::{HookError, OrganizationCreated, OrganizationHook};
use crate::members::models::NewChurchMember;
use crate::members::service::create_church_member_internal;
use crate::members::store::ChurchMemberStore;

/// Gives the creator of a new organization their church member profile
pub struct CreateChurchMemberHook {
    store: Arc<dyn ChurchMemberStore>,
}

impl CreateChurchMemberHook {
    pub fn new(store: Arc<dyn ChurchMemberStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl OrganizationHook for CreateChurchMemberHook {
    fn name(&self) -> &'static str {
        "create_church_member"
    }

    async fn after_create_organization(&self, event: &OrganizationCreated) -> Result<(), HookError> {
        let member = NewChurchMember {
            organization_id: event.organization.id,
            organization_member_id: event.member.id,
            name: event.user.name.clone(),
        };

        create_church_member_internal(self.store.as_ref(), member)
            .await
            .map(|_| ())
            .map_err(|e| HookError::failed(self.name(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::members::store::ChurchMemberStore;
    use crate::pagination::PageRequest;
    use crate::testing::{organization_created, FakeStore};

    #[tokio::test]
    async fn creates_one_profile_with_no_milestones() {
        let store = Arc::new(FakeStore::new());
        let hook = CreateChurchMemberHook::new(store.clone());
        let event = organization_created("Grace Chapel", "Alice");

        hook.after_create_organization(&event).await.unwrap();

        let page = store
            .search(event.organization.id, "", &PageRequest::first(10))
            .await
            .unwrap();
        assert_eq!(page.page.len(), 1);
        let profile = &page.page[0];
        assert_eq!(profile.name, "Alice");
        assert_eq!(profile.organization_member_id, event.member.id);
        assert!(profile.milestones_achieved.is_empty());
    }

    #[tokio::test]
    async fn repeated_delivery_does_not_duplicate_the_profile() {
        let store = Arc::new(FakeStore::new());
        let hook = CreateChurchMemberHook::new(store.clone());
        let event = organization_created("Grace Chapel", "Alice");

        hook.after_create_organization(&event).await.unwrap();
        hook.after_create_organization(&event).await.unwrap();

        assert_eq!(store.count(event.organization.id, "").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn store_failures_surface_as_hook_errors() {
        let store = Arc::new(FakeStore::new());
        store.fail_writes();
        let hook = CreateChurchMemberHook::new(store);

        let err = hook
            .after_create_organization(&organization_created("Grace Chapel", "Alice"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("create_church_member"));
    }
}
