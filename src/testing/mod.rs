// In-memory doubles for the auth platform and the member store, shared by the
// unit tests and, through the `testing` feature, the integration tests.

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::auth::access::{roles_permit, Statements};
use crate::auth::context::{AuthContext, OnboardingRoutes};
use crate::auth::platform::{
    AuthPlatform, AuthPlatformError, Member, MemberIdentity, NewOrganization, Organization,
    PlatformRejection, Session, SessionWithUser, User,
};
use crate::database::DatabaseError;
use crate::hooks::{HookPipeline, OrganizationCreated};
use crate::members::models::{ChurchMember, Milestone, NewChurchMember};
use crate::members::store::{name_matches, ChurchMemberStore};
use crate::pagination::{Page, PageRequest};

pub fn user(name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email_for(name),
        phone_number: None,
        created_at: Utc::now(),
    }
}

pub fn email_for(name: &str) -> String {
    format!("{}@example.com", name.to_lowercase().replace(' ', "."))
}

pub fn organization(name: &str) -> Organization {
    Organization {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: crate::auth::slug::generate_slug(name),
        created_at: Utc::now(),
    }
}

pub fn membership(organization_id: Uuid, user_id: Uuid, role: &str) -> Member {
    Member {
        id: Uuid::new_v4(),
        organization_id,
        user_id,
        role: role.to_string(),
        created_at: Utc::now(),
    }
}

pub fn organization_created(org_name: &str, user_name: &str) -> OrganizationCreated {
    let organization = organization(org_name);
    let user = user(user_name);
    let member = membership(organization.id, user.id, "owner");
    OrganizationCreated {
        organization,
        member,
        user,
    }
}

fn database_down() -> DatabaseError {
    DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)
}

struct PlatformState {
    session: Option<SessionWithUser>,
    sessions_fail: bool,
    organizations: Vec<Organization>,
    members: Vec<Member>,
    identities: HashMap<Uuid, MemberIdentity>,
    permitted: bool,
    activation_broken: bool,
    calls: Vec<&'static str>,
    hooks: HookPipeline,
}

struct PlatformInner {
    state: Mutex<PlatformState>,
    lookup_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Auth platform double recording every call it receives
#[derive(Clone)]
pub struct FakePlatform {
    inner: Arc<PlatformInner>,
}

impl FakePlatform {
    fn with_session(session: Option<SessionWithUser>) -> Self {
        Self {
            inner: Arc::new(PlatformInner {
                state: Mutex::new(PlatformState {
                    session,
                    sessions_fail: false,
                    organizations: Vec::new(),
                    members: Vec::new(),
                    identities: HashMap::new(),
                    permitted: true,
                    activation_broken: false,
                    calls: Vec::new(),
                    hooks: HookPipeline::new(),
                }),
                lookup_delay: Mutex::new(None),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    pub fn anonymous() -> Self {
        Self::with_session(None)
    }

    pub fn signed_in(name: &str) -> Self {
        let user = user(name);
        let session = Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            active_organization_id: None,
            expires_at: Utc::now() + ChronoDuration::hours(1),
        };
        Self::with_session(Some(SessionWithUser { session, user }))
    }

    pub fn context(&self) -> AuthContext {
        AuthContext::new(Arc::new(self.clone()), HeaderMap::new(), OnboardingRoutes::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PlatformState> {
        self.inner.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn with_hooks(self, hooks: HookPipeline) -> Self {
        self.state().hooks = hooks;
        self
    }

    /// Adds an organization the signed-in user owns
    pub fn join_organization(&self, name: &str) -> Organization {
        let mut state = self.state();
        let user_id = state.session.as_ref().expect("signed in").user.id;
        let org = organization(name);
        state.members.push(membership(org.id, user_id, "owner"));
        state.organizations.push(org.clone());
        org
    }

    pub fn activate(&self, organization_id: Uuid) {
        if let Some(s) = self.state().session.as_mut() {
            s.session.active_organization_id = Some(organization_id);
        }
    }

    pub fn active_organization(&self) -> Option<Uuid> {
        self.state()
            .session
            .as_ref()
            .and_then(|s| s.session.active_organization_id)
    }

    pub fn break_activation(&self) {
        self.state().activation_broken = true;
    }

    pub fn deny_permissions(&self) {
        self.state().permitted = false;
    }

    pub fn fail_sessions(&self) {
        self.state().sessions_fail = true;
    }

    /// Adds another user as a plain member of the organization
    pub fn add_identity(&self, organization_id: Uuid, name: &str) -> MemberIdentity {
        let other = user(name);
        let member = membership(organization_id, other.id, "member");
        let identity = MemberIdentity {
            member_id: member.id,
            user_id: other.id,
            role: member.role.clone(),
            email: other.email,
            phone_number: None,
            member_since: member.created_at,
        };
        let mut state = self.state();
        state.members.push(member);
        state.identities.insert(identity.member_id, identity.clone());
        identity
    }

    /// Simulates a deleted user
    pub fn remove_identity(&self, member_id: Uuid) {
        self.state().identities.remove(&member_id);
    }

    pub fn delay_lookups(&self, delay: Duration) {
        *self.inner.lookup_delay.lock().unwrap() = Some(delay);
    }

    pub fn max_lookups_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: &'static str) {
        self.state().calls.push(call);
    }

    fn require_session(state: &PlatformState) -> Result<SessionWithUser, AuthPlatformError> {
        state
            .session
            .clone()
            .ok_or_else(|| AuthPlatformError::rejected(PlatformRejection::Unauthorized, "No session"))
    }

    fn active_member_of(state: &PlatformState) -> Result<Member, AuthPlatformError> {
        let session = Self::require_session(state)?;
        let organization_id = session.session.active_organization_id.ok_or_else(|| {
            AuthPlatformError::rejected(PlatformRejection::BadRequest, "No active organization")
        })?;
        state
            .members
            .iter()
            .find(|m| m.organization_id == organization_id && m.user_id == session.user.id)
            .cloned()
            .ok_or_else(|| AuthPlatformError::rejected(PlatformRejection::NotFound, "Member not found"))
    }
}

#[async_trait]
impl AuthPlatform for FakePlatform {
    async fn get_session(&self, _headers: &HeaderMap) -> Result<Option<SessionWithUser>, AuthPlatformError> {
        self.record("get_session");
        let state = self.state();
        if state.sessions_fail {
            return Err(database_down().into());
        }
        Ok(state.session.clone())
    }

    async fn get_active_member(&self, _headers: &HeaderMap) -> Result<Member, AuthPlatformError> {
        self.record("get_active_member");
        Self::active_member_of(&self.state())
    }

    async fn list_organizations(&self, _headers: &HeaderMap) -> Result<Vec<Organization>, AuthPlatformError> {
        self.record("list_organizations");
        let state = self.state();
        Self::require_session(&state)?;
        Ok(state.organizations.clone())
    }

    async fn set_active_organization(
        &self,
        _headers: &HeaderMap,
        organization_id: Uuid,
    ) -> Result<(), AuthPlatformError> {
        self.record("set_active_organization");
        let mut state = self.state();
        let session = Self::require_session(&state)?;
        let is_member = state
            .members
            .iter()
            .any(|m| m.organization_id == organization_id && m.user_id == session.user.id);
        if !is_member {
            return Err(AuthPlatformError::rejected(
                PlatformRejection::Forbidden,
                "Not a member of this organization",
            ));
        }
        if !state.activation_broken {
            if let Some(s) = state.session.as_mut() {
                s.session.active_organization_id = Some(organization_id);
            }
        }
        Ok(())
    }

    async fn has_permission(
        &self,
        _headers: &HeaderMap,
        statements: &Statements,
    ) -> Result<bool, AuthPlatformError> {
        self.record("has_permission");
        let state = self.state();
        let member = Self::active_member_of(&state)?;
        Ok(state.permitted && roles_permit(&member.role, statements))
    }

    async fn get_member(
        &self,
        _organization_id: Uuid,
        member_id: Uuid,
    ) -> Result<Option<MemberIdentity>, AuthPlatformError> {
        self.record("get_member");

        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.inner.lookup_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(self.state().identities.get(&member_id).cloned())
    }

    async fn create_organization(
        &self,
        _headers: &HeaderMap,
        new: NewOrganization,
    ) -> Result<OrganizationCreated, AuthPlatformError> {
        self.record("create_organization");
        let (event, hooks) = {
            let mut state = self.state();
            let session = Self::require_session(&state)?;
            if state.organizations.iter().any(|o| o.slug == new.slug) {
                return Err(AuthPlatformError::rejected(PlatformRejection::Conflict, "Slug already taken"));
            }
            let organization = Organization {
                id: Uuid::new_v4(),
                name: new.name,
                slug: new.slug,
                created_at: Utc::now(),
            };
            let member = membership(organization.id, session.user.id, "owner");
            state.organizations.push(organization.clone());
            state.members.push(member.clone());
            if let Some(s) = state.session.as_mut() {
                s.session.active_organization_id = Some(organization.id);
            }
            let event = OrganizationCreated {
                organization,
                member,
                user: session.user,
            };
            (event, state.hooks.clone())
        };

        hooks.run_after_create(&event).await;
        Ok(event)
    }
}

#[derive(Default)]
struct StoreState {
    members: Vec<ChurchMember>,
    milestones: Vec<Milestone>,
    writes_fail: bool,
}

/// Member store double; rows keep insertion order
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a profile directly, bypassing de-duplication
    pub fn seed(&self, organization_id: Uuid, organization_member_id: Uuid, name: &str) -> ChurchMember {
        let member = ChurchMember {
            id: Uuid::new_v4(),
            organization_id,
            organization_member_id,
            name: name.to_string(),
            milestones_achieved: Vec::new(),
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().members.push(member.clone());
        member
    }

    pub fn add_milestone(&self, organization_id: Uuid, title: &str) -> Milestone {
        let milestone = Milestone {
            id: Uuid::new_v4(),
            organization_id,
            title: title.to_string(),
            description: None,
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().milestones.push(milestone.clone());
        milestone
    }

    pub fn achieve(&self, member_id: Uuid, milestone_ids: &[Uuid]) {
        let mut state = self.state.lock().unwrap();
        if let Some(m) = state.members.iter_mut().find(|m| m.id == member_id) {
            m.milestones_achieved.extend_from_slice(milestone_ids);
        }
    }

    pub fn fail_writes(&self) {
        self.state.lock().unwrap().writes_fail = true;
    }

    fn matching(&self, organization_id: Uuid, term: &str) -> Vec<ChurchMember> {
        self.state
            .lock()
            .unwrap()
            .members
            .iter()
            .filter(|m| m.organization_id == organization_id && name_matches(&m.name, term))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChurchMemberStore for FakeStore {
    async fn search(
        &self,
        organization_id: Uuid,
        term: &str,
        request: &PageRequest,
    ) -> Result<Page<ChurchMember>, DatabaseError> {
        let rows = self
            .matching(organization_id, term)
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.window() as usize)
            .collect();
        Ok(Page::from_window(rows, request))
    }

    async fn count(&self, organization_id: Uuid, term: &str) -> Result<u64, DatabaseError> {
        Ok(self.matching(organization_id, term).len() as u64)
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> Result<Option<ChurchMember>, DatabaseError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .members
            .iter()
            .find(|m| m.organization_id == organization_id && m.id == id)
            .cloned())
    }

    async fn insert(&self, new: NewChurchMember) -> Result<ChurchMember, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        if state.writes_fail {
            return Err(database_down());
        }
        if let Some(existing) = state.members.iter().find(|m| {
            m.organization_id == new.organization_id
                && m.organization_member_id == new.organization_member_id
        }) {
            return Ok(existing.clone());
        }
        let member = ChurchMember {
            id: Uuid::new_v4(),
            organization_id: new.organization_id,
            organization_member_id: new.organization_member_id,
            name: new.name,
            milestones_achieved: Vec::new(),
            created_at: Utc::now(),
        };
        state.members.push(member.clone());
        Ok(member)
    }

    async fn list_milestones(&self, organization_id: Uuid) -> Result<Vec<Milestone>, DatabaseError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .milestones
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn milestones_by_ids(
        &self,
        organization_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Milestone>, DatabaseError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .milestones
            .iter()
            .rev()
            .filter(|m| m.organization_id == organization_id && ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
