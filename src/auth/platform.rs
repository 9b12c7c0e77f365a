use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::access::Statements;
use crate::database::DatabaseError;
use crate::hooks::OrganizationCreated;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub active_organization_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionWithUser {
    pub session: Session,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// Membership of a user in an organization. `role` may hold several
/// comma-separated role names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Identity attributes of a member, as returned by a member lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MemberIdentity {
    pub member_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub member_since: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub slug: String,
}

/// Why the platform refused a request. These are answers, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformRejection {
    Unauthorized,
    Forbidden,
    NotFound,
    BadRequest,
    Conflict,
}

#[derive(Debug, Error)]
pub enum AuthPlatformError {
    #[error("Auth platform rejected request ({rejection:?}): {message}")]
    Api {
        rejection: PlatformRejection,
        message: String,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl AuthPlatformError {
    pub fn rejected(rejection: PlatformRejection, message: impl Into<String>) -> Self {
        AuthPlatformError::Api {
            rejection,
            message: message.into(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, AuthPlatformError::Api { .. })
    }
}

impl From<sqlx::Error> for AuthPlatformError {
    fn from(err: sqlx::Error) -> Self {
        AuthPlatformError::Database(DatabaseError::Sqlx(err))
    }
}

/// The auth platform as seen by this application. Every call that acts on
/// behalf of a caller receives the caller's request headers, which carry the
/// session token.
#[async_trait]
pub trait AuthPlatform: Send + Sync {
    /// `Ok(None)` when the headers carry no valid session
    async fn get_session(&self, headers: &HeaderMap) -> Result<Option<SessionWithUser>, AuthPlatformError>;

    /// Rejects when the session has no active organization
    async fn get_active_member(&self, headers: &HeaderMap) -> Result<Member, AuthPlatformError>;

    async fn list_organizations(&self, headers: &HeaderMap) -> Result<Vec<Organization>, AuthPlatformError>;

    async fn set_active_organization(
        &self,
        headers: &HeaderMap,
        organization_id: Uuid,
    ) -> Result<(), AuthPlatformError>;

    /// Evaluated against the session's active organization
    async fn has_permission(
        &self,
        headers: &HeaderMap,
        statements: &Statements,
    ) -> Result<bool, AuthPlatformError>;

    async fn get_member(
        &self,
        organization_id: Uuid,
        member_id: Uuid,
    ) -> Result<Option<MemberIdentity>, AuthPlatformError>;

    /// Creates the organization with the caller as owner, makes it active and
    /// then runs the registered organization hooks.
    async fn create_organization(
        &self,
        headers: &HeaderMap,
        organization: NewOrganization,
    ) -> Result<OrganizationCreated, AuthPlatformError>;
}
