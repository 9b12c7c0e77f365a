use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::access::{roles_permit, Statements};
use crate::auth::platform::{
    AuthPlatform, AuthPlatformError, Member, MemberIdentity, NewOrganization, Organization,
    PlatformRejection, Session, SessionWithUser, User,
};
use crate::database::DatabaseError;
use crate::hooks::{HookPipeline, OrganizationCreated};

const MEMBER_COLUMNS: &str = "id, organization_id, user_id, role, created_at";

#[derive(FromRow)]
struct SessionRow {
    session_id: Uuid,
    user_id: Uuid,
    active_organization_id: Option<Uuid>,
    expires_at: DateTime<Utc>,
    name: String,
    email: String,
    phone_number: Option<String>,
    user_created_at: DateTime<Utc>,
}

impl From<SessionRow> for SessionWithUser {
    fn from(row: SessionRow) -> Self {
        SessionWithUser {
            session: Session {
                id: row.session_id,
                user_id: row.user_id,
                active_organization_id: row.active_organization_id,
                expires_at: row.expires_at,
            },
            user: User {
                id: row.user_id,
                name: row.name,
                email: row.email,
                phone_number: row.phone_number,
                created_at: row.user_created_at,
            },
        }
    }
}

/// Session token carried by the request: a bearer token wins over the cookie.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Sessions are stored by digest, never by raw token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Auth platform backed by the `user`, `session`, `organization` and `member`
/// tables.
#[derive(Clone)]
pub struct PgAuthPlatform {
    pool: PgPool,
    session_cookie: String,
    hooks: HookPipeline,
}

impl PgAuthPlatform {
    pub fn new(pool: PgPool, session_cookie: impl Into<String>, hooks: HookPipeline) -> Self {
        Self {
            pool,
            session_cookie: session_cookie.into(),
            hooks,
        }
    }

    async fn require_session(&self, headers: &HeaderMap) -> Result<SessionWithUser, AuthPlatformError> {
        self.get_session(headers)
            .await?
            .ok_or_else(|| AuthPlatformError::rejected(PlatformRejection::Unauthorized, "No valid session"))
    }

    async fn find_membership(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Member>, AuthPlatformError> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM member WHERE organization_id = $1 AND user_id = $2"
        );
        let member = sqlx::query_as::<_, Member>(&query)
            .bind(organization_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }
}

#[async_trait]
impl AuthPlatform for PgAuthPlatform {
    async fn get_session(&self, headers: &HeaderMap) -> Result<Option<SessionWithUser>, AuthPlatformError> {
        let Some(token) = session_token(headers, &self.session_cookie) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT s.id AS session_id, s.user_id, s.active_organization_id, s.expires_at,
                   u.name, u.email, u.phone_number, u.created_at AS user_created_at
            FROM session s
            JOIN "user" u ON u.id = s.user_id
            WHERE s.token_hash = $1 AND s.expires_at > now()
            "#,
        )
        .bind(hash_token(&token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SessionWithUser::from))
    }

    async fn get_active_member(&self, headers: &HeaderMap) -> Result<Member, AuthPlatformError> {
        let current = self.require_session(headers).await?;
        let organization_id = current.session.active_organization_id.ok_or_else(|| {
            AuthPlatformError::rejected(PlatformRejection::BadRequest, "No active organization")
        })?;

        self.find_membership(organization_id, current.user.id)
            .await?
            .ok_or_else(|| AuthPlatformError::rejected(PlatformRejection::NotFound, "Member not found"))
    }

    async fn list_organizations(&self, headers: &HeaderMap) -> Result<Vec<Organization>, AuthPlatformError> {
        let current = self.require_session(headers).await?;

        let organizations = sqlx::query_as::<_, Organization>(
            r#"
            SELECT o.id, o.name, o.slug, o.created_at
            FROM organization o
            JOIN member m ON m.organization_id = o.id
            WHERE m.user_id = $1
            ORDER BY o.created_at, o.id
            "#,
        )
        .bind(current.user.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(organizations)
    }

    async fn set_active_organization(
        &self,
        headers: &HeaderMap,
        organization_id: Uuid,
    ) -> Result<(), AuthPlatformError> {
        let current = self.require_session(headers).await?;

        if self.find_membership(organization_id, current.user.id).await?.is_none() {
            return Err(AuthPlatformError::rejected(
                PlatformRejection::Forbidden,
                "Not a member of this organization",
            ));
        }

        sqlx::query("UPDATE session SET active_organization_id = $1 WHERE id = $2")
            .bind(organization_id)
            .bind(current.session.id)
            .execute(&self.pool)
            .await?;

        debug!(
            "Session {} switched to organization {}",
            current.session.id, organization_id
        );
        Ok(())
    }

    async fn has_permission(
        &self,
        headers: &HeaderMap,
        statements: &Statements,
    ) -> Result<bool, AuthPlatformError> {
        let member = self.get_active_member(headers).await?;
        Ok(roles_permit(&member.role, statements))
    }

    async fn get_member(
        &self,
        organization_id: Uuid,
        member_id: Uuid,
    ) -> Result<Option<MemberIdentity>, AuthPlatformError> {
        let identity = sqlx::query_as::<_, MemberIdentity>(
            r#"
            SELECT m.id AS member_id, u.id AS user_id, m.role, u.email, u.phone_number,
                   m.created_at AS member_since
            FROM member m
            JOIN "user" u ON u.id = m.user_id
            WHERE m.organization_id = $1 AND m.id = $2
            "#,
        )
        .bind(organization_id)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    async fn create_organization(
        &self,
        headers: &HeaderMap,
        new: NewOrganization,
    ) -> Result<OrganizationCreated, AuthPlatformError> {
        let current = self.require_session(headers).await?;
        let mut tx = self.pool.begin().await?;

        let organization = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organization (id, name, slug)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.slug)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if DatabaseError::is_unique_violation(&e) {
                AuthPlatformError::rejected(
                    PlatformRejection::Conflict,
                    format!("Organization slug '{}' is already taken", new.slug),
                )
            } else {
                e.into()
            }
        })?;

        let query = format!(
            r#"
            INSERT INTO member (id, organization_id, user_id, role)
            VALUES ($1, $2, $3, 'owner')
            RETURNING {MEMBER_COLUMNS}
            "#
        );
        let member = sqlx::query_as::<_, Member>(&query)
            .bind(Uuid::new_v4())
            .bind(organization.id)
            .bind(current.user.id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE session SET active_organization_id = $1 WHERE id = $2")
            .bind(organization.id)
            .bind(current.session.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(
            "Created organization '{}' ({}) owned by user {}",
            organization.name, organization.id, current.user.id
        );

        let event = OrganizationCreated {
            organization,
            member,
            user: current.user,
        };
        let failures = self.hooks.run_after_create(&event).await;
        if !failures.is_empty() {
            warn!(
                "{} organization hook(s) failed for {}",
                failures.len(),
                event.organization.id
            );
        }

        Ok(event)
    }
}
