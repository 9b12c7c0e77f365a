use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{DatabaseError, DatabaseManager};
use crate::members::models::{ChurchMember, Milestone, NewChurchMember};
use crate::members::store::{prefix_tsquery, ChurchMemberStore};
use crate::pagination::{Page, PageRequest};

const MEMBER_COLUMNS: &str =
    "id, organization_id, organization_member_id, name, milestones_achieved, created_at";

/// Postgres-backed store over the `church_members` and `milestones` tables.
///
/// `church_members` carries a unique key on
/// `(organization_id, organization_member_id)`, which makes repeated hook
/// deliveries harmless.
#[derive(Clone)]
pub struct PgChurchMemberStore {
    pool: PgPool,
}

impl PgChurchMemberStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChurchMemberStore for PgChurchMemberStore {
    async fn search(
        &self,
        organization_id: Uuid,
        term: &str,
        request: &PageRequest,
    ) -> Result<Page<ChurchMember>, DatabaseError> {
        let offset = i64::try_from(request.offset()).unwrap_or(i64::MAX);
        let limit = i64::try_from(request.window()).unwrap_or(i64::MAX);

        let rows = match prefix_tsquery(term) {
            None => {
                let query = format!(
                    r#"
                    SELECT {MEMBER_COLUMNS}
                    FROM church_members
                    WHERE organization_id = $1
                    ORDER BY created_at, id
                    OFFSET $2 LIMIT $3
                    "#
                );
                sqlx::query_as::<_, ChurchMember>(&query)
                    .bind(organization_id)
                    .bind(offset)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            Some(tsquery) => {
                let query = format!(
                    r#"
                    SELECT {MEMBER_COLUMNS}
                    FROM church_members
                    WHERE organization_id = $1
                    AND to_tsvector('simple', name) @@ to_tsquery('simple', $2)
                    ORDER BY ts_rank(to_tsvector('simple', name), to_tsquery('simple', $2)) DESC,
                             created_at, id
                    OFFSET $3 LIMIT $4
                    "#
                );
                sqlx::query_as::<_, ChurchMember>(&query)
                    .bind(organization_id)
                    .bind(&tsquery)
                    .bind(offset)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        tracing::debug!(
            "Member search in {} for {:?} returned {} row(s) at offset {}",
            organization_id,
            term,
            rows.len(),
            offset
        );
        Ok(Page::from_window(rows, request))
    }

    async fn count(&self, organization_id: Uuid, term: &str) -> Result<u64, DatabaseError> {
        let (count,): (i64,) = match prefix_tsquery(term) {
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM church_members WHERE organization_id = $1")
                    .bind(organization_id)
                    .fetch_one(&self.pool)
                    .await?
            }
            Some(tsquery) => {
                sqlx::query_as(
                    r#"
                    SELECT COUNT(*) FROM church_members
                    WHERE organization_id = $1
                    AND to_tsvector('simple', name) @@ to_tsquery('simple', $2)
                    "#,
                )
                .bind(organization_id)
                .bind(&tsquery)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(count.max(0) as u64)
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> Result<Option<ChurchMember>, DatabaseError> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM church_members WHERE organization_id = $1 AND id = $2"
        );
        let row = sqlx::query_as::<_, ChurchMember>(&query)
            .bind(organization_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert(&self, member: NewChurchMember) -> Result<ChurchMember, DatabaseError> {
        // The second branch sees the pre-statement snapshot, so it only yields
        // a row when the insert was skipped for an already committed profile.
        let query = format!(
            r#"
            WITH inserted AS (
                INSERT INTO church_members (id, organization_id, organization_member_id, name, milestones_achieved)
                VALUES ($1, $2, $3, $4, '{{}}')
                ON CONFLICT (organization_id, organization_member_id) DO NOTHING
                RETURNING {MEMBER_COLUMNS}
            )
            SELECT {MEMBER_COLUMNS} FROM inserted
            UNION ALL
            SELECT {MEMBER_COLUMNS} FROM church_members
            WHERE organization_id = $2 AND organization_member_id = $3
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, ChurchMember>(&query)
            .bind(Uuid::new_v4())
            .bind(member.organization_id)
            .bind(member.organization_member_id)
            .bind(&member.name)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = row {
            return Ok(row);
        }

        // A concurrent delivery committed the profile after our snapshot
        tracing::debug!(
            "Church member for membership {} was created concurrently, re-reading",
            member.organization_member_id
        );
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM church_members WHERE organization_id = $1 AND organization_member_id = $2"
        );
        let row = sqlx::query_as::<_, ChurchMember>(&query)
            .bind(member.organization_id)
            .bind(member.organization_member_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_milestones(&self, organization_id: Uuid) -> Result<Vec<Milestone>, DatabaseError> {
        let rows = sqlx::query_as::<_, Milestone>(
            r#"
            SELECT id, organization_id, title, description, created_at
            FROM milestones
            WHERE organization_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn milestones_by_ids(
        &self,
        organization_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Milestone>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, Milestone>(
            r#"
            SELECT id, organization_id, title, description, created_at
            FROM milestones
            WHERE organization_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(organization_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
