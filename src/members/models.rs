use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::platform::MemberIdentity;

/// Application-owned profile shadowing an auth-platform membership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ChurchMember {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Back-reference to the platform membership; not owned here
    pub organization_member_id: Uuid,
    pub name: String,
    pub milestones_achieved: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewChurchMember {
    pub organization_id: Uuid,
    pub organization_member_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Milestone {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Directory row: domain profile merged with identity attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub role: String,
    pub milestones_achieved: Vec<Uuid>,
    pub member_since: DateTime<Utc>,
}

impl MemberView {
    pub fn merge(member: ChurchMember, identity: MemberIdentity) -> Self {
        Self {
            id: member.id,
            name: member.name,
            email: identity.email,
            phone_number: identity.phone_number,
            role: identity.role,
            milestones_achieved: member.milestones_achieved,
            member_since: member.created_at,
        }
    }
}
