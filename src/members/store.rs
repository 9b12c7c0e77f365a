use async_trait::async_trait;
use uuid::Uuid;

use crate::database::DatabaseError;
use crate::members::models::{ChurchMember, Milestone, NewChurchMember};
use crate::pagination::{Page, PageRequest};

/// Storage for the application's own records. Every read is scoped to one
/// organization.
#[async_trait]
pub trait ChurchMemberStore: Send + Sync {
    /// Members of the organization matching `term`, best matches first.
    /// A blank term lists every member in creation order.
    async fn search(
        &self,
        organization_id: Uuid,
        term: &str,
        request: &PageRequest,
    ) -> Result<Page<ChurchMember>, DatabaseError>;

    async fn count(&self, organization_id: Uuid, term: &str) -> Result<u64, DatabaseError>;

    async fn find(&self, organization_id: Uuid, id: Uuid) -> Result<Option<ChurchMember>, DatabaseError>;

    /// Returns the existing row when one already shadows the same membership
    async fn insert(&self, member: NewChurchMember) -> Result<ChurchMember, DatabaseError>;

    async fn list_milestones(&self, organization_id: Uuid) -> Result<Vec<Milestone>, DatabaseError>;

    /// Milestones of the organization among `ids`, in no particular order
    async fn milestones_by_ids(
        &self,
        organization_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Milestone>, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// Lower-cased alphanumeric tokens of a search term
pub fn search_tokens(term: &str) -> Vec<String> {
    term.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Prefix-matching tsquery for `term`, or `None` for a blank term
pub fn prefix_tsquery(term: &str) -> Option<String> {
    let tokens = search_tokens(term);
    if tokens.is_empty() {
        return None;
    }
    Some(
        tokens
            .iter()
            .map(|t| format!("{}:*", t))
            .collect::<Vec<_>>()
            .join(" & "),
    )
}

/// Matching rule shared with the tsquery: every token prefixes some word
pub fn name_matches(name: &str, term: &str) -> bool {
    let words = search_tokens(name);
    search_tokens(term)
        .iter()
        .all(|token| words.iter().any(|w| w.starts_with(token.as_str())))
}
