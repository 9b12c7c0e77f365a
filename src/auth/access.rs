use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    Organization,
    Member,
    Invitation,
    ChurchMember,
    Milestone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

const ALL_ACTIONS: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

/// Permission statements: the actions required (or granted) per resource.
///
/// Serializes as `{ "churchMember": ["read"] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statements(BTreeMap<Resource, BTreeSet<Action>>);

impl Statements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, resource: Resource, actions: impl IntoIterator<Item = Action>) -> Self {
        self.0.entry(resource).or_default().extend(actions);
        self
    }

    pub fn merge(&mut self, other: &Statements) {
        for (resource, actions) in &other.0 {
            self.0.entry(*resource).or_default().extend(actions.iter().copied());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeSet::is_empty)
    }

    /// True when every required action is granted here
    pub fn covers(&self, required: &Statements) -> bool {
        required.0.iter().all(|(resource, actions)| {
            let granted = self.0.get(resource);
            actions
                .iter()
                .all(|action| granted.is_some_and(|g| g.contains(action)))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    pub fn statements(&self) -> Statements {
        match self {
            Role::Owner => Statements::new()
                .allow(Resource::Organization, [Action::Update, Action::Delete])
                .allow(Resource::Member, [Action::Create, Action::Update, Action::Delete])
                .allow(Resource::Invitation, [Action::Create, Action::Delete])
                .allow(Resource::ChurchMember, ALL_ACTIONS)
                .allow(Resource::Milestone, ALL_ACTIONS),
            Role::Admin => Statements::new()
                .allow(Resource::Organization, [Action::Update])
                .allow(Resource::Member, [Action::Create, Action::Update, Action::Delete])
                .allow(Resource::Invitation, [Action::Create, Action::Delete])
                .allow(Resource::ChurchMember, ALL_ACTIONS)
                .allow(Resource::Milestone, ALL_ACTIONS),
            Role::Member => Statements::new()
                .allow(Resource::ChurchMember, [Action::Read])
                .allow(Resource::Milestone, [Action::Read]),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Checks a member's role field (comma-separated role names) against the
/// required statements. Unknown role names grant nothing.
pub fn roles_permit(role_field: &str, required: &Statements) -> bool {
    let mut granted = Statements::new();
    for role in role_field.split(',').filter_map(|r| r.parse::<Role>().ok()) {
        granted.merge(&role.statements());
    }
    granted.covers(required)
}
