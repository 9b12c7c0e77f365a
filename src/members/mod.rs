// members - church member profiles, milestones and the members directory

pub mod hook;
pub mod models;
pub mod postgres;
pub mod service;
pub mod store;

pub use hook::CreateChurchMemberHook;
pub use models::{ChurchMember, MemberView, Milestone, NewChurchMember};
pub use postgres::PgChurchMemberStore;
pub use service::{ListMembersArgs, MemberPage};
pub use store::ChurchMemberStore;
