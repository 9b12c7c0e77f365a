// auth - session, organization and permission resolution against the auth platform
//
// Request path: AuthContext (built per request by middleware)
//   -> guards::get_server_session
//   -> guards::assert_active_organization
//   -> guards::assert_permitted

pub mod access;
pub mod context;
pub mod guards;
pub mod platform;
pub mod postgres;
pub mod slug;

pub use access::{Action, Resource, Role, Statements};
pub use context::{AuthContext, OnboardingRoutes};
pub use platform::{
    AuthPlatform, AuthPlatformError, Member, MemberIdentity, NewOrganization, Organization,
    PlatformRejection, Session, SessionWithUser, User,
};
pub use postgres::PgAuthPlatform;
