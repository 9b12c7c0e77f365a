// handlers - one module per resource, mounted by app::router
//
// Every handler except health receives the request-scoped AuthContext from
// the auth context middleware and resolves the caller through auth::guards.

pub mod health;
pub mod members;
pub mod milestones;
pub mod organizations;
pub mod session;
