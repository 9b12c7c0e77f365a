// Organization lifecycle hooks, run by the auth platform after an
// organization has been durably created.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::auth::platform::{Member, Organization, User};

/// Payload handed to hooks: the new organization, the creator's membership
/// and the creating user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationCreated {
    pub organization: Organization,
    pub member: Member,
    pub user: User,
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Hook '{hook}' failed: {message}")]
    Failed { hook: &'static str, message: String },
}

impl HookError {
    pub fn failed(hook: &'static str, message: impl Into<String>) -> Self {
        HookError::Failed {
            hook,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait OrganizationHook: Send + Sync {
    /// Hook name for logging and debugging
    fn name(&self) -> &'static str;

    /// Lower numbers run first
    fn priority(&self) -> u8 {
        50
    }

    async fn after_create_organization(&self, event: &OrganizationCreated) -> Result<(), HookError>;
}

pub type HookBox = Arc<dyn OrganizationHook>;

/// Ordered set of organization hooks
#[derive(Clone, Default)]
pub struct HookPipeline {
    hooks: Vec<HookBox>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: HookBox) {
        tracing::debug!("Registered organization hook '{}'", hook.name());
        self.hooks.push(hook);
        self.hooks.sort_by_key(|h| h.priority());
    }

    pub fn with_hook(mut self, hook: HookBox) -> Self {
        self.register(hook);
        self
    }

    /// Runs every hook in priority order. A failing hook is logged and
    /// reported but does not stop the others; the organization already exists.
    pub async fn run_after_create(&self, event: &OrganizationCreated) -> Vec<HookError> {
        let mut failures = Vec::new();

        for hook in &self.hooks {
            let started = Instant::now();
            match hook.after_create_organization(event).await {
                Ok(()) => tracing::debug!(
                    "Hook '{}' completed for organization {} in {:?}",
                    hook.name(),
                    event.organization.id,
                    started.elapsed()
                ),
                Err(e) => {
                    tracing::error!(
                        "Hook '{}' failed for organization {}: {}",
                        hook.name(),
                        event.organization.id,
                        e
                    );
                    failures.push(e);
                }
            }
        }

        failures
    }
}
