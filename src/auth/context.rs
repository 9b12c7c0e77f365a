use axum::http::HeaderMap;
use std::sync::Arc;

use crate::auth::platform::AuthPlatform;
use crate::config::AuthConfig;

/// Destinations handed back to callers whose active organization cannot be
/// resolved automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingRoutes {
    pub no_organization: String,
    pub select_organization: String,
}

impl Default for OnboardingRoutes {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for OnboardingRoutes {
    fn from(config: &AuthConfig) -> Self {
        Self {
            no_organization: config.no_organization_url.clone(),
            select_organization: config.select_organization_url.clone(),
        }
    }
}

/// Request-scoped authentication context, threaded explicitly through every
/// resolver call.
#[derive(Clone)]
pub struct AuthContext {
    platform: Arc<dyn AuthPlatform>,
    headers: HeaderMap,
    onboarding: OnboardingRoutes,
}

impl AuthContext {
    pub fn new(platform: Arc<dyn AuthPlatform>, headers: HeaderMap, onboarding: OnboardingRoutes) -> Self {
        Self {
            platform,
            headers,
            onboarding,
        }
    }

    pub fn platform(&self) -> &dyn AuthPlatform {
        self.platform.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn onboarding(&self) -> &OnboardingRoutes {
        &self.onboarding
    }
}
