// Router harness over the crate's in-memory doubles.
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use church_api::app::{router, AppState};
use church_api::auth::OnboardingRoutes;
use church_api::config::MembersConfig;
use church_api::hooks::HookPipeline;
use church_api::members::CreateChurchMemberHook;
use church_api::testing::{FakePlatform, FakeStore};

/// Router wired to the doubles, with the church member hook registered
pub struct TestApp {
    pub platform: FakePlatform,
    pub store: Arc<FakeStore>,
    router: Router,
}

impl TestApp {
    pub fn anonymous() -> Self {
        Self::with_platform(FakePlatform::anonymous())
    }

    pub fn signed_in(name: &str) -> Self {
        Self::with_platform(FakePlatform::signed_in(name))
    }

    fn with_platform(platform: FakePlatform) -> Self {
        let store = Arc::new(FakeStore::new());
        let hooks = HookPipeline::new().with_hook(Arc::new(CreateChurchMemberHook::new(store.clone())));
        let platform = platform.with_hooks(hooks);

        let state = AppState {
            platform: Arc::new(platform.clone()),
            members: store.clone(),
            onboarding: OnboardingRoutes::default(),
            members_config: MembersConfig {
                default_page_size: 2,
                max_page_size: 5,
            },
        };
        let router = router(state, &["http://localhost:5173".to_string()]);

        Self {
            platform,
            store,
            router,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, "Bearer test-session");
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }
}
