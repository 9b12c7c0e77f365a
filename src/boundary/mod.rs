// Client-side error boundary: decodes an error payload once and decides which
// fallback view the caller should see.

use serde_json::Value;

use crate::error::ErrorCode;

/// Decoded error payload. `code` is only set for the recognized taxonomy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedError {
    pub code: Option<ErrorCode>,
    pub url: Option<String>,
    pub message: Option<String>,
}

/// Accepts either a bare code string or an object `{ code, url?, message? }`.
/// Unknown codes and unrecognized shapes decode to "no code".
pub fn parse_error(payload: &Value) -> ParsedError {
    match payload {
        Value::String(s) => ParsedError {
            code: s.parse().ok(),
            url: None,
            message: None,
        },
        Value::Object(map) => {
            let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
            ParsedError {
                code: map
                    .get("code")
                    .and_then(Value::as_str)
                    .and_then(|c| c.parse().ok()),
                url: text("url"),
                message: text("message"),
            }
        }
        _ => ParsedError::default(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackAction {
    SignIn,
    GoHome,
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    SignIn,
    Forbidden,
    NotFound,
    Navigate { url: String },
    Generic { message: Option<String> },
}

impl Fallback {
    pub fn from_payload(payload: &Value) -> Self {
        Self::from_parsed(parse_error(payload))
    }

    pub fn from_parsed(parsed: ParsedError) -> Self {
        match parsed.code {
            Some(ErrorCode::Unauthorized) => Fallback::SignIn,
            Some(ErrorCode::Forbidden) => Fallback::Forbidden,
            Some(ErrorCode::NotFound) => Fallback::NotFound,
            Some(ErrorCode::Redirect) => match parsed.url {
                Some(url) if !url.is_empty() => Fallback::Navigate { url },
                // A redirect with nowhere to go is malformed
                _ => Fallback::Generic {
                    message: parsed.message,
                },
            },
            None => Fallback::Generic {
                message: parsed.message,
            },
        }
    }

    pub fn actions(&self) -> &'static [FallbackAction] {
        match self {
            Fallback::SignIn => &[FallbackAction::SignIn],
            Fallback::Forbidden => &[FallbackAction::GoHome, FallbackAction::Retry],
            Fallback::NotFound => &[FallbackAction::GoHome],
            Fallback::Navigate { .. } => &[],
            Fallback::Generic { .. } => &[FallbackAction::GoHome, FallbackAction::Retry],
        }
    }
}

/// Holds at most one captured error. Nothing is retried automatically;
/// `retry` clears the error and bumps the invalidation generation so cached
/// reads are refetched.
#[derive(Debug, Default)]
pub struct ErrorBoundary {
    error: Option<Value>,
    invalidations: u64,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&mut self, payload: Value) {
        tracing::debug!("Error boundary captured {}", payload);
        self.error = Some(payload);
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn fallback(&self) -> Option<Fallback> {
        self.error.as_ref().map(Fallback::from_payload)
    }

    pub fn invalidations(&self) -> u64 {
        self.invalidations
    }

    pub fn reset(&mut self) {
        self.error = None;
    }

    pub fn retry(&mut self) {
        self.invalidations += 1;
        self.reset();
    }
}
