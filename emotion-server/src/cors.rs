//! Cross-origin policy.
//!
//! Two pieces: [`origin_gate`] turns away requests whose `Origin` is not on
//! the allow-list before they reach any handler, and [`cors_layer`] adds the
//! CORS response headers and answers preflights for allowed origins.
//! Requests without an `Origin` header (curl, server-to-server) pass.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::header::{CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use emotion_core::config::CorsConfig;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::error::ApiError;

#[derive(Debug, Clone, Default)]
pub struct AllowList {
    origins: Vec<String>,
    allow_any: bool,
}

impl AllowList {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for origin in origins {
            let origin = origin.as_ref().trim().trim_end_matches('/');
            match origin {
                "" => {}
                "*" => list.allow_any = true,
                _ => list.origins.push(origin.to_string()),
            }
        }
        list
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allow_any || self.origins.iter().any(|o| o == origin)
    }

    fn allow_origin(&self) -> AllowOrigin {
        if self.allow_any {
            return AllowOrigin::any();
        }

        let values = self
            .origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!("Ignoring allowed origin that is not a valid header value: {}", o);
                    None
                }
            })
            .collect::<Vec<_>>();
        AllowOrigin::list(values)
    }
}

impl From<&CorsConfig> for AllowList {
    fn from(config: &CorsConfig) -> Self {
        Self::new(&config.allowed_origins)
    }
}

pub fn cors_layer(allow_list: &AllowList, max_age: Duration) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allow_list.allow_origin())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(max_age)
}

pub async fn origin_gate(
    State(allow_list): State<Arc<AllowList>>,
    request: Request,
    next: Next,
) -> Response {
    let allowed = match request.headers().get(ORIGIN) {
        None => true,
        Some(origin) => origin
            .to_str()
            .map(|o| allow_list.is_allowed(o))
            .unwrap_or(false),
    };

    if allowed {
        return next.run(request).await;
    }

    tracing::warn!(
        origin = ?request.headers().get(ORIGIN),
        method = %request.method(),
        path = %request.uri().path(),
        "Blocked request from disallowed origin"
    );
    ApiError::OriginRejected.into_response()
}
