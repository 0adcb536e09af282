use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::Header;
use axum_extra::TypedHeader;

use crate::error::AppError;
use crate::state::AppState;

static WORKER_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-home-inventory-worker-token");

/// The worker shared-secret header, typed via `axum_extra`'s `Header`
/// trait rather than parsing the raw header value by hand.
pub struct WorkerToken(pub String);

impl Header for WorkerToken {
    fn name() -> &'static HeaderName {
        &WORKER_TOKEN_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, axum_extra::headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(axum_extra::headers::Error::invalid)?;
        let s = value.to_str().map_err(|_| axum_extra::headers::Error::invalid())?;
        Ok(WorkerToken(s.to_string()))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        if let Ok(value) = HeaderValue::from_str(&self.0) {
            values.extend(std::iter::once(value));
        }
    }
}

/// Gates every `/internal/*` route: a missing or mismatched token returns
/// 401 at the transport layer, without the core ever seeing it.
pub async fn worker_auth_middleware(
    State(state): State<AppState>,
    header: Option<TypedHeader<WorkerToken>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(configured) = state.worker_token.as_deref() else {
        tracing::error!("HOME_INVENTORY_WORKER_TOKEN is unset; rejecting internal request");
        return AppError::Unauthorized.into_response();
    };
    match header {
        Some(TypedHeader(WorkerToken(token))) if token == configured => next.run(req).await,
        _ => AppError::Unauthorized.into_response(),
    }
}
