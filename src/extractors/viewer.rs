//! Per-request viewer identity.
//!
//! Authentication happens in front of this service; the proxy forwards the
//! resolved username in `AppState::auth_header`. The value is read on every
//! request and never stored.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

use crate::{errors::AppError, state::AppState};

/// Name some identity providers use for an unauthenticated principal.
const ANONYMOUS_PRINCIPAL: &str = "anonymousUser";

/// The principal behind a request, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    Authenticated(String),
}

impl Viewer {
    pub fn username(&self) -> Option<&str> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(name) => Some(name),
        }
    }

    fn from_parts(parts: &Parts, state: &AppState) -> Self {
        parts
            .headers
            .get(&state.auth_header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty() && *name != ANONYMOUS_PRINCIPAL)
            .map(|name| Viewer::Authenticated(name.to_string()))
            .unwrap_or(Viewer::Anonymous)
    }
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Viewer::from_parts(parts, state))
    }
}

/// An authenticated username. Rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct Principal(pub String);

impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Viewer::from_parts(parts, state) {
            Viewer::Authenticated(name) => Ok(Principal(name)),
            Viewer::Anonymous => Err(AppError::unauthorized()),
        }
    }
}
