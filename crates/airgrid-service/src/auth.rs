//! Caller identity extraction.
//!
//! An upstream gateway authenticates users and forwards who they are in two
//! headers:
//!
//! - `X-Caller-Role`: `admin`, `inspector` or `supervisor`
//! - `X-Caller-Id`: numeric id for admins and inspectors, telephone number
//!   for supervisors
//!
//! Handlers take a [`Caller`] argument and pass the inner [`Identity`] to the
//! workflow services, which enforce the role they need.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use airgrid_core::{Identity, Role};

use crate::api::AppError;

pub const CALLER_ROLE_HEADER: &str = "X-Caller-Role";
pub const CALLER_ID_HEADER: &str = "X-Caller-Id";

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl Caller {
    /// Read the caller from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let role: Role = header(headers, CALLER_ROLE_HEADER)?
            .parse()
            .map_err(AppError::BadRequest)?;
        let identity = Identity::parse(role, header(headers, CALLER_ID_HEADER)?)
            .map_err(AppError::BadRequest)?;
        Ok(Caller(identity))
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .ok_or_else(|| AppError::Unauthorized(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| AppError::BadRequest(format!("{name} header is not valid text")))
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}
