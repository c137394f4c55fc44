//! Principal resolution at the access boundary.
//!
//! Authentication (login, sessions, token issuance) happens upstream; the
//! edge proxy strips any client-supplied principal headers and injects
//! trusted ones after validating the session. This extractor resolves them
//! into a [`Principal`] exactly once per request - core operations take the
//! principal as a parameter and never re-derive identity from ambient state.

use axum::{extract::FromRequestParts, http::request::Parts};

use little_sprout_core::{IdentityProvider, Principal, Role, UserId};

use crate::error::AppError;

/// Header carrying the authenticated user id (UUID).
pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
/// Header carrying the role: `customer` or `staff`.
pub const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";
/// Header carrying the identity provider: `local` or `google`. Optional,
/// defaults to `local`.
pub const PRINCIPAL_PROVIDER_HEADER: &str = "x-principal-provider";

/// Extractor that requires an authenticated principal.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequirePrincipal(principal): RequirePrincipal,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", principal.id)
/// }
/// ```
pub struct RequirePrincipal(pub Principal);

impl<S> FromRequestParts<S> for RequirePrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id: UserId = required_header(parts, PRINCIPAL_ID_HEADER)?
            .parse()
            .map_err(|_| unauthorized())?;
        let role: Role = required_header(parts, PRINCIPAL_ROLE_HEADER)?
            .parse()
            .map_err(|_| unauthorized())?;
        let provider: IdentityProvider = match header(parts, PRINCIPAL_PROVIDER_HEADER) {
            Some(value) => value.parse().map_err(|_| unauthorized())?,
            None => IdentityProvider::Local,
        };

        Ok(Self(Principal::new(id, role, provider)))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|value| value.to_str().ok())
}

fn required_header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    header(parts, name).ok_or_else(unauthorized)
}

/// One generic rejection for absent and malformed principal headers alike.
fn unauthorized() -> AppError {
    AppError::Unauthorized("authentication required".to_string())
}
