use std::sync::Arc;

use warp::{
    http::{header::AUTHORIZATION, HeaderMap},
    Filter, Rejection,
};

use crate::{
    auth::Auth, case_insensitive_string_ext::CaseInsensitiveStringExt, error::AuthError,
    routes::with_state, types::RequestIdentity,
};

/// Resolve the caller's identity from the `authorization` header, or reject with
/// [`AuthError::Unauthenticated`].
///
/// The header may carry the raw token or `Bearer <token>`. A header that is not
/// visible ASCII, a forged token and an expired token are all rejected identically.
pub fn with_identity(
    auth: &Arc<Auth>,
) -> impl Filter<Extract = (RequestIdentity,), Error = Rejection> + Clone {
    warp::header::headers_cloned()
        .and(with_state(auth.clone()))
        .and_then(identify)
}

async fn identify(headers: HeaderMap, auth: Arc<Auth>) -> Result<RequestIdentity, Rejection> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AuthError::Unauthenticated)?;

    match auth.verify_token(token) {
        Ok(subject) => Ok(RequestIdentity(subject)),
        Err(reason) => {
            tracing::debug!(%reason, "identity token rejected");
            Err(AuthError::Unauthenticated.into())
        }
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();
    let token = header
        .strip_prefix_ignore_ascii_case("bearer ")
        .unwrap_or(header)
        .trim();

    (!token.is_empty()).then_some(token)
}
