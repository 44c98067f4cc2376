use crate::core::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Authentication gate for protected routes.
///
/// Extracts the bearer token, verifies it, loads the identity it names and
/// attaches it to the request. Every failure path is terminal for the
/// request; handlers behind this layer can rely on a `Ctx` being present.
pub async fn mw_require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    debug!("MIDDLEWARE: require_auth");

    let auth_header = req.headers().get(header::AUTHORIZATION);
    let auth_header = match auth_header {
        Some(h) => h.to_str().map_err(|_| Error::AuthFailTokenWrongFormat)?,
        None => return Err(Error::AuthFailNoToken),
    };

    // Format: "Bearer <token>"
    if !auth_header.starts_with("Bearer ") {
        return Err(Error::AuthFailTokenWrongFormat);
    }

    let token = &auth_header[7..];

    // Verify signature and expiry
    let user_id = state
        .tokens
        .verify(token)
        .map_err(|_| Error::AuthFailTokenInvalid)?;

    // The token is stateless; the account it names may have been deleted
    // since issuance. A missing identity fails verification outright.
    let user = state
        .users
        .find_by_id(&user_id)
        .await
        .map_err(Error::from)?
        .ok_or(Error::AuthFailUserGone)?;

    // Store Ctx in request extensions (public identity only)
    req.extensions_mut().insert(Ctx::new(user.into()));

    Ok(next.run(req).await)
}
