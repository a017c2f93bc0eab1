use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub username: String,
    pub email: Option<String>,
}

/// Auth middleware - extracts user identity from forwarded headers.
///
/// In production an auth proxy sits in front of this service and sets
/// X-Portal-User after token verification. For local development without a
/// proxy, we fall back to the bare x-user header.
///
/// The total-usage endpoint is not behind this middleware: it is called by
/// workspace accounts carrying the workspace api key instead of a user
/// session.
pub async fn auth_middleware(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let username = req
        .headers()
        .get("x-portal-user")
        .or_else(|| req.headers().get("x-forwarded-user")) // oauth2-proxy format
        .or_else(|| req.headers().get("x-user")) // fallback for dev
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let email = req
        .headers()
        .get("x-portal-email")
        .or_else(|| req.headers().get("x-forwarded-email"))
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    // If no username, return 401
    let username = username.ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut()
        .insert(AuthenticatedUser { username, email });

    Ok(next.run(req).await)
}
