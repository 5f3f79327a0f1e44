use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{Extensions, HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};

use tenantdesk_auth::TokenService;

use crate::app::errors;
use crate::context::PrincipalContext;

/// Whether `X-Forwarded-For` comes from a proxy we control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyTrust(pub bool);

#[derive(Clone)]
pub struct AuthState {
    pub tokens: TokenService,
    pub proxy: ProxyTrust,
}

/// Verify the bearer token and attach a [`PrincipalContext`].
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let unauthorized = || errors::json_error(StatusCode::UNAUTHORIZED, "Invalid or expired token");

    let token = extract_bearer(req.headers()).ok_or_else(unauthorized)?;
    let claims = state.tokens.verify(token).map_err(|_| unauthorized())?;

    let ip = client_ip(req.headers(), req.extensions(), state.proxy);
    let principal = PrincipalContext::new(claims, ip);
    tracing::debug!(user_id = %principal.claims().user_id, role = %principal.claims().role, "request authenticated");
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// First `X-Forwarded-For` hop when the proxy is trusted, else the socket
/// peer (when the server was started with connect info).
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions, proxy: ProxyTrust) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .filter(|_| proxy.0)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded {
        Some(ip) => Some(ip.to_string()),
        None => extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string()),
    }
}
