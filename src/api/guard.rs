use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState};

/// Header carrying the shared admin secret for privileged routes.
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Identity decoded from a verified session token, attached to the
/// request extensions for downstream handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub login: String,
}

#[derive(Deserialize)]
pub struct TokenQuery {
    token: Option<String>,
}

/// Token middleware. Accepts a session token from:
/// 1. `Authorization: Bearer <token>` header (the `Bearer ` prefix is optional)
/// 2. `?token=` query parameter
///
/// A missing token is `Unauthorized`; a token that fails verification
/// (bad signature, expired, malformed claims) is `Forbidden`.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();

    let Some(token) = extract_token(&query, &headers) else {
        tracing::warn!(event = "auth_denied", reason = "missing_token", path = %path, "Request without a session token");
        return Err(ApiError::unauthorized("Missing session token"));
    };

    let claims = match state.token_keys().verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(event = "auth_denied", reason = %e, path = %path, "Session token rejected");
            return Err(ApiError::forbidden("Invalid or expired session token"));
        }
    };

    let Ok(user_id) = claims.sub.parse::<i32>() else {
        tracing::warn!(event = "auth_denied", reason = "malformed_subject", path = %path, "Session token rejected");
        return Err(ApiError::forbidden("Invalid or expired session token"));
    };

    tracing::debug!(event = "auth_ok", user = %claims.name, path = %path, "Session token accepted");
    request.extensions_mut().insert(CurrentUser {
        id: user_id,
        login: claims.name,
    });
    Ok(next.run(request).await)
}

/// Admin middleware. Compares the `X-Admin-Key` header against the
/// configured shared secret with an exact match. An unconfigured
/// (empty) secret rejects every request.
pub async fn require_admin_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path();
    let configured = state.config().auth.admin_key.as_str();
    let presented = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if configured.is_empty() || presented != configured {
        tracing::warn!(event = "admin_denied", path = %path, "Admin key rejected");
        return Err(ApiError::forbidden("Invalid admin key"));
    }

    tracing::info!(event = "admin_ok", path = %path, "Admin key accepted");
    Ok(next.run(request).await)
}

fn extract_token(query: &TokenQuery, headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
    {
        let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    query.token.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn no_query() -> TokenQuery {
        TokenQuery { token: None }
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(
            extract_token(&no_query(), &headers),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn bare_header_value_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("abc.def.ghi"));
        assert_eq!(
            extract_token(&no_query(), &headers),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn query_parameter_is_the_fallback() {
        let query = TokenQuery {
            token: Some("from-query".to_string()),
        };
        assert_eq!(
            extract_token(&query, &HeaderMap::new()),
            Some("from-query".to_string())
        );
    }

    #[test]
    fn header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer header-token"),
        );
        let query = TokenQuery {
            token: Some("query-token".to_string()),
        };
        assert_eq!(
            extract_token(&query, &headers),
            Some("header-token".to_string())
        );
    }

    #[test]
    fn no_token_anywhere_is_none() {
        assert_eq!(extract_token(&no_query(), &HeaderMap::new()), None);
    }
}
