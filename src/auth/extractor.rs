use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header::COOKIE, request::Parts};

use crate::error::AppError;
use crate::state::AppState;

pub const TOKEN_COOKIE: &str = "token";

/// Authenticated caller, taken from the `token` cookie.
///
/// Rejects with 401 when the cookie is missing and 403 when the verifier
/// refuses it.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_cookies(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Access token required".to_string()))?;

        let identity = state.identity.verify(&token).await?;
        Ok(AuthUser { user_id: identity.user_id })
    }
}

fn token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        headers
    }

    #[test]
    fn finds_token_among_other_cookies() {
        let h = headers(&["theme=dark; token=abc.def.ghi; lang=en"]);
        assert_eq!(token_from_cookies(&h).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn looks_through_every_cookie_header() {
        let h = headers(&["theme=dark", "token=xyz"]);
        assert_eq!(token_from_cookies(&h).as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_or_empty_token_is_none() {
        assert!(token_from_cookies(&HeaderMap::new()).is_none());
        assert!(token_from_cookies(&headers(&["tokens=abc"])).is_none());
        assert!(token_from_cookies(&headers(&["token="])).is_none());
    }
}
