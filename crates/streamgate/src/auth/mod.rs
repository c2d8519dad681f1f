//! Caller authentication context
//!
//! Issuing sessions is not this crate's job. The gateway only needs to know
//! whether the caller presented a bearer credential, so that question is put
//! behind [`AuthContextProvider`] and answered once per request before the
//! gateway runs.

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::trace;

/// Resolved credential state for one caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub access_token: Option<String>,
}

impl AuthContext {
    pub fn authenticated<S: Into<String>>(access_token: S) -> Self {
        Self {
            access_token: Some(access_token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The bearer credential, if one was resolved and is non-blank
    pub fn bearer(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Supplies the auth context for an incoming request
#[async_trait]
pub trait AuthContextProvider: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> AuthContext;
}

/// Resolves the caller's token from `Authorization: Bearer`, falling back to
/// a session cookie when one is configured.
#[derive(Debug, Clone, Default)]
pub struct BearerTokenProvider {
    session_cookie: Option<String>,
}

impl BearerTokenProvider {
    pub fn new(session_cookie: Option<&str>) -> Self {
        Self {
            session_cookie: session_cookie.map(str::to_string),
        }
    }
}

#[async_trait]
impl AuthContextProvider for BearerTokenProvider {
    async fn resolve(&self, headers: &HeaderMap) -> AuthContext {
        if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
            trace!("Resolved caller credential from authorization header");
            return AuthContext::authenticated(bearer.token());
        }

        if let Some(cookie_name) = &self.session_cookie {
            let jar = CookieJar::from_headers(headers);
            if let Some(cookie) = jar.get(cookie_name) {
                trace!(cookie = %cookie_name, "Resolved caller credential from session cookie");
                return AuthContext::authenticated(cookie.value());
            }
        }

        AuthContext::anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header};

    fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[tokio::test]
    async fn test_bearer_header_is_resolved() {
        let provider = BearerTokenProvider::new(Some("access_token"));
        let ctx = provider
            .resolve(&headers(&[(header::AUTHORIZATION, "Bearer abc123")]))
            .await;
        assert_eq!(ctx.bearer(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_cookie_fallback() {
        let provider = BearerTokenProvider::new(Some("access_token"));
        let ctx = provider
            .resolve(&headers(&[(header::COOKIE, "theme=dark; access_token=from-cookie")]))
            .await;
        assert_eq!(ctx.bearer(), Some("from-cookie"));
    }

    #[tokio::test]
    async fn test_cookie_ignored_when_not_configured() {
        let provider = BearerTokenProvider::new(None);
        let ctx = provider
            .resolve(&headers(&[(header::COOKIE, "access_token=from-cookie")]))
            .await;
        assert_eq!(ctx, AuthContext::anonymous());
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_is_anonymous() {
        let provider = BearerTokenProvider::new(None);
        let ctx = provider
            .resolve(&headers(&[(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")]))
            .await;
        assert!(ctx.bearer().is_none());
    }

    #[test]
    fn test_blank_token_is_not_a_credential() {
        assert!(AuthContext::authenticated("   ").bearer().is_none());
    }
}
