use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;

use crate::database::models::{Role, User};
use crate::error::ApiError;
use crate::services::AuthService;
use crate::state::AppState;

pub const TOKEN_COOKIE: &str = "token";

/// The authenticated caller. Extracting it protects a route: the session
/// token comes from `Authorization: Bearer` or the `token` cookie, and the
/// resolved user is cached in the request extensions.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }

    /// Reject callers whose role is not listed
    pub fn authorize(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.0.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "User role {} is not authorized to access this route",
                self.0.role
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let Some(token) = extract_token(&parts.headers) else {
            debug!("no session token on {}", parts.uri.path());
            return Err(ApiError::not_authorized());
        };
        let user = CurrentUser(AuthService::new(state).user_for_token(&token).await?);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// Bearer header first, then the `token` cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, days: i64, secure: bool) -> String {
    let mut cookie = format!("{}={}; Max-Age={}; Path=/; HttpOnly", TOKEN_COOKIE, token, days * 24 * 60 * 60);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that replaces the session token and expires shortly
pub fn logout_cookie() -> String {
    format!("{}=none; Max-Age=10; Path=/; HttpOnly", TOKEN_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        headers.insert(header::COOKIE, HeaderValue::from_static("token=cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_cookie_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=abc.def"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_missing_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn test_cookies() {
        assert_eq!(session_cookie("t", 1, false), "token=t; Max-Age=86400; Path=/; HttpOnly");
        assert!(session_cookie("t", 1, true).ends_with("; Secure"));
        assert!(logout_cookie().starts_with("token=none;"));
    }

    #[test]
    fn test_authorize() {
        let user = CurrentUser(User {
            id: "1".into(),
            name: "n".into(),
            email: "n@x.io".into(),
            role: Role::User,
            password: String::new(),
            reset_password_token: None,
            reset_password_expire: None,
            created_at: None,
        });
        assert!(user.authorize(&[Role::User]).is_ok());
        let err = user.authorize(&[Role::Publisher, Role::Admin]).unwrap_err();
        assert_eq!(err.message(), "User role user is not authorized to access this route");
    }
}
