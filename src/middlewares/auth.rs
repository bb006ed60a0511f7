use axum::body::Body;
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::{Parts, Request},
        HeaderMap,
    },
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::user::{User, ROLE_ADMIN};
use crate::AppState;

pub const TOKEN_COOKIE: &str = "token";

const DAY_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id, hex-encoded ObjectId.
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

/// The authenticated caller, attached to request extensions by
/// `auth_middleware`. The role comes from the token and is trusted as-is.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub email: String,
    pub role: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::MissingToken)
    }
}

/// Pulls the session token from the `token` cookie, or from an
/// `Authorization: Bearer` header as a fallback.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie_header) = headers.get(COOKIE) {
        let token = cookie_header
            .to_str()
            .unwrap_or("")
            .split(';')
            .map(|s| s.trim())
            .find_map(|s| s.strip_prefix("token="));
        if let Some(token) = token {
            return Some(token.to_string());
        }
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let token = token_from_headers(&parts.headers).ok_or(AppError::MissingToken)?;

    let decoding_key = DecodingKey::from_secret(state.config.jwt_secret.as_ref());
    let token_data = decode::<Claims>(&token, &decoding_key, &Validation::default())
        .map_err(|_| AppError::InvalidToken)?;

    let user_id =
        ObjectId::parse_str(&token_data.claims.sub).map_err(|_| AppError::InvalidToken)?;

    parts.extensions.insert(CurrentUser {
        id: user_id,
        email: token_data.claims.email,
        role: token_data.claims.role,
    });

    let req = Request::from_parts(parts, body);
    Ok(next.run(req).await)
}

/// Role gate for `/api/admin`; runs after `auth_middleware`.
pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::MissingToken)?;
    if !user.is_admin() {
        return Err(AppError::AdminRequired);
    }
    Ok(next.run(req).await)
}

/// Signs a session token for `user`: 24 hours, or 30 days with `remember_me`.
pub fn create_token(user: &User, secret: &str, remember_me: bool) -> Result<String, AppError> {
    let id = user.id.ok_or_else(|| AppError::internal("user has no id"))?;
    let ttl = chrono::Duration::seconds(session_ttl_seconds(remember_me));
    let claims = Claims {
        sub: id.to_hex(),
        email: user.email.clone(),
        role: user.role.clone(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn session_ttl_seconds(remember_me: bool) -> i64 {
    if remember_me {
        30 * DAY_SECONDS
    } else {
        DAY_SECONDS
    }
}

pub fn session_cookie(token: &str, remember_me: bool) -> String {
    format!(
        "{TOKEN_COOKIE}={token}; HttpOnly; Path=/; Max-Age={}; SameSite=Strict",
        session_ttl_seconds(remember_me)
    )
}

pub fn clear_cookie() -> String {
    format!("{TOKEN_COOKIE}=; HttpOnly; Path=/; Max-Age=0; SameSite=Strict")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: axum::http::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn sample_user() -> User {
        User {
            id: Some(ObjectId::new()),
            email: "jane@example.com".to_string(),
            password: String::new(),
            role: "user".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            phone: None,
            date_of_birth: None,
            is_verified: true,
            two_fa_enabled: false,
            failed_login_attempts: 0,
            lock_until: None,
            google_id: None,
            status: None,
        }
    }

    #[test]
    fn token_parsed_out_of_cookie_header() {
        let headers = headers_with(COOKIE, "theme=dark; token=abc.def.ghi; lang=en");
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_header_is_a_fallback() {
        let headers = headers_with(AUTHORIZATION, "Bearer abc.def.ghi");
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn no_credentials_yields_none() {
        let headers = headers_with(COOKIE, "theme=dark");
        assert_eq!(token_from_headers(&headers), None);
        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn issued_tokens_decode_with_the_same_secret() {
        let user = sample_user();
        let token = create_token(&user, "test-secret", false).unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.email, "jane@example.com");
        assert_eq!(data.claims.role, "user");
        assert_eq!(data.claims.sub, user.id.unwrap().to_hex());
    }

    #[test]
    fn remember_me_extends_the_session() {
        assert_eq!(session_ttl_seconds(false), 86400);
        assert_eq!(session_ttl_seconds(true), 30 * 86400);
        assert!(session_cookie("t", true).contains("Max-Age=2592000"));
    }

    #[test]
    fn cookies_are_http_only() {
        let cookie = session_cookie("abc", false);
        assert!(cookie.starts_with("token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(clear_cookie().contains("Max-Age=0"));
    }
}
