use axum::{
    extract::{Query, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use mongodb::bson::doc;
use mongodb::Collection;
use reqwest::Url;
use serde::Deserialize;
use tracing::warn;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middlewares::auth::{create_token, session_cookie};
use crate::models::portfolio::Portfolio;
use crate::models::user::{User, ROLE_ADMIN, ROLE_USER};
use crate::AppState;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

fn authorize_url(config: &Config) -> Result<Url, AppError> {
    Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("client_id", config.google_client_id.as_str()),
            ("redirect_uri", config.oauth_callback_url.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
        ],
    )
    .map_err(AppError::internal)
}

async fn google_redirect(State(state): State<AppState>) -> AppResult<Redirect> {
    let url = authorize_url(&state.config)?;
    Ok(Redirect::to(url.as_str()))
}

#[derive(Deserialize)]
struct CallbackQuery {
    #[serde(default)]
    code: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GoogleUser {
    id: String,
    email: String,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
}

async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    match callback_inner(&state, query.code).await {
        Ok(response) => response,
        Err(e) => {
            warn!("google oauth callback failed: {e}");
            Redirect::to(&format!("{}/login", state.config.frontend_origin)).into_response()
        }
    }
}

async fn callback_inner(state: &AppState, code: Option<String>) -> AppResult<Response> {
    let code = code.ok_or(AppError::BadRequest("Missing authorization code"))?;

    let client = reqwest::Client::new();
    let token: TokenResponse = client
        .post(TOKEN_URL)
        .form(&[
            ("code", code.as_str()),
            ("client_id", state.config.google_client_id.as_str()),
            ("client_secret", state.config.google_client_secret.as_str()),
            ("redirect_uri", state.config.oauth_callback_url.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(AppError::internal)?
        .error_for_status()
        .map_err(AppError::internal)?
        .json()
        .await
        .map_err(AppError::internal)?;

    let profile: GoogleUser = client
        .get(USERINFO_URL)
        .bearer_auth(&token.access_token)
        .send()
        .await
        .map_err(AppError::internal)?
        .error_for_status()
        .map_err(AppError::internal)?
        .json()
        .await
        .map_err(AppError::internal)?;

    let user = find_or_create_user(state, profile).await?;

    let token = create_token(&user, &state.config.jwt_secret, false)?;
    let cookie = session_cookie(&token, false);

    let dashboard = if user.role == ROLE_ADMIN {
        "/admin-dashboard"
    } else {
        "/user-dashboard"
    };
    let target = format!("{}{dashboard}", state.config.frontend_origin);

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Redirect::to(&target),
    )
        .into_response())
}

async fn find_or_create_user(state: &AppState, profile: GoogleUser) -> AppResult<User> {
    let users: Collection<User> = state.db.collection("users");
    if let Some(user) = users
        .find_one(doc! { "email": &profile.email }, None)
        .await?
    {
        return Ok(user);
    }

    // Google accounts arrive pre-verified and carry no password.
    let mut user = User {
        id: None,
        email: profile.email,
        password: String::new(),
        role: ROLE_USER.to_string(),
        first_name: profile.given_name,
        last_name: profile.family_name,
        phone: None,
        date_of_birth: None,
        is_verified: true,
        two_fa_enabled: false,
        failed_login_attempts: 0,
        lock_until: None,
        google_id: Some(profile.id),
        status: None,
    };
    let result = users.insert_one(&user, None).await?;
    let user_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::internal("insert returned no ObjectId"))?;
    user.id = Some(user_id);

    let portfolios: Collection<Portfolio> = state.db.collection("portfolios");
    portfolios.insert_one(Portfolio::new(user_id), None).await?;

    Ok(user)
}

pub fn oauth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(google_redirect))
        .route("/auth/google/callback", get(google_callback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_the_oauth_parameters() {
        let config = Config {
            port: 3000,
            mongodb_uri: String::new(),
            database_name: String::new(),
            jwt_secret: "secret".to_string(),
            frontend_origin: "http://localhost:5173".to_string(),
            google_client_id: "client-123".to_string(),
            google_client_secret: "shh".to_string(),
            oauth_callback_url: "http://localhost:3000/auth/google/callback".to_string(),
        };
        let url = authorize_url(&config).unwrap();
        assert!(url.as_str().starts_with(AUTHORIZE_URL));
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(pairs.contains(&("client_id".to_string(), "client-123".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("scope".to_string(), "openid email profile".to_string())));
    }
}
