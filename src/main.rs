mod config;
mod db;
mod error;
mod middlewares;
mod models;
mod routes;

use std::sync::Arc;

use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::{middleware, routing::get, Json, Router};
use mongodb::Database;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::{connect_to_mongo, seed_database};
use crate::middlewares::auth::{auth_middleware, require_admin};
use crate::routes::{admin, auth, market, oauth, user};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
}

async fn home() -> Json<Value> {
    Json(json!("Hello World!"))
}

async fn api_test() -> Json<Value> {
    Json(json!({ "message": "API is working!" }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::load();

    let db = connect_to_mongo(&config).await?;
    info!("Successfully connected to MongoDB");
    seed_database(&db).await?;

    let state = AppState {
        db: Arc::new(db),
        config: Arc::new(config.clone()),
    };

    // The SPA lives on another origin and authenticates with cookies.
    let cors = CorsLayer::new()
        .allow_origin(config.frontend_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);

    let protected_api = Router::new()
        .merge(user::user_routes())
        .merge(auth::protected_auth_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_api = admin::admin_routes()
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_router = Router::new()
        .route("/test", get(api_test))
        .merge(auth::auth_routes())
        .merge(market::market_routes())
        .merge(protected_api)
        .merge(admin_api);

    let app = Router::new()
        .route("/", get(home))
        .nest("/api", api_router)
        .merge(oauth::oauth_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server is running at http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
