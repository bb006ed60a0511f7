use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

// Static placeholder data; a real feed integration is out of scope.
async fn prices() -> Json<Value> {
    Json(json!({
        "AAPL": { "price": 150.25, "change": 2.5 },
        "MSFT": { "price": 280.50, "change": -1.2 },
        "TSLA": { "price": 220.75, "change": 5.8 },
        "GOOGL": { "price": 2750.00, "change": -2.1 },
    }))
}

async fn news() -> Json<Value> {
    Json(json!([
        "Tech stocks rally on AI optimism",
        "Federal Reserve signals potential rate cut",
        "Oil prices surge amid supply concerns",
    ]))
}

pub fn market_routes() -> Router<AppState> {
    Router::new()
        .route("/market/prices", get(prices))
        .route("/market/news", get(news))
}
