use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};
use mongodb::options::FindOptions;
use mongodb::Collection;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::admin_data::{
    now_iso, AdminDoc, InvestmentPlan, PlanResponse, PlatformMetrics, PlatformSettings, Wallet,
    WalletResponse, METRICS_DOC, PLANS_DOC, SETTINGS_DOC, WALLETS_DOC,
};
use crate::models::portfolio::TransactionRecord;
use crate::models::user::{User, UserResponse, ROLE_USER};
use crate::AppState;

async fn get_metrics(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let admin_data = state.db.collection::<AdminDoc<PlatformMetrics>>("admin_data");
    let metrics = admin_data
        .find_one(doc! { "name": METRICS_DOC }, None)
        .await?
        .ok_or(AppError::NotFound("Metrics not found"))?;
    Ok(Json(metrics.data))
}

async fn list_users(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let users: Collection<User> = state.db.collection("users");
    let mut cursor = users.find(doc! { "role": ROLE_USER }, None).await?;

    let mut listed = Vec::new();
    while let Some(user) = cursor.try_next().await? {
        listed.push(UserResponse::from(&user));
    }
    Ok(Json(listed))
}

#[derive(Deserialize)]
struct StatusRequest {
    status: String,
}

async fn update_user_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = ObjectId::parse_str(&id).map_err(|_| AppError::BadRequest("Invalid user ID"))?;

    let users: Collection<User> = state.db.collection("users");
    let mut user = users
        .find_one(doc! { "_id": user_id }, None)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;

    users
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": { "status": &req.status } },
            None,
        )
        .await?;

    user.status = Some(req.status);
    Ok(Json(json!({
        "message": "User status updated",
        "user": UserResponse::from(&user),
    })))
}

/// Per-portfolio projection served by `GET /api/admin/transactions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortfolioTransactions {
    #[serde(rename = "_id")]
    id: Option<ObjectId>,
    user_id: ObjectId,
    #[serde(default)]
    transactions: Vec<TransactionRecord>,
}

async fn list_transactions(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let portfolios = state.db.collection::<PortfolioTransactions>("portfolios");
    let options = FindOptions::builder()
        .projection(doc! { "transactions": 1, "userId": 1 })
        .build();
    let mut cursor = portfolios.find(doc! {}, options).await?;

    let mut listed = Vec::new();
    while let Some(entry) = cursor.try_next().await? {
        listed.push(json!({
            "id": entry.id.map(|id| id.to_hex()).unwrap_or_default(),
            "userId": entry.user_id.to_hex(),
            "transactions": entry.transactions,
        }));
    }
    Ok(Json(listed))
}

async fn get_settings(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let admin_data = state.db.collection::<AdminDoc<PlatformSettings>>("admin_data");
    let settings = admin_data
        .find_one(doc! { "name": SETTINGS_DOC }, None)
        .await?
        .ok_or(AppError::NotFound("Settings not found"))?;
    Ok(Json(settings.data))
}

async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<PlatformSettings>,
) -> AppResult<impl IntoResponse> {
    let admin_data = state.db.collection::<AdminDoc<PlatformSettings>>("admin_data");
    let result = admin_data
        .update_one(
            doc! { "name": SETTINGS_DOC },
            doc! { "$set": { "data": to_bson(&settings).map_err(AppError::internal)? } },
            None,
        )
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound("Settings not found"));
    }
    Ok(Json(json!({ "message": "Settings updated successfully" })))
}

// --- Wallets ---

async fn list_wallets(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let admin_data = state.db.collection::<AdminDoc<Vec<Wallet>>>("admin_data");
    let wallets: Vec<WalletResponse> = admin_data
        .find_one(doc! { "name": WALLETS_DOC }, None)
        .await?
        .map(|doc| doc.data)
        .unwrap_or_default()
        .into_iter()
        .map(WalletResponse::from)
        .collect();
    Ok(Json(wallets))
}

#[derive(Deserialize)]
struct NewWalletRequest {
    name: String,
    address: String,
    #[serde(default)]
    currency: Option<String>,
}

async fn add_wallet(
    State(state): State<AppState>,
    Json(req): Json<NewWalletRequest>,
) -> AppResult<impl IntoResponse> {
    let wallet = Wallet::new(
        req.name,
        req.address,
        req.currency.unwrap_or_else(|| "BTC".to_string()),
    );

    let admin_data = state.db.collection::<AdminDoc<Vec<Wallet>>>("admin_data");
    let result = admin_data
        .update_one(
            doc! { "name": WALLETS_DOC },
            doc! { "$push": { "data": to_bson(&wallet).map_err(AppError::internal)? } },
            None,
        )
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::internal("wallets document missing"));
    }
    Ok(Json(json!({
        "message": "Wallet added successfully",
        "wallet": WalletResponse::from(wallet),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletUpdate {
    name: Option<String>,
    address: Option<String>,
    balance: Option<f64>,
    is_active: Option<bool>,
}

fn wallet_update_doc(update: &WalletUpdate) -> Document {
    let mut set = Document::new();
    if let Some(name) = &update.name {
        set.insert("data.$.name", name);
    }
    if let Some(address) = &update.address {
        set.insert("data.$.address", address);
    }
    if let Some(balance) = update.balance {
        set.insert("data.$.balance", balance);
        set.insert("data.$.lastUpdated", now_iso());
    }
    if let Some(is_active) = update.is_active {
        set.insert("data.$.isActive", is_active);
    }
    set
}

async fn update_wallet(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<WalletUpdate>,
) -> AppResult<impl IntoResponse> {
    let wallet_id = ObjectId::parse_str(&id).map_err(|_| AppError::BadRequest("Invalid wallet ID"))?;

    let set = wallet_update_doc(&req);
    if set.is_empty() {
        return Err(AppError::BadRequest("No fields to update"));
    }

    let admin_data = state.db.collection::<AdminDoc<Vec<Wallet>>>("admin_data");
    let result = admin_data
        .update_one(
            doc! { "name": WALLETS_DOC, "data.id": wallet_id },
            doc! { "$set": set },
            None,
        )
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound("Wallet not found"));
    }

    let wallet = admin_data
        .find_one(doc! { "name": WALLETS_DOC }, None)
        .await?
        .and_then(|doc| doc.data.into_iter().find(|w| w.id == wallet_id))
        .ok_or(AppError::NotFound("Wallet not found"))?;
    Ok(Json(json!({
        "message": "Wallet updated successfully",
        "wallet": WalletResponse::from(wallet),
    })))
}

async fn delete_wallet(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let wallet_id = ObjectId::parse_str(&id).map_err(|_| AppError::BadRequest("Invalid wallet ID"))?;

    let admin_data = state.db.collection::<AdminDoc<Vec<Wallet>>>("admin_data");
    let result = admin_data
        .update_one(
            doc! { "name": WALLETS_DOC },
            doc! { "$pull": { "data": { "id": wallet_id } } },
            None,
        )
        .await?;
    if result.modified_count == 0 {
        return Err(AppError::NotFound("Wallet not found"));
    }
    Ok(Json(json!({ "message": "Wallet deleted successfully" })))
}

// --- Investment plans ---

async fn list_plans(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let admin_data = state.db.collection::<AdminDoc<Vec<InvestmentPlan>>>("admin_data");
    let plans: Vec<PlanResponse> = admin_data
        .find_one(doc! { "name": PLANS_DOC }, None)
        .await?
        .map(|doc| doc.data)
        .unwrap_or_default()
        .into_iter()
        .map(PlanResponse::from)
        .collect();
    Ok(Json(plans))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewPlanRequest {
    name: String,
    min_amount: f64,
    max_amount: f64,
    profit_percentage: f64,
    profit_type: String,
    duration: i64,
    description: String,
}

async fn add_plan(
    State(state): State<AppState>,
    Json(req): Json<NewPlanRequest>,
) -> AppResult<impl IntoResponse> {
    if req.min_amount > req.max_amount {
        return Err(AppError::BadRequest("Plan limits are inverted"));
    }
    let plan = InvestmentPlan {
        id: ObjectId::new(),
        name: req.name,
        min_amount: req.min_amount,
        max_amount: req.max_amount,
        profit_percentage: req.profit_percentage,
        profit_type: req.profit_type,
        duration: req.duration,
        description: req.description,
        is_active: true,
    };

    let admin_data = state.db.collection::<AdminDoc<Vec<InvestmentPlan>>>("admin_data");
    let result = admin_data
        .update_one(
            doc! { "name": PLANS_DOC },
            doc! { "$push": { "data": to_bson(&plan).map_err(AppError::internal)? } },
            None,
        )
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::internal("plans document missing"));
    }
    Ok(Json(json!({
        "message": "Plan added successfully",
        "plan": PlanResponse::from(plan),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanUpdate {
    name: Option<String>,
    min_amount: Option<f64>,
    max_amount: Option<f64>,
    profit_percentage: Option<f64>,
    profit_type: Option<String>,
    duration: Option<i64>,
    description: Option<String>,
    is_active: Option<bool>,
}

fn plan_update_doc(update: &PlanUpdate) -> Document {
    let mut set = Document::new();
    if let Some(name) = &update.name {
        set.insert("data.$.name", name);
    }
    if let Some(min_amount) = update.min_amount {
        set.insert("data.$.minAmount", min_amount);
    }
    if let Some(max_amount) = update.max_amount {
        set.insert("data.$.maxAmount", max_amount);
    }
    if let Some(profit_percentage) = update.profit_percentage {
        set.insert("data.$.profitPercentage", profit_percentage);
    }
    if let Some(profit_type) = &update.profit_type {
        set.insert("data.$.profitType", profit_type);
    }
    if let Some(duration) = update.duration {
        set.insert("data.$.duration", duration);
    }
    if let Some(description) = &update.description {
        set.insert("data.$.description", description);
    }
    if let Some(is_active) = update.is_active {
        set.insert("data.$.isActive", is_active);
    }
    set
}

async fn update_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PlanUpdate>,
) -> AppResult<impl IntoResponse> {
    let plan_id = ObjectId::parse_str(&id).map_err(|_| AppError::BadRequest("Invalid plan ID"))?;

    let set = plan_update_doc(&req);
    if set.is_empty() {
        return Err(AppError::BadRequest("No fields to update"));
    }

    let admin_data = state.db.collection::<AdminDoc<Vec<InvestmentPlan>>>("admin_data");
    let result = admin_data
        .update_one(
            doc! { "name": PLANS_DOC, "data.id": plan_id },
            doc! { "$set": set },
            None,
        )
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound("Plan not found"));
    }

    let plan = admin_data
        .find_one(doc! { "name": PLANS_DOC }, None)
        .await?
        .and_then(|doc| doc.data.into_iter().find(|p| p.id == plan_id))
        .ok_or(AppError::NotFound("Plan not found"))?;
    Ok(Json(json!({
        "message": "Plan updated successfully",
        "plan": PlanResponse::from(plan),
    })))
}

async fn delete_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let plan_id = ObjectId::parse_str(&id).map_err(|_| AppError::BadRequest("Invalid plan ID"))?;

    let admin_data = state.db.collection::<AdminDoc<Vec<InvestmentPlan>>>("admin_data");
    let result = admin_data
        .update_one(
            doc! { "name": PLANS_DOC },
            doc! { "$pull": { "data": { "id": plan_id } } },
            None,
        )
        .await?;
    if result.modified_count == 0 {
        return Err(AppError::NotFound("Plan not found"));
    }
    Ok(Json(json!({ "message": "Plan deleted successfully" })))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/metrics", get(get_metrics))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id/status", put(update_user_status))
        .route("/admin/transactions", get(list_transactions))
        .route("/admin/settings", get(get_settings).put(update_settings))
        .route("/admin/wallets", get(list_wallets).post(add_wallet))
        .route("/admin/wallets/:id", put(update_wallet).delete(delete_wallet))
        .route("/admin/plans", get(list_plans).post(add_plan))
        .route("/admin/plans/:id", put(update_plan).delete(delete_plan))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_update_touches_only_provided_fields() {
        let update = WalletUpdate {
            name: Some("Cold Storage".to_string()),
            address: None,
            balance: None,
            is_active: Some(false),
        };
        let set = wallet_update_doc(&update);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get_str("data.$.name").unwrap(), "Cold Storage");
        assert!(!set.get_bool("data.$.isActive").unwrap());
        assert!(set.get("data.$.balance").is_none());
        assert!(set.get("data.$.lastUpdated").is_none());
    }

    #[test]
    fn balance_changes_refresh_last_updated() {
        let update = WalletUpdate {
            name: None,
            address: None,
            balance: Some(1234.5),
            is_active: None,
        };
        let set = wallet_update_doc(&update);
        assert_eq!(set.get_f64("data.$.balance").unwrap(), 1234.5);
        assert!(set.get_str("data.$.lastUpdated").is_ok());
    }

    #[test]
    fn empty_plan_update_builds_an_empty_document() {
        let update = PlanUpdate {
            name: None,
            min_amount: None,
            max_amount: None,
            profit_percentage: None,
            profit_type: None,
            duration: None,
            description: None,
            is_active: None,
        };
        assert!(plan_update_doc(&update).is_empty());
    }

    #[test]
    fn plan_update_uses_wire_field_names() {
        let update = PlanUpdate {
            name: None,
            min_amount: Some(100.0),
            max_amount: Some(500.0),
            profit_percentage: None,
            profit_type: None,
            duration: Some(30),
            description: None,
            is_active: Some(true),
        };
        let set = plan_update_doc(&update);
        assert!(set.get("data.$.minAmount").is_some());
        assert!(set.get("data.$.maxAmount").is_some());
        assert!(set.get("data.$.duration").is_some());
        assert!(set.get("data.$.isActive").is_some());
    }
}
