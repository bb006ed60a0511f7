use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId, to_bson};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::Collection;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::error::{AppError, AppResult};
use crate::middlewares::auth::CurrentUser;
use crate::models::admin_data::{
    now_iso, AdminDoc, InvestmentPlan, PlanResponse, Wallet, PLANS_DOC, WALLETS_DOC,
};
use crate::models::portfolio::{Portfolio, PortfolioResponse, TransactionRecord};
use crate::AppState;

fn validate_amount(amount: f64) -> AppResult<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::BadRequest("Invalid amount"));
    }
    Ok(())
}

async fn get_portfolio(State(state): State<AppState>, user: CurrentUser) -> AppResult<impl IntoResponse> {
    let portfolios: Collection<Portfolio> = state.db.collection("portfolios");
    let portfolio = portfolios
        .find_one(doc! { "userId": user.id }, None)
        .await?
        .ok_or(AppError::NotFound("Portfolio not found"))?;
    Ok(Json(PortfolioResponse::from(portfolio)))
}

async fn get_transactions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let portfolios: Collection<Portfolio> = state.db.collection("portfolios");
    let transactions = portfolios
        .find_one(doc! { "userId": user.id }, None)
        .await?
        .map(|p| p.transactions)
        .unwrap_or_default();
    Ok(Json(transactions))
}

async fn get_plans(State(state): State<AppState>, _user: CurrentUser) -> AppResult<impl IntoResponse> {
    let admin_data = state.db.collection::<AdminDoc<Vec<InvestmentPlan>>>("admin_data");
    let plans = admin_data
        .find_one(doc! { "name": PLANS_DOC }, None)
        .await?
        .map(|doc| doc.data)
        .unwrap_or_default();
    let active: Vec<PlanResponse> = plans
        .into_iter()
        .filter(|p| p.is_active)
        .map(PlanResponse::from)
        .collect();
    Ok(Json(active))
}

#[derive(Deserialize)]
struct AmountRequest {
    amount: f64,
}

async fn deposit(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AmountRequest>,
) -> AppResult<impl IntoResponse> {
    validate_amount(req.amount)?;

    let portfolios: Collection<Portfolio> = state.db.collection("portfolios");
    let portfolio = portfolios
        .find_one(doc! { "userId": user.id }, None)
        .await?
        .ok_or(AppError::NotFound("Portfolio not found"))?;

    let record = TransactionRecord::new(
        portfolio.transactions.len() as i64 + 1,
        "Deposit",
        "USD",
        req.amount,
    );
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = portfolios
        .find_one_and_update(
            doc! { "userId": user.id },
            doc! {
                "$inc": { "availableCash": req.amount, "totalValue": req.amount },
                "$push": { "transactions": to_bson(&record).map_err(AppError::internal)? },
            },
            options,
        )
        .await?
        .ok_or(AppError::NotFound("Portfolio not found"))?;

    Ok(Json(json!({
        "message": "Deposit successful",
        "portfolio": PortfolioResponse::from(updated),
    })))
}

async fn withdraw(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AmountRequest>,
) -> AppResult<impl IntoResponse> {
    validate_amount(req.amount)?;

    let portfolios: Collection<Portfolio> = state.db.collection("portfolios");
    let portfolio = portfolios
        .find_one(doc! { "userId": user.id }, None)
        .await?
        .ok_or(AppError::NotFound("Portfolio not found"))?;

    let record = TransactionRecord::new(
        portfolio.transactions.len() as i64 + 1,
        "Withdraw",
        "USD",
        -req.amount,
    );
    // The balance check lives in the filter so concurrent withdrawals
    // cannot overdraw.
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = portfolios
        .find_one_and_update(
            doc! { "userId": user.id, "availableCash": { "$gte": req.amount } },
            doc! {
                "$inc": { "availableCash": -req.amount, "totalValue": -req.amount },
                "$push": { "transactions": to_bson(&record).map_err(AppError::internal)? },
            },
            options,
        )
        .await?
        .ok_or(AppError::BadRequest("Insufficient funds"))?;

    Ok(Json(json!({
        "message": "Withdrawal successful",
        "portfolio": PortfolioResponse::from(updated),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvestRequest {
    plan_id: String,
    amount: f64,
    wallet_id: String,
}

async fn invest(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<InvestRequest>,
) -> AppResult<impl IntoResponse> {
    validate_amount(req.amount)?;
    let plan_id =
        ObjectId::parse_str(&req.plan_id).map_err(|_| AppError::BadRequest("Invalid plan ID"))?;
    let wallet_id = ObjectId::parse_str(&req.wallet_id)
        .map_err(|_| AppError::BadRequest("Invalid wallet ID"))?;

    let plans = state.db.collection::<AdminDoc<Vec<InvestmentPlan>>>("admin_data");
    let plan = plans
        .find_one(doc! { "name": PLANS_DOC }, None)
        .await?
        .and_then(|doc| doc.data.into_iter().find(|p| p.id == plan_id))
        .ok_or(AppError::NotFound("Plan not found"))?;

    let wallets = state.db.collection::<AdminDoc<Vec<Wallet>>>("admin_data");
    let wallet = wallets
        .find_one(doc! { "name": WALLETS_DOC }, None)
        .await?
        .and_then(|doc| doc.data.into_iter().find(|w| w.id == wallet_id && w.is_active))
        .ok_or(AppError::NotFound("Wallet not found or inactive"))?;

    if !plan.accepts(req.amount) {
        return Err(AppError::BadRequest("Investment amount is outside plan limits"));
    }
    if wallet.balance < req.amount {
        return Err(AppError::BadRequest("Insufficient wallet balance"));
    }

    // Debit and balance check land in one guarded update; two concurrent
    // purchases cannot both drain the wallet.
    let debit = wallets
        .update_one(
            doc! {
                "name": WALLETS_DOC,
                "data": { "$elemMatch": {
                    "id": wallet_id,
                    "isActive": true,
                    "balance": { "$gte": req.amount },
                }},
            },
            doc! {
                "$inc": { "data.$.balance": -req.amount },
                "$set": { "data.$.lastUpdated": now_iso() },
            },
            None,
        )
        .await?;
    if debit.modified_count == 0 {
        return Err(AppError::BadRequest("Insufficient wallet balance"));
    }

    // The portfolio credit is compensated: if it cannot land, the wallet
    // debit is rolled back before the error surfaces.
    if let Err(e) = credit_portfolio(&state, &user, &plan, req.amount).await {
        refund_wallet(&state, wallet_id, req.amount).await;
        return Err(e);
    }

    let start = Utc::now();
    let end = start + chrono::Duration::days(plan.duration);
    Ok(Json(json!({
        "message": "Investment successful",
        "investment": {
            "id": start.timestamp_millis(),
            "userId": user.id.to_hex(),
            "planId": plan_id.to_hex(),
            "amount": req.amount,
            "walletId": wallet_id.to_hex(),
            "startDate": start.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "endDate": end.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "status": "active",
            "profitPercentage": plan.profit_percentage,
            "profitType": plan.profit_type,
        },
        "remainingBalance": wallet.balance - req.amount,
    })))
}

async fn credit_portfolio(
    state: &AppState,
    user: &CurrentUser,
    plan: &InvestmentPlan,
    amount: f64,
) -> AppResult<()> {
    let portfolios: Collection<Portfolio> = state.db.collection("portfolios");
    let portfolio = portfolios
        .find_one(doc! { "userId": user.id }, None)
        .await?
        .ok_or(AppError::NotFound("Portfolio not found"))?;

    let record = TransactionRecord::new(
        portfolio.transactions.len() as i64 + 1,
        "Investment",
        &plan.name,
        amount,
    );
    portfolios
        .update_one(
            doc! { "userId": user.id },
            doc! {
                "$inc": { "investedAmount": amount, "totalValue": amount },
                "$push": { "transactions": to_bson(&record).map_err(AppError::internal)? },
            },
            None,
        )
        .await?;
    Ok(())
}

async fn refund_wallet(state: &AppState, wallet_id: ObjectId, amount: f64) {
    let wallets = state.db.collection::<AdminDoc<Vec<Wallet>>>("admin_data");
    let result = wallets
        .update_one(
            doc! { "name": WALLETS_DOC, "data.id": wallet_id },
            doc! {
                "$inc": { "data.$.balance": amount },
                "$set": { "data.$.lastUpdated": now_iso() },
            },
            None,
        )
        .await;
    if let Err(e) = result {
        error!("failed to refund wallet {wallet_id} after aborted investment: {e}");
    }
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/portfolio", get(get_portfolio))
        .route("/user/transactions", get(get_transactions))
        .route("/user/plans", get(get_plans))
        .route("/user/deposit", post(deposit))
        .route("/user/withdraw", post(withdraw))
        .route("/user/invest", post(invest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_must_be_positive_and_finite() {
        assert!(validate_amount(100.0).is_ok());
        assert!(validate_amount(0.01).is_ok());
        assert!(validate_amount(0.0).is_err());
        assert!(validate_amount(-5.0).is_err());
        assert!(validate_amount(f64::NAN).is_err());
        assert!(validate_amount(f64::INFINITY).is_err());
    }
}
