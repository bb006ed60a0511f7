use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub total_value: f64,
    pub available_cash: f64,
    pub invested_amount: f64,
    pub holdings: Vec<Holding>,
    pub transactions: Vec<TransactionRecord>,
}

impl Portfolio {
    /// The zeroed portfolio every new account starts with.
    pub fn new(user_id: ObjectId) -> Self {
        Self {
            id: None,
            user_id,
            total_value: 0.0,
            available_cash: 0.0,
            invested_amount: 0.0,
            holdings: Vec::new(),
            transactions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub symbol: String,
    pub quantity: f64,
    pub value: f64,
}

/// JSON projection of a portfolio; ids become plain hex strings instead of
/// extended-JSON ObjectIds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioResponse {
    pub id: String,
    pub user_id: String,
    pub total_value: f64,
    pub available_cash: f64,
    pub invested_amount: f64,
    pub holdings: Vec<Holding>,
    pub transactions: Vec<TransactionRecord>,
}

impl From<Portfolio> for PortfolioResponse {
    fn from(p: Portfolio) -> Self {
        Self {
            id: p.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: p.user_id.to_hex(),
            total_value: p.total_value,
            available_cash: p.available_cash,
            invested_amount: p.invested_amount,
            holdings: p.holdings,
            transactions: p.transactions,
        }
    }
}

/// One ledger line in a portfolio's transaction history. `id` is the
/// 1-based position within the list, `date` is a `YYYY-MM-DD` stamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub asset: String,
    pub quantity: f64,
    pub price: f64,
    pub total: f64,
}

impl TransactionRecord {
    pub fn new(id: i64, kind: &str, asset: &str, amount: f64) -> Self {
        Self {
            id,
            date: Utc::now().format("%Y-%m-%d").to_string(),
            kind: kind.to_string(),
            asset: asset.to_string(),
            quantity: 1.0,
            price: amount,
            total: amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_portfolio_starts_zeroed() {
        let portfolio = Portfolio::new(ObjectId::new());
        assert_eq!(portfolio.total_value, 0.0);
        assert_eq!(portfolio.available_cash, 0.0);
        assert_eq!(portfolio.invested_amount, 0.0);
        assert!(portfolio.holdings.is_empty());
        assert!(portfolio.transactions.is_empty());
    }

    #[test]
    fn withdrawal_records_carry_negative_amounts() {
        let record = TransactionRecord::new(3, "Withdraw", "USD", -250.0);
        assert_eq!(record.id, 3);
        assert_eq!(record.kind, "Withdraw");
        assert_eq!(record.price, -250.0);
        assert_eq!(record.total, -250.0);
        assert_eq!(record.quantity, 1.0);
    }

    #[test]
    fn record_serializes_type_field() {
        let record = TransactionRecord::new(1, "Deposit", "USD", 100.0);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "Deposit");
        // YYYY-MM-DD
        assert_eq!(json["date"].as_str().unwrap().len(), 10);
    }

    #[test]
    fn response_ids_are_plain_hex_strings() {
        let mut portfolio = Portfolio::new(ObjectId::new());
        portfolio.id = Some(ObjectId::new());
        let json = serde_json::to_value(PortfolioResponse::from(portfolio)).unwrap();
        assert_eq!(json["id"].as_str().unwrap().len(), 24);
        assert_eq!(json["userId"].as_str().unwrap().len(), 24);
        assert!(json.get("availableCash").is_some());
    }
}
