use chrono::{SecondsFormat, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

// Discriminator values for the `admin_data` collection.
pub const METRICS_DOC: &str = "platformMetrics";
pub const WALLETS_DOC: &str = "wallets";
pub const PLANS_DOC: &str = "investmentPlans";
pub const SETTINGS_DOC: &str = "platformSettings";

/// One tagged document in `admin_data`: a `name` discriminator and a
/// payload whose shape depends on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminDoc<T> {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub data: T,
}

impl<T> AdminDoc<T> {
    pub fn new(name: &str, data: T) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: ObjectId,
    pub name: String,
    pub address: String,
    pub balance: f64,
    pub currency: String,
    pub is_active: bool,
    pub last_updated: String,
}

impl Wallet {
    pub fn new(name: String, address: String, currency: String) -> Self {
        Self {
            id: ObjectId::new(),
            name,
            address,
            balance: 0.0,
            currency,
            is_active: true,
            last_updated: now_iso(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub id: String,
    pub name: String,
    pub address: String,
    pub balance: f64,
    pub currency: String,
    pub is_active: bool,
    pub last_updated: String,
}

impl From<Wallet> for WalletResponse {
    fn from(w: Wallet) -> Self {
        Self {
            id: w.id.to_hex(),
            name: w.name,
            address: w.address,
            balance: w.balance,
            currency: w.currency,
            is_active: w.is_active,
            last_updated: w.last_updated,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentPlan {
    pub id: ObjectId,
    pub name: String,
    pub min_amount: f64,
    pub max_amount: f64,
    pub profit_percentage: f64,
    /// Payout cadence, e.g. "daily".
    pub profit_type: String,
    /// Plan length in days.
    pub duration: i64,
    pub description: String,
    pub is_active: bool,
}

impl InvestmentPlan {
    pub fn accepts(&self, amount: f64) -> bool {
        amount >= self.min_amount && amount <= self.max_amount
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub id: String,
    pub name: String,
    pub min_amount: f64,
    pub max_amount: f64,
    pub profit_percentage: f64,
    pub profit_type: String,
    pub duration: i64,
    pub description: String,
    pub is_active: bool,
}

impl From<InvestmentPlan> for PlanResponse {
    fn from(p: InvestmentPlan) -> Self {
        Self {
            id: p.id.to_hex(),
            name: p.name,
            min_amount: p.min_amount,
            max_amount: p.max_amount,
            profit_percentage: p.profit_percentage,
            profit_type: p.profit_type,
            duration: p.duration,
            description: p.description,
            is_active: p.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformMetrics {
    pub total_users: i64,
    #[serde(rename = "activeUsers24h")]
    pub active_users_24h: i64,
    #[serde(rename = "totalAUM")]
    pub total_aum: f64,
    pub platform_revenue: f64,
    #[serde(rename = "totalPnL")]
    pub total_pnl: f64,
}

impl Default for PlatformMetrics {
    fn default() -> Self {
        Self {
            total_users: 0,
            active_users_24h: 0,
            total_aum: 0.0,
            platform_revenue: 0.0,
            total_pnl: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSettings {
    pub trading_fees: f64,
    pub market_hours: MarketHours,
    pub min_deposit: f64,
    pub max_withdrawal: f64,
    #[serde(rename = "twoFAEnforced")]
    pub two_fa_enforced: bool,
    pub maintenance_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketHours {
    pub open: String,
    pub close: String,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            trading_fees: 0.25,
            market_hours: MarketHours {
                open: "09:30".to_string(),
                close: "16:00".to_string(),
            },
            min_deposit: 100.0,
            max_withdrawal: 50000.0,
            two_fa_enforced: true,
            maintenance_mode: false,
        }
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bronze() -> InvestmentPlan {
        InvestmentPlan {
            id: ObjectId::new(),
            name: "Bronze Plan".to_string(),
            min_amount: 50.0,
            max_amount: 4999.0,
            profit_percentage: 10.0,
            profit_type: "daily".to_string(),
            duration: 7,
            description: String::new(),
            is_active: true,
        }
    }

    #[test]
    fn plan_limits_are_inclusive() {
        let plan = bronze();
        assert!(plan.accepts(50.0));
        assert!(plan.accepts(4999.0));
        assert!(plan.accepts(1000.0));
        assert!(!plan.accepts(49.99));
        assert!(!plan.accepts(5000.0));
    }

    #[test]
    fn metrics_serialize_with_legacy_names() {
        let json = serde_json::to_value(PlatformMetrics::default()).unwrap();
        assert!(json.get("activeUsers24h").is_some());
        assert!(json.get("totalAUM").is_some());
        assert!(json.get("totalPnL").is_some());
    }

    #[test]
    fn plan_response_id_is_a_plain_hex_string() {
        let plan = bronze();
        let expected = plan.id.to_hex();
        let json = serde_json::to_value(PlanResponse::from(plan)).unwrap();
        assert_eq!(json["id"], serde_json::Value::String(expected));
        assert!(json.get("minAmount").is_some());
    }

    #[test]
    fn new_wallet_starts_empty_and_active() {
        let wallet = Wallet::new(
            "Main".to_string(),
            "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2".to_string(),
            "BTC".to_string(),
        );
        assert_eq!(wallet.balance, 0.0);
        assert!(wallet.is_active);
    }
}
