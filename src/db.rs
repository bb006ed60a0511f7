use anyhow::Result;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{options::ClientOptions, Client, Collection, Database};
use tracing::info;

use crate::config::Config;
use crate::models::admin_data::{
    now_iso, AdminDoc, InvestmentPlan, PlatformMetrics, PlatformSettings, Wallet, METRICS_DOC,
    PLANS_DOC, SETTINGS_DOC, WALLETS_DOC,
};
use crate::models::user::{User, ROLE_ADMIN};
use crate::routes::auth::hash_password;

pub async fn connect_to_mongo(config: &Config) -> Result<Database> {
    let client_options = ClientOptions::parse(&config.mongodb_uri).await?;
    let client = Client::with_options(client_options)?;

    let db = client.database(&config.database_name);

    // Test the connection
    db.run_command(doc! { "ping": 1 }, None).await?;

    Ok(db)
}

/// Idempotent startup seeding: a default admin account plus the tagged
/// `admin_data` documents every endpoint expects to exist.
pub async fn seed_database(db: &Database) -> Result<()> {
    let users: Collection<User> = db.collection("users");
    if users
        .find_one(doc! { "email": "admin@example.com" }, None)
        .await?
        .is_none()
    {
        info!("Admin user not found, creating one");
        let admin = User {
            id: None,
            email: "admin@example.com".to_string(),
            password: hash_password("admin")?,
            role: ROLE_ADMIN.to_string(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            phone: None,
            date_of_birth: None,
            is_verified: true,
            two_fa_enabled: true,
            failed_login_attempts: 0,
            lock_until: None,
            google_id: None,
            status: None,
        };
        users.insert_one(admin, None).await?;
    }

    let admin_data = db.collection::<AdminDoc<PlatformMetrics>>("admin_data");
    if admin_data
        .find_one(doc! { "name": METRICS_DOC }, None)
        .await?
        .is_none()
    {
        admin_data
            .insert_one(AdminDoc::new(METRICS_DOC, PlatformMetrics::default()), None)
            .await?;
    }

    let wallets = db.collection::<AdminDoc<Vec<Wallet>>>("admin_data");
    if wallets
        .find_one(doc! { "name": WALLETS_DOC }, None)
        .await?
        .is_none()
    {
        let default_wallet = Wallet {
            id: ObjectId::new(),
            name: "Main Payment Wallet".to_string(),
            address: "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2".to_string(),
            balance: 50000.0,
            currency: "BTC".to_string(),
            is_active: true,
            last_updated: now_iso(),
        };
        wallets
            .insert_one(AdminDoc::new(WALLETS_DOC, vec![default_wallet]), None)
            .await?;
    }

    let plans = db.collection::<AdminDoc<Vec<InvestmentPlan>>>("admin_data");
    if plans
        .find_one(doc! { "name": PLANS_DOC }, None)
        .await?
        .is_none()
    {
        plans
            .insert_one(AdminDoc::new(PLANS_DOC, default_plans()), None)
            .await?;
    }

    let settings = db.collection::<AdminDoc<PlatformSettings>>("admin_data");
    if settings
        .find_one(doc! { "name": SETTINGS_DOC }, None)
        .await?
        .is_none()
    {
        settings
            .insert_one(AdminDoc::new(SETTINGS_DOC, PlatformSettings::default()), None)
            .await?;
    }

    info!("Database seeding completed");
    Ok(())
}

fn default_plans() -> Vec<InvestmentPlan> {
    vec![
        InvestmentPlan {
            id: ObjectId::new(),
            name: "Bronze Plan".to_string(),
            min_amount: 50.0,
            max_amount: 4999.0,
            profit_percentage: 10.0,
            profit_type: "daily".to_string(),
            duration: 7,
            description: "Perfect for beginners starting their investment journey".to_string(),
            is_active: true,
        },
        InvestmentPlan {
            id: ObjectId::new(),
            name: "Silver Plan".to_string(),
            min_amount: 5000.0,
            max_amount: 9999.0,
            profit_percentage: 15.0,
            profit_type: "daily".to_string(),
            duration: 15,
            description: "Great returns for intermediate investors".to_string(),
            is_active: true,
        },
        InvestmentPlan {
            id: ObjectId::new(),
            name: "Gold Plan".to_string(),
            min_amount: 10000.0,
            max_amount: 14999.0,
            profit_percentage: 20.0,
            profit_type: "daily".to_string(),
            duration: 21,
            description: "Premium plan with excellent daily returns".to_string(),
            is_active: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_tiers_do_not_overlap() {
        let plans = default_plans();
        assert_eq!(plans.len(), 3);
        for pair in plans.windows(2) {
            assert!(pair[0].max_amount < pair[1].min_amount);
        }
        assert!(plans.iter().all(|p| p.is_active));
    }
}
