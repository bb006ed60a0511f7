pub mod admin_data;
pub mod portfolio;
pub mod user;

pub use admin_data::{AdminDoc, InvestmentPlan, PlatformMetrics, PlatformSettings, Wallet};
pub use portfolio::{Portfolio, PortfolioResponse, TransactionRecord};
pub use user::{User, UserResponse};
