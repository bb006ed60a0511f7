use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    /// Argon2 PHC string; empty for OAuth-provisioned accounts.
    #[serde(default)]
    pub password: String,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    pub is_verified: bool,
    #[serde(rename = "twoFAEnabled")]
    pub two_fa_enabled: bool,
    #[serde(default)]
    pub failed_login_attempts: i32,
    /// Epoch milliseconds; the account is locked while this lies in the future.
    #[serde(default)]
    pub lock_until: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// What the API returns in place of a full user document. Never carries
/// the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    #[serde(rename = "twoFAEnabled")]
    pub two_fa_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.clone(),
            two_fa_enabled: user.two_fa_enabled,
            status: user.status.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Some(ObjectId::new()),
            email: "jane@example.com".to_string(),
            password: "$argon2id$v=19$...".to_string(),
            role: ROLE_USER.to_string(),
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
    fn response_never_contains_the_password() {
        let user = sample_user();
        let response = UserResponse::from(&user);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "jane@example.com");
        assert_eq!(json["firstName"], "Jane");
        assert_eq!(json["twoFAEnabled"], false);
    }

    #[test]
    fn user_serializes_with_legacy_field_names() {
        let user = sample_user();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("isVerified").is_some());
        assert!(json.get("twoFAEnabled").is_some());
        assert!(json.get("failedLoginAttempts").is_some());
    }
}
