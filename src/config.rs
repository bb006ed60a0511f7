use std::env;

use tracing::info;

/// Runtime configuration, loaded once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub mongodb_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    /// Origin of the SPA, used for CORS and OAuth redirects.
    pub frontend_origin: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub oauth_callback_url: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: load_or("PORT", "3000"),
            mongodb_uri: load_or("MONGODB_URI", "mongodb://localhost:27017"),
            database_name: load_or("MONGODB_DATABASE", "invest_app"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            frontend_origin: load_or("FRONTEND_ORIGIN", "http://localhost:5173"),
            google_client_id: load_or("GOOGLE_CLIENT_ID", ""),
            google_client_secret: load_or("GOOGLE_CLIENT_SECRET", ""),
            oauth_callback_url: load_or(
                "OAUTH_CALLBACK_URL",
                "http://localhost:3000/auth/google/callback",
            ),
        }
    }
}

fn load_or<T: std::str::FromStr>(key: &str, default: &str) -> T
where
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default:?}");
        default.to_string()
    });
    match raw.parse() {
        Ok(value) => value,
        Err(e) => panic!("invalid {key} value {raw:?}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_or_falls_back_to_default() {
        env::remove_var("TEST_PORT_UNSET");
        let port: u16 = load_or("TEST_PORT_UNSET", "3000");
        assert_eq!(port, 3000);
    }

    #[test]
    fn load_or_reads_the_environment() {
        env::set_var("TEST_PORT_SET", "8080");
        let port: u16 = load_or("TEST_PORT_SET", "3000");
        assert_eq!(port, 8080);
        env::remove_var("TEST_PORT_SET");
    }
}
