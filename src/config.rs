//! Service configuration, read once at startup and injected everywhere.

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    /// Access token lifetime in seconds
    pub jwt_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub jwt_refresh_ttl_secs: i64,
    pub bcrypt_cost: u32,
    pub frontend_url: String,
    pub backend_url: String,
    pub gateway: Option<GatewayConfig>,
    pub smtp: Option<SmtpConfig>,
}

/// Payment gateway credentials and endpoints
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_url: String,
    pub service_key: String,
    pub service_secret: String,
    pub return_url: String,
    pub notify_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3006".to_string())
            .parse()
            .context("invalid PORT")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET not set")?;
        let jwt_refresh_secret =
            std::env::var("JWT_REFRESH_SECRET").context("JWT_REFRESH_SECRET not set")?;
        let jwt_ttl_secs = env_i64("JWT_TTL_SECS", 7 * 24 * 3600)?;
        let jwt_refresh_ttl_secs = env_i64("JWT_REFRESH_TTL_SECS", 30 * 24 * 3600)?;
        let bcrypt_cost = std::env::var("BCRYPT_ROUNDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(12);
        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let backend_url =
            std::env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:3006".to_string());

        let gateway = match (
            std::env::var("GATEWAY_SERVICE_KEY").ok(),
            std::env::var("GATEWAY_SERVICE_SECRET").ok(),
        ) {
            (Some(service_key), Some(service_secret)) => Some(GatewayConfig {
                api_url: std::env::var("GATEWAY_API_URL")
                    .unwrap_or_else(|_| "https://api.monetbil.com/v1/payment".to_string()),
                service_key,
                service_secret,
                return_url: std::env::var("GATEWAY_RETURN_URL")
                    .unwrap_or_else(|_| format!("{frontend_url}/payment/return")),
                notify_url: std::env::var("GATEWAY_NOTIFY_URL")
                    .unwrap_or_else(|_| format!("{backend_url}/api/payments/webhook")),
                cancel_url: format!("{frontend_url}/payment/cancel"),
            }),
            _ => None,
        };

        let smtp = match (
            std::env::var("SMTP_HOST").ok(),
            std::env::var("SMTP_USERNAME").ok(),
            std::env::var("SMTP_PASSWORD").ok(),
            std::env::var("SMTP_FROM_EMAIL").ok(),
        ) {
            (Some(host), Some(username), Some(password), Some(from_address)) => Some(SmtpConfig {
                host,
                port: std::env::var("SMTP_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(587),
                username,
                password,
                from_address,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            port,
            jwt_secret,
            jwt_refresh_secret,
            jwt_ttl_secs,
            jwt_refresh_ttl_secs,
            bcrypt_cost,
            frontend_url,
            backend_url,
            gateway,
            smtp,
        })
    }
}

fn env_i64(key: &str, default: i64) -> anyhow::Result<i64> {
    match std::env::var(key) {
        Ok(v) => v.parse().with_context(|| format!("invalid {key}")),
        Err(_) => Ok(default),
    }
}
