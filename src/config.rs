use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    /// HS256 signing secret for bearer tokens.
    pub jwt_secret: String,
    /// Issued-token lifetime in seconds. Default: 24h.
    pub jwt_ttl_secs: u64,
    /// Comma-separated webhook URLs notified on every new notification.
    pub webhook_urls: Vec<String>,
    /// Shared secret for webhook HMAC signatures, if set.
    pub webhook_secret: Option<String>,
    /// Failed login attempts allowed per email per window. Successful
    /// logins never count and clear the counter.
    pub login_rate_limit: u64,
    /// Window in seconds for the login rate limit.
    pub login_rate_limit_window: u64,
    /// Read notifications older than this many days are purged.
    pub retention_days: u32,
}

const PLACEHOLDER_SECRET: &str = "CHANGE_ME_JWT_SECRET";

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let jwt_secret =
        std::env::var("GIGBOARD_JWT_SECRET").unwrap_or_else(|_| PLACEHOLDER_SECRET.into());

    if jwt_secret == PLACEHOLDER_SECRET {
        let env_mode = std::env::var("GIGBOARD_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "GIGBOARD_JWT_SECRET is still the insecure placeholder. \
                 Set a proper secret before running in production."
            );
        }
        eprintln!("⚠️  GIGBOARD_JWT_SECRET is not set — using insecure placeholder. Set a real secret for production.");
    }

    Ok(Config {
        port: std::env::var("GIGBOARD_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/gigboard".into()),
        redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
        jwt_secret,
        jwt_ttl_secs: std::env::var("GIGBOARD_JWT_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400),
        webhook_urls: std::env::var("GIGBOARD_WEBHOOK_URLS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        webhook_secret: std::env::var("GIGBOARD_WEBHOOK_SECRET").ok(),
        login_rate_limit: std::env::var("GIGBOARD_LOGIN_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10),
        login_rate_limit_window: std::env::var("GIGBOARD_LOGIN_RATE_WINDOW")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300),
        retention_days: std::env::var("GIGBOARD_RETENTION_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(90),
    })
}
