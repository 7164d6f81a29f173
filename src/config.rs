use serde::Deserialize;
use tracing::warn;

/// Development fallback only. Anything real must set JWT_SECRET.
const DEV_JWT_SECRET: &str = "daio-secret-key-change-in-production";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Window applied to both tiers, in seconds.
    pub window_seconds: u64,
    /// Requests per window for general API endpoints.
    pub api_max: u32,
    /// Requests per window for signup/login.
    pub auth_max: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_seconds: 15 * 60,
            api_max: 100,
            auth_max: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:daio.db?mode=rwc".into());

        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                warn!("JWT_SECRET not set; using the insecure development default");
                DEV_JWT_SECRET.into()
            }
        };
        let jwt = JwtConfig {
            secret,
            ttl_hours: std::env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            enabled: std::env::var("RATE_LIMIT_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.enabled),
            window_seconds: std::env::var("RATE_LIMIT_WINDOW_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.window_seconds),
            api_max: std::env::var("RATE_LIMIT_API_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.api_max),
            auth_max: std::env::var("RATE_LIMIT_AUTH_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.auth_max),
        };

        Ok(Self {
            database_url,
            jwt,
            rate_limit,
        })
    }
}
