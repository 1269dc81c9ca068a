use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ReferralConfig {
    /// Reject a registration whose mobile number is already on file.
    pub unique_mobile_number: bool,
    /// Insert attempts before giving up on a colliding referral code.
    pub code_max_attempts: u32,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            unique_mobile_number: false,
            code_max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub referral: ReferralConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let defaults = ReferralConfig::default();
        let referral = ReferralConfig {
            unique_mobile_number: std::env::var("UNIQUE_MOBILE_NUMBER")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.unique_mobile_number),
            code_max_attempts: std::env::var("REFERRAL_CODE_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.code_max_attempts),
        };
        Ok(Self {
            database_url,
            max_connections,
            referral,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
