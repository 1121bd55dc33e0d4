use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub client_origins: Vec<String>,
    pub frontend_url: String,
    pub paystack_secret_key: String,
    pub paystack_base_url: String,
    pub nin_verification_url: Option<String>,
    pub dl_verification_url: Option<String>,
    pub passport_verification_url: Option<String>,
    pub verification_api_key: Option<String>,
    pub license_review_interval_secs: i64,
    pub account_lockout_attempts: i32,
    pub account_lockout_duration_minutes: i64,
    pub public_rps: u32,
    pub auth_rps: u32,
    pub body_limit_bytes: usize,
    pub session_sweep_cron: String,
    pub log_format: String,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

const THIRTY_DAYS_SECS: i64 = 30 * 24 * 60 * 60;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            jwt_expiry_hours: get_env_parse_or("JWT_EXPIRY_HOURS", 168)?,
            client_origins: get_env_or("CLIENT_ORIGIN", "http://localhost:5173")
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            frontend_url: get_env_or("FRONTEND_URL", "http://localhost:3000"),
            paystack_secret_key: get_env_or("PAYSTACK_SECRET_KEY", ""),
            paystack_base_url: get_env_or("PAYSTACK_BASE_URL", "https://api.paystack.co"),
            nin_verification_url: get_optional("NIN_VERIFICATION_URL"),
            dl_verification_url: get_optional("DL_VERIFICATION_URL"),
            passport_verification_url: get_optional("PASSPORT_VERIFICATION_URL"),
            verification_api_key: get_optional("VERIFICATION_API_KEY"),
            license_review_interval_secs: get_env_parse_or(
                "LICENSE_REVIEW_INTERVAL_SECS",
                THIRTY_DAYS_SECS,
            )?,
            account_lockout_attempts: get_env_parse_or("ACCOUNT_LOCKOUT_ATTEMPTS", 5)?,
            account_lockout_duration_minutes: get_env_parse_or(
                "ACCOUNT_LOCKOUT_DURATION_MINUTES",
                30,
            )?,
            public_rps: get_env_parse_or("PUBLIC_RPS", 50)?,
            auth_rps: get_env_parse_or("AUTH_RPS", 10)?,
            body_limit_bytes: get_env_parse_or("BODY_LIMIT_BYTES", 8 * 1024 * 1024)?,
            session_sweep_cron: get_env_or("SESSION_SWEEP_CRON", "0 */5 * * * *"),
            log_format: get_env_or("LOG_FORMAT", "pretty"),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn get_env_or(name: &str, default: &str) -> String {
    get_optional(name).unwrap_or_else(|| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
