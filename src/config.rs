use crate::error::{Error, Result};
use crate::services::unlock_service::VideoCompletionPolicy;
use chrono::Duration;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub catalog_path: Option<String>,
    pub jwt_secret: String,
    pub unlock_timer_seconds: i64,
    pub timer_sweep_interval_seconds: u64,
    pub video_completion_policy: VideoCompletionPolicy,
    pub enforce_video_before_assessment: bool,
    pub notification_webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub json_logs: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let store_backend: StoreBackend = get_env_parse_or("STORE_BACKEND", StoreBackend::Postgres)?;
        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(Error::Config(
                "Missing environment variable: DATABASE_URL".to_string(),
            ));
        }

        let unlock_timer_seconds =
            check_unlock_timer_seconds(get_env_parse_or("UNLOCK_TIMER_SECONDS", 24 * 60 * 60)?)?;

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            store_backend,
            database_url,
            catalog_path: env::var("CATALOG_PATH").ok(),
            jwt_secret: get_env("JWT_SECRET")?,
            unlock_timer_seconds,
            timer_sweep_interval_seconds: get_env_parse_or("TIMER_SWEEP_INTERVAL_SECONDS", 60)?,
            video_completion_policy: get_env_parse_or(
                "VIDEO_COMPLETION_POLICY",
                VideoCompletionPolicy::Any,
            )?,
            enforce_video_before_assessment: get_env_parse_or(
                "ENFORCE_VIDEO_BEFORE_ASSESSMENT",
                true,
            )?,
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL").ok(),
            webhook_secret: env::var("WEBHOOK_SECRET").ok(),
            json_logs: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

    pub fn unlock_timer_duration(&self) -> Duration {
        Duration::seconds(self.unlock_timer_seconds)
    }
}

/// Ten years.
const MAX_UNLOCK_TIMER_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

fn check_unlock_timer_seconds(seconds: i64) -> Result<i64> {
    if seconds <= 0 || seconds > MAX_UNLOCK_TIMER_SECONDS {
        return Err(Error::Config(format!(
            "UNLOCK_TIMER_SECONDS must be between 1 and {}",
            MAX_UNLOCK_TIMER_SECONDS
        )));
    }
    Ok(seconds)
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
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
