use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ai::RetryPolicy;
use crate::journal::{JournalConfig, Thumbnailer};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // AI service
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Serve canned analyses instead of calling the service.
    pub demo_mode: bool,

    // Retry
    pub retry_max_retries: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_multiplier: u32,
    pub retry_max_delay_ms: u64,

    // Journal
    pub journal_dir: String,
    pub journal_capacity: usize,
    pub storage_quota_bytes: usize,
    pub thumbnail_max_side: u32,
    pub thumbnail_quality: u8,

    // Client throttle
    pub cooldown_secs: u64,

    // Logging
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let gemini_api_key = env("GEMINI_API_KEY", "");
        let demo_default = if gemini_api_key.is_empty() { "true" } else { "false" };

        Config {
            demo_mode: env("DEMO_MODE", demo_default).to_lowercase() == "true",
            gemini_api_key,
            gemini_model: env("GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_base_url: env(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            retry_max_retries: env("RETRY_MAX_RETRIES", "3").parse().unwrap_or(3),
            retry_initial_delay_ms: env("RETRY_INITIAL_DELAY_MS", "2000").parse().unwrap_or(2000),
            retry_multiplier: env("RETRY_MULTIPLIER", "2").parse().unwrap_or(2),
            retry_max_delay_ms: env("RETRY_MAX_DELAY_MS", "8000").parse().unwrap_or(8000),
            journal_dir: env("JOURNAL_DIR", "data"),
            journal_capacity: env("JOURNAL_CAPACITY", "50").parse().unwrap_or(50),
            storage_quota_bytes: env("STORAGE_QUOTA_BYTES", "5242880")
                .parse()
                .unwrap_or(5 * 1024 * 1024), // browser local-storage budget
            thumbnail_max_side: env("THUMBNAIL_MAX_SIDE", "200").parse().unwrap_or(200),
            thumbnail_quality: env("THUMBNAIL_QUALITY", "70").parse().unwrap_or(70),
            cooldown_secs: env("COOLDOWN_SECS", "10").parse().unwrap_or(10),
            log_level: env("LOG_LEVEL", "info"),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_max_retries,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            multiplier: self.retry_multiplier,
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    pub fn journal_config(&self) -> JournalConfig {
        JournalConfig {
            capacity: self.journal_capacity.max(1),
        }
    }

    pub fn thumbnailer(&self) -> Thumbnailer {
        Thumbnailer {
            max_side: self.thumbnail_max_side.max(1),
            quality: self.thumbnail_quality,
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}
