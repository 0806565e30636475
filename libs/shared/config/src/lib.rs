use std::env;
use tracing::warn;

/// Finest grid granularity used for occupancy tests when nothing else is configured.
pub const DEFAULT_SLOT_WIDTH_MINUTES: u32 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_token: String,
    pub office_id: Option<String>,
    pub slot_width_minutes: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_base_url: env::var("SCHEDULER_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("SCHEDULER_API_URL not set, using empty value");
                    String::new()
                }),
            api_token: env::var("SCHEDULER_API_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("SCHEDULER_API_TOKEN not set, requests will be unauthenticated");
                    String::new()
                }),
            office_id: env::var("SCHEDULER_OFFICE_ID")
                .ok()
                .filter(|id| !id.trim().is_empty()),
            slot_width_minutes: Self::slot_width_from_env(),
        };

        if !config.is_configured() {
            warn!("Scheduler not fully configured - missing environment variables");
        }

        config
    }

    fn slot_width_from_env() -> u32 {
        match env::var("SCHEDULER_SLOT_WIDTH_MINUTES") {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(width) if width > 0 => width,
                _ => {
                    warn!("SCHEDULER_SLOT_WIDTH_MINUTES={} is not a positive integer, using default", raw);
                    DEFAULT_SLOT_WIDTH_MINUTES
                }
            },
            Err(_) => DEFAULT_SLOT_WIDTH_MINUTES,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty()
    }

    pub fn has_token(&self) -> bool {
        !self.api_token.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            api_token: String::new(),
            office_id: None,
            slot_width_minutes: DEFAULT_SLOT_WIDTH_MINUTES,
        }
    }
}
