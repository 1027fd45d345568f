use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://cardiovascular-guidelines-api.onrender.com";

/// Client configuration for the guidelines service, loaded from environment variables.
///
/// Every value has a default, so an empty environment yields a working client pointed
/// at the hosted service.
#[derive(Clone, Debug)]
pub struct ApiClientConfig {
    pub base_url: String,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
    pub max_error_body_bytes: usize,
    /// Cadence of the background `/health` poll.
    pub health_interval: Duration,
    /// Cadence of `/system/initialization-status` while an initialization runs.
    pub init_poll_interval: Duration,
    /// Blind delay between an ingestion trigger and the status refetch.
    pub refresh_delay: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
            max_error_body_bytes: 8 * 1024,
            health_interval: Duration::from_secs(30),
            init_poll_interval: Duration::from_millis(2_000),
            refresh_delay: Duration::from_millis(2_000),
        }
    }
}

impl ApiClientConfig {
    /// Optional:
    /// - `CARDIO_API_URL` (default: the hosted guidelines API)
    /// - `CARDIO_API_TIMEOUT_SECS` (default: unset, no timeout)
    /// - `CARDIO_MAX_ERROR_BODY_BYTES` (default: 8192)
    /// - `CARDIO_HEALTH_INTERVAL_SECS` (default: 30)
    /// - `CARDIO_INIT_POLL_MS` (default: 2000)
    /// - `CARDIO_REFRESH_DELAY_MS` (default: 2000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("CARDIO_API_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.base_url);

        let request_timeout = env_parse::<u64>("CARDIO_API_TIMEOUT_SECS")
            .filter(|&n| n > 0)
            .map(Duration::from_secs);

        let max_error_body_bytes = env_parse::<usize>("CARDIO_MAX_ERROR_BODY_BYTES")
            .unwrap_or(defaults.max_error_body_bytes);

        let health_interval = env_parse::<u64>("CARDIO_HEALTH_INTERVAL_SECS")
            .filter(|&n| n > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.health_interval);

        let init_poll_interval = env_parse::<u64>("CARDIO_INIT_POLL_MS")
            .filter(|&n| n > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.init_poll_interval);

        let refresh_delay = env_parse::<u64>("CARDIO_REFRESH_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.refresh_delay);

        Self {
            base_url: normalize_base_url(&base_url),
            request_timeout,
            max_error_body_bytes,
            health_interval,
            init_poll_interval,
            refresh_delay,
        }
    }

    /// Same defaults, different service location.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            ..Self::default()
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
