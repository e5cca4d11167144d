use std::env;
use std::time::Duration;

const DEFAULT_CACHE_SIZE: usize = 25;
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POOL_IDLE_PER_HOST: usize = 20;
const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Tunables for a [`TrackService`](crate::TrackService).
///
/// `cache_size` bounds both the header cache and each range cache.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_size: usize,
    pub fetch_timeout: Duration,
    pub pool_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            cache_size: DEFAULT_CACHE_SIZE,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            pool_idle_per_host: DEFAULT_POOL_IDLE_PER_HOST,
            pool_idle_timeout: DEFAULT_POOL_IDLE_TIMEOUT,
        }
    }
}

impl Settings {
    /// Reads settings from the environment, falling back to defaults.
    ///
    /// Recognized variables: `CACHE_SIZE` (entries), `FETCH_TIMEOUT` (seconds).
    pub fn from_env() -> Self {
        Settings {
            cache_size: usize_env("CACHE_SIZE", DEFAULT_CACHE_SIZE),
            fetch_timeout: duration_env("FETCH_TIMEOUT", DEFAULT_FETCH_TIMEOUT),
            ..Settings::default()
        }
    }
}

fn usize_env(key: &str, default: usize) -> usize {
    match env::var(key) {
        Ok(val) => val.parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn duration_env(key: &str, default: Duration) -> Duration {
    match env::var(key) {
        Ok(val) => val
            .parse()
            .map(Duration::from_secs)
            .unwrap_or(default),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.cache_size, 25);
        assert_eq!(settings.fetch_timeout, Duration::from_secs(30));
    }
}
