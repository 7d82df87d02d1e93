use std::env;
use std::time::Duration;

/// Timeouts shared by the query and rcon clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How long a status query waits for its single reply
    pub query_timeout: Duration,
    /// Quiet period that ends an rcon reply; twice this with no data at all gives up
    pub rcon_timeout: Duration,
    /// Replaces `rcon_timeout` for slow commands such as `map` and `dir maps/`,
    /// and bounds the name lookup when an rcon session is opened
    pub rcon_long_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_millis(3000),
            rcon_timeout: Duration::from_millis(500),
            rcon_long_timeout: Duration::from_millis(5000),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            query_timeout: millis_var("Q2_QUERY_TIMEOUT_MS").unwrap_or(defaults.query_timeout),
            rcon_timeout: millis_var("Q2_RCON_TIMEOUT_MS").unwrap_or(defaults.rcon_timeout),
            rcon_long_timeout: millis_var("Q2_RCON_LONG_TIMEOUT_MS")
                .unwrap_or(defaults.rcon_long_timeout),
        }
    }
}

fn millis_var(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|ms: &u64| *ms > 0)
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_and_falls_back() {
        env::set_var("Q2_RCON_TIMEOUT_MS", "250");
        env::set_var("Q2_RCON_LONG_TIMEOUT_MS", "soon");
        let config = Config::from_env();
        env::remove_var("Q2_RCON_TIMEOUT_MS");
        env::remove_var("Q2_RCON_LONG_TIMEOUT_MS");

        assert_eq!(config.rcon_timeout, Duration::from_millis(250));
        assert_eq!(config.rcon_long_timeout, Duration::from_secs(5));
        assert_eq!(config.query_timeout, Duration::from_secs(3));
    }
}
