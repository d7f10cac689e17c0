use std::time::Duration;

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "localhost";
/// Port beanstalkd listens on by default.
pub const DEFAULT_PORT: u16 = 11300;
/// Priority given to jobs when none is supplied: the midpoint of the u32 range.
pub const DEFAULT_PRIORITY: u32 = 1 << 31;
/// Time to run, in seconds, given to jobs when none is supplied.
pub const DEFAULT_TTR: u32 = 120;
/// Upper bound on establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Settings for a [Connection](crate::Connection).
///
/// `connect_timeout` only bounds the initial TCP handshake: once connected,
/// commands wait as long as the broker takes to answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    /// Used by `put` and as the fallback when a job's priority is unknown.
    pub default_priority: u32,
    /// Used by `put`, in seconds.
    pub default_ttr: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            default_priority: DEFAULT_PRIORITY,
            default_ttr: DEFAULT_TTR,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout = Duration::from_millis(ms);
        self
    }

    pub fn default_priority(mut self, pri: u32) -> Self {
        self.config.default_priority = pri;
        self
    }

    pub fn default_ttr(mut self, ttr: u32) -> Self {
        self.config.default_ttr = ttr;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 11300);
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.default_priority, 2_147_483_648);
        assert_eq!(config.default_ttr, 120);
    }

    #[test]
    fn test_builder() {
        let config = Config::builder()
            .host("queue.internal")
            .port(14711)
            .connect_timeout_ms(250)
            .default_priority(1024)
            .default_ttr(30)
            .build();

        assert_eq!(
            config,
            Config {
                host: "queue.internal".into(),
                port: 14711,
                connect_timeout: Duration::from_millis(250),
                default_priority: 1024,
                default_ttr: 30,
            }
        );
    }
}
