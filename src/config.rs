use std::time::Duration;

/// Default reply timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default wait between handshake attempts.
pub const DEFAULT_PROBE_BACKOFF: Duration = Duration::from_millis(50);
pub const DEFAULT_DEVICE_NAME: &str = "iEQ";

/// Settings for one mount connection.
///
/// ```
/// use ieqpro_proto::Config;
/// use std::time::Duration;
///
/// let config = Config::default()
///     .device_name("CEM60")
///     .debug(true)
///     .timeout(Duration::from_secs(2));
/// assert!(!config.simulation);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Label prefixed to every log line from this connection.
    pub device_name: String,
    /// Talk to the built-in simulated mount instead of the transport.
    pub simulation: bool,
    /// Log every command and reply at debug level.
    pub debug: bool,
    /// How long to wait for a reply.
    pub timeout: Duration,
    pub probe_backoff: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_owned(),
            simulation: false,
            debug: false,
            timeout: DEFAULT_TIMEOUT,
            probe_backoff: DEFAULT_PROBE_BACKOFF,
        }
    }
}

impl Config {
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    pub fn simulation(mut self, enabled: bool) -> Self {
        self.simulation = enabled;
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn probe_backoff(mut self, backoff: Duration) -> Self {
        self.probe_backoff = backoff;
        self
    }
}
