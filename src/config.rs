use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: IpAddr,
    /// WebTransport port
    pub port: u16,
    /// Maximum number of concurrent rooms
    pub max_rooms: usize,
    /// Metrics HTTP port; 0 disables the endpoint
    pub metrics_port: u16,
    /// Path to TLS certificate file (if not using certs/ or a generated one)
    pub tls_cert_path: Option<String>,
    /// Path to TLS key file
    pub tls_key_path: Option<String>,
    /// QUIC keep-alive interval
    pub keep_alive: Duration,
    /// Idle connections are closed after this long
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 4433,
            max_rooms: 500,
            metrics_port: 9090,
            tls_cert_path: None,
            tls_key_path: None,
            keep_alive: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// Parse `raw` or warn and keep the default
fn parse_or_warn<T: FromStr>(key: &str, raw: &str, valid: impl Fn(&T) -> bool, rule: &str) -> Option<T> {
    match raw.parse::<T>() {
        Ok(parsed) if valid(&parsed) => Some(parsed),
        Ok(_) => {
            tracing::warn!("{} must be {}, using default", key, rule);
            None
        }
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            None
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Load config from an arbitrary key lookup
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("BIND_ADDRESS") {
            if let Some(parsed) = parse_or_warn("BIND_ADDRESS", &addr, |_: &IpAddr| true, "an IP address") {
                config.bind_address = parsed;
            }
        }

        if let Some(port) = lookup("PORT") {
            if let Some(parsed) = parse_or_warn("PORT", &port, |p: &u16| *p > 0, "> 0") {
                config.port = parsed;
            }
        }

        if let Some(max_rooms) = lookup("MAX_ROOMS") {
            if let Some(parsed) = parse_or_warn("MAX_ROOMS", &max_rooms, |n: &usize| (1..=10000).contains(n), "1-10000") {
                config.max_rooms = parsed;
            }
        }

        if let Some(port) = lookup("METRICS_PORT") {
            if let Some(parsed) = parse_or_warn("METRICS_PORT", &port, |_: &u16| true, "a port") {
                config.metrics_port = parsed;
            }
        }

        if let Some(secs) = lookup("KEEP_ALIVE_SECS") {
            if let Some(parsed) = parse_or_warn("KEEP_ALIVE_SECS", &secs, |s: &u64| *s > 0, "> 0") {
                config.keep_alive = Duration::from_secs(parsed);
            }
        }

        if let Some(secs) = lookup("IDLE_TIMEOUT_SECS") {
            if let Some(parsed) = parse_or_warn("IDLE_TIMEOUT_SECS", &secs, |s: &u64| *s > 0, "> 0") {
                config.idle_timeout = Duration::from_secs(parsed);
            }
        }

        config.tls_cert_path = lookup("TLS_CERT_PATH");
        config.tls_key_path = lookup("TLS_KEY_PATH");

        config
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port != 0
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }
        if self.max_rooms == 0 {
            return Err("max_rooms must be at least 1".to_string());
        }
        if self.metrics_enabled() && self.metrics_port == self.port {
            return Err("METRICS_PORT must differ from PORT".to_string());
        }
        if self.keep_alive >= self.idle_timeout {
            return Err("keep-alive interval must be shorter than the idle timeout".to_string());
        }
        if self.tls_cert_path.is_some() != self.tls_key_path.is_some() {
            return Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::load_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 4433);
        assert_eq!(config.max_rooms, 500);
        assert_eq!(config.metrics_port, 9090);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_overrides() {
        let config = load(&[
            ("BIND_ADDRESS", "127.0.0.1"),
            ("PORT", "5000"),
            ("MAX_ROOMS", "42"),
            ("METRICS_PORT", "0"),
            ("IDLE_TIMEOUT_SECS", "90"),
        ]);
        assert_eq!(config.bind_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.port, 5000);
        assert_eq!(config.max_rooms, 42);
        assert!(!config.metrics_enabled());
        assert_eq!(config.idle_timeout, Duration::from_secs(90));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = load(&[
            ("BIND_ADDRESS", "not-an-ip"),
            ("PORT", "0"),
            ("MAX_ROOMS", "20000"),
            ("KEEP_ALIVE_SECS", "soon"),
        ]);
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_combinations() {
        let mut config = ServerConfig {
            metrics_port: 4433,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        config.metrics_port = 9090;
        config.keep_alive = Duration::from_secs(60);
        assert!(config.validate().is_err());

        config.keep_alive = Duration::from_secs(30);
        config.tls_cert_path = Some("cert.pem".to_string());
        assert!(config.validate().is_err());

        config.tls_key_path = Some("key.pem".to_string());
        assert!(config.validate().is_ok());
    }
}
