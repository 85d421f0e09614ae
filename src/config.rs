use crate::errors::ConfigError;
use crate::window::WINDOW_CAPACITY;
use std::env;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_RECONNECT_SECS: u64 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub backend_url: String,
    pub channel_url: String,
    pub session_id: Option<String>,
    pub window_capacity: usize,
    pub reconnect_delay: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(value) => parse(&value, "PORT", "a port number")?,
            None => DEFAULT_PORT,
        };

        let backend_url = lookup("DASHBOARD_BACKEND_URL")
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let channel_url = match lookup("DASHBOARD_CHANNEL_URL") {
            Some(url) if url.starts_with("ws://") || url.starts_with("wss://") => url,
            Some(url) => {
                return Err(ConfigError::Invalid {
                    key: "DASHBOARD_CHANNEL_URL",
                    expected: "a ws:// or wss:// URL",
                    value: url,
                });
            }
            None => channel_url_for(&backend_url)?,
        };

        let session_id = lookup("DASHBOARD_SESSION_ID").filter(|value| !value.is_empty());

        let window_capacity = match lookup("DASHBOARD_WINDOW_CAPACITY") {
            Some(value) => match parse::<usize>(&value, "DASHBOARD_WINDOW_CAPACITY", "a positive integer")? {
                0 => {
                    return Err(ConfigError::Invalid {
                        key: "DASHBOARD_WINDOW_CAPACITY",
                        expected: "a positive integer",
                        value,
                    });
                }
                capacity => capacity,
            },
            None => WINDOW_CAPACITY,
        };

        let reconnect_secs = match lookup("DASHBOARD_RECONNECT_SECS") {
            Some(value) => parse(&value, "DASHBOARD_RECONNECT_SECS", "a number of seconds")?,
            None => DEFAULT_RECONNECT_SECS,
        };
        let reconnect_delay = (reconnect_secs > 0).then(|| Duration::from_secs(reconnect_secs));

        Ok(Self {
            port,
            backend_url,
            channel_url,
            session_id,
            window_capacity,
            reconnect_delay,
        })
    }
}

/// The push channel lives at `/ws` on the backend host.
fn channel_url_for(backend_url: &str) -> Result<String, ConfigError> {
    if let Some(rest) = backend_url.strip_prefix("https://") {
        Ok(format!("wss://{rest}/ws"))
    } else if let Some(rest) = backend_url.strip_prefix("http://") {
        Ok(format!("ws://{rest}/ws"))
    } else {
        Err(ConfigError::Invalid {
            key: "DASHBOARD_BACKEND_URL",
            expected: "an http:// or https:// URL",
            value: backend_url.to_string(),
        })
    }
}

fn parse<T: std::str::FromStr>(
    value: &str,
    key: &'static str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        expected,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_point_at_local_backend() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.backend_url, "http://127.0.0.1:8000");
        assert_eq!(config.channel_url, "ws://127.0.0.1:8000/ws");
        assert_eq!(config.session_id, None);
        assert_eq!(config.window_capacity, 20);
        assert_eq!(config.reconnect_delay, Some(Duration::from_secs(3)));
    }

    #[test]
    fn https_backend_gets_secure_channel() {
        let config = config_from(&[("DASHBOARD_BACKEND_URL", "https://wardrobe.example/")]).unwrap();
        assert_eq!(config.backend_url, "https://wardrobe.example");
        assert_eq!(config.channel_url, "wss://wardrobe.example/ws");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("DASHBOARD_CHANNEL_URL", "ws://10.0.0.5:8000/live"),
            ("DASHBOARD_SESSION_ID", "abc"),
            ("DASHBOARD_WINDOW_CAPACITY", "50"),
            ("DASHBOARD_RECONNECT_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.channel_url, "ws://10.0.0.5:8000/live");
        assert_eq!(config.session_id.as_deref(), Some("abc"));
        assert_eq!(config.window_capacity, 50);
        assert_eq!(config.reconnect_delay, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("DASHBOARD_BACKEND_URL", "ftp://host")]).is_err());
        assert!(config_from(&[("DASHBOARD_CHANNEL_URL", "http://host/ws")]).is_err());
        assert!(config_from(&[("DASHBOARD_WINDOW_CAPACITY", "0")]).is_err());
    }
}
