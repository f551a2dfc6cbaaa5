// Environment-driven configuration for the telemetry source and the read API.

use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use telemetry_core::connection::ReconnectPolicy;

use crate::constants::{
    CONNECT_TIMEOUT_MS, DEFAULT_DEVICE_ID, DEFAULT_EVENT_LOG, DEFAULT_HTTP_BIND, DEFAULT_HTTP_PORT,
    DEFAULT_RECONNECT_BASE_MS, DEFAULT_RECONNECT_CEILING, DEFAULT_WHEEL_HISTORY, DEFAULT_WS_HOST,
    ENV_CONNECT_TIMEOUT_MS, ENV_DEVICE_ID, ENV_EVENT_LOG, ENV_HTTP_BIND, ENV_HTTP_PORT,
    ENV_RECONNECT_BASE_MS, ENV_RECONNECT_CEILING, ENV_SIM_SEED, ENV_SOURCE, ENV_WHEEL_HISTORY,
    ENV_WS_URL,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has unsupported value {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("telemetry url {0:?} must use ws:// or wss://")]
    InvalidUrl(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceMode {
    Live,
    #[default]
    Simulated,
}

impl FromStr for SourceMode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "live" | "ws" => Ok(SourceMode::Live),
            "simulated" | "sim" | "demo" => Ok(SourceMode::Simulated),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Live => f.write_str("live"),
            SourceMode::Simulated => f.write_str("simulated"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub source: SourceMode,
    pub ws_url: String,
    pub reconnect: ReconnectPolicy,
    pub connect_timeout: Duration,
    pub wheel_history: usize,
    pub event_log: usize,
    pub http_addr: SocketAddr,
    pub sim_seed: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = match lookup(ENV_SOURCE) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_SOURCE,
                value,
            })?,
            None => SourceMode::default(),
        };

        let ws_url = match lookup(ENV_WS_URL).filter(|value| !value.trim().is_empty()) {
            Some(raw) => parse_ws_url(raw.trim())?,
            None => {
                let device_id = lookup(ENV_DEVICE_ID).unwrap_or_else(|| DEFAULT_DEVICE_ID.to_string());
                let mut url = parse_ws_url(DEFAULT_WS_HOST)?;
                url.query_pairs_mut().append_pair("device_id", device_id.trim());
                url
            }
        };

        let base_ms = parse_or(&lookup, ENV_RECONNECT_BASE_MS, DEFAULT_RECONNECT_BASE_MS)?;
        if base_ms == 0 {
            return Err(ConfigError::ZeroDuration(ENV_RECONNECT_BASE_MS));
        }
        let ceiling = parse_or(&lookup, ENV_RECONNECT_CEILING, DEFAULT_RECONNECT_CEILING)?;
        let connect_timeout_ms = parse_or(&lookup, ENV_CONNECT_TIMEOUT_MS, CONNECT_TIMEOUT_MS)?;
        if connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration(ENV_CONNECT_TIMEOUT_MS));
        }
        let wheel_history = parse_or(&lookup, ENV_WHEEL_HISTORY, DEFAULT_WHEEL_HISTORY)?;
        if wheel_history == 0 {
            return Err(ConfigError::ZeroCapacity(ENV_WHEEL_HISTORY));
        }
        let event_log = parse_or(&lookup, ENV_EVENT_LOG, DEFAULT_EVENT_LOG)?;
        if event_log == 0 {
            return Err(ConfigError::ZeroCapacity(ENV_EVENT_LOG));
        }

        let bind: IpAddr = parse_or(&lookup, ENV_HTTP_BIND, DEFAULT_HTTP_BIND)?;
        let port = parse_or(&lookup, ENV_HTTP_PORT, DEFAULT_HTTP_PORT)?;
        let sim_seed = match lookup(ENV_SIM_SEED) {
            Some(value) => Some(value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_SIM_SEED,
                value,
            })?),
            None => None,
        };

        Ok(Self {
            source,
            ws_url: ws_url.into(),
            reconnect: ReconnectPolicy::new(Duration::from_millis(base_ms), ceiling),
            connect_timeout: Duration::from_millis(connect_timeout_ms),
            wheel_history,
            event_log,
            http_addr: SocketAddr::new(bind, port),
            sim_seed,
        })
    }
}

fn parse_ws_url(raw: &str) -> Result<Url, ConfigError> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "ws" | "wss") => Ok(url),
        _ => Err(ConfigError::InvalidUrl(raw.to_string())),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_values() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.source, SourceMode::Simulated);
        assert_eq!(config.ws_url, "ws://localhost:8000/ws/live?device_id=vehiculo-01");
        assert_eq!(config.reconnect, ReconnectPolicy::default());
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.wheel_history, 90);
        assert_eq!(config.event_log, 200);
        assert_eq!(config.http_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.sim_seed, None);
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (ENV_SOURCE, "live"),
            (ENV_DEVICE_ID, "rover-7"),
            (ENV_RECONNECT_BASE_MS, "250"),
            (ENV_RECONNECT_CEILING, "3"),
            (ENV_CONNECT_TIMEOUT_MS, "1500"),
            (ENV_WHEEL_HISTORY, "30"),
            (ENV_HTTP_PORT, "9000"),
            (ENV_SIM_SEED, "42"),
        ]))
        .unwrap();
        assert_eq!(config.source, SourceMode::Live);
        assert!(config.ws_url.ends_with("device_id=rover-7"));
        assert_eq!(config.reconnect.max_delay(), Duration::from_millis(2_000));
        assert_eq!(config.connect_timeout, Duration::from_millis(1_500));
        assert_eq!(config.wheel_history, 30);
        assert_eq!(config.http_addr.port(), 9000);
        assert_eq!(config.sim_seed, Some(42));
    }

    #[test]
    fn explicit_url_wins_over_device_id() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (ENV_WS_URL, "wss://telemetry.example/ws/live?device_id=x"),
            (ENV_DEVICE_ID, "ignored"),
        ]))
        .unwrap();
        assert_eq!(config.ws_url, "wss://telemetry.example/ws/live?device_id=x");
    }

    #[test]
    fn device_id_is_query_encoded() {
        let config = AppConfig::from_lookup(lookup_from(&[(ENV_DEVICE_ID, "rover 7&fleet=b#2")])).unwrap();
        assert_eq!(
            config.ws_url,
            "ws://localhost:8000/ws/live?device_id=rover+7%26fleet%3Db%232"
        );
        let url = Url::parse(&config.ws_url).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("device_id".to_string(), "rover 7&fleet=b#2".to_string())]);
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            AppConfig::from_lookup(lookup_from(&[(ENV_SOURCE, "mqtt")])),
            Err(ConfigError::InvalidValue {
                key: ENV_SOURCE,
                value: "mqtt".to_string(),
            })
        );
        assert_eq!(
            AppConfig::from_lookup(lookup_from(&[(ENV_WS_URL, "http://nope")])),
            Err(ConfigError::InvalidUrl("http://nope".to_string()))
        );
        assert_eq!(
            AppConfig::from_lookup(lookup_from(&[(ENV_RECONNECT_BASE_MS, "0")])),
            Err(ConfigError::ZeroDuration(ENV_RECONNECT_BASE_MS))
        );
        assert_eq!(
            AppConfig::from_lookup(lookup_from(&[(ENV_CONNECT_TIMEOUT_MS, "0")])),
            Err(ConfigError::ZeroDuration(ENV_CONNECT_TIMEOUT_MS))
        );
        assert_eq!(
            AppConfig::from_lookup(lookup_from(&[(ENV_WS_URL, "not a url")])),
            Err(ConfigError::InvalidUrl("not a url".to_string()))
        );
        assert_eq!(
            AppConfig::from_lookup(lookup_from(&[(ENV_EVENT_LOG, "0")])),
            Err(ConfigError::ZeroCapacity(ENV_EVENT_LOG))
        );
        assert!(matches!(
            AppConfig::from_lookup(lookup_from(&[(ENV_HTTP_PORT, "70000")])),
            Err(ConfigError::InvalidValue { key: ENV_HTTP_PORT, .. })
        ));
    }
}
