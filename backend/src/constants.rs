// Shared constants for timing, protocol, defaults and environment keys.

use std::net::{IpAddr, Ipv4Addr};

use telemetry_core::connection::ReconnectPolicy;
use telemetry_core::router;

pub const SCHEMA_VERSION: &str = "1.0";
pub const STATE_INTERVAL_MS: u64 = 50;
pub const BROADCAST_CAPACITY: usize = 256;

pub const DEFAULT_DEVICE_ID: &str = "vehiculo-01";
pub const DEFAULT_WS_HOST: &str = "ws://localhost:8000/ws/live";
pub const DEFAULT_HTTP_BIND: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_RECONNECT_BASE_MS: u64 = ReconnectPolicy::DEFAULT_BASE.as_millis() as u64;
pub const DEFAULT_RECONNECT_CEILING: u32 = ReconnectPolicy::DEFAULT_CEILING;
pub const DEFAULT_WHEEL_HISTORY: usize = router::DEFAULT_WHEEL_HISTORY;
pub const DEFAULT_EVENT_LOG: usize = router::DEFAULT_EVENT_LOG;
pub const CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const CLOSE_TIMEOUT_MS: u64 = 1_000;

pub const SIM_GPS_INTERVAL_MS: u64 = 1_000;
pub const SIM_ACTUATOR_INTERVAL_MS: u64 = 1_500;
pub const SIM_WHEEL_INTERVAL_MS: u64 = 100;
pub const SIM_WHEEL_DOWNSAMPLE: u64 = 5;
pub const SIM_FAULT_INTERVAL_MS: u64 = 2_000;
pub const SIM_LIVENESS_INTERVAL_MS: u64 = 3_000;

pub const ENV_SOURCE: &str = "TELEMETRY_SOURCE";
pub const ENV_WS_URL: &str = "TELEMETRY_WS_URL";
pub const ENV_DEVICE_ID: &str = "TELEMETRY_DEVICE_ID";
pub const ENV_RECONNECT_BASE_MS: &str = "RECONNECT_BASE_MS";
pub const ENV_RECONNECT_CEILING: &str = "RECONNECT_CEILING";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "CONNECT_TIMEOUT_MS";
pub const ENV_WHEEL_HISTORY: &str = "WHEEL_HISTORY_CAP";
pub const ENV_EVENT_LOG: &str = "EVENT_LOG_CAP";
pub const ENV_HTTP_BIND: &str = "HTTP_BIND";
pub const ENV_HTTP_PORT: &str = "HTTP_PORT";
pub const ENV_SIM_SEED: &str = "SIM_SEED";
