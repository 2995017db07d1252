//! Gateway configuration, loaded from environment variables with sensible
//! defaults for everything tunable.
//!
//! Construction fails fast: a malformed or missing required variable is a
//! startup error, not a degraded-mode fallback (degraded mode is reserved
//! for the coordination store being unreachable at *runtime*, not for
//! operator misconfiguration at boot).

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Upstream processor base URLs.
#[derive(Debug, Clone)]
pub struct ProcessorUrls {
    pub primary: String,
    pub fallback: String,
}

/// Circuit breaker thresholds. Kept as configuration rather than constants —
/// callers must supply them explicitly or accept the documented defaults.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub cooldown: Duration,
    pub record_ttl: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            cooldown: Duration::from_secs(5),
            record_ttl: Duration::from_secs(600),
        }
    }
}

/// Health cache and probe tuning.
#[derive(Debug, Clone, Copy)]
pub struct HealthConfig {
    pub cache_ttl: Duration,
    pub probe_timeout: Duration,
    pub latency_threshold: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(5),
            probe_timeout: Duration::from_millis(500),
            latency_threshold: Duration::from_millis(500),
        }
    }
}

/// Dispatch retry/backoff tuning.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub max_tries: usize,
    pub backoff: Vec<Duration>,
    pub payment_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_tries: 2,
            backoff: vec![Duration::from_millis(25), Duration::from_millis(100)],
            payment_timeout: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub processors: ProcessorUrls,
    pub store_connection_string: String,
    pub circuit_breaker: CircuitBreakerConfig,
    pub health: HealthConfig,
    pub dispatch: DispatchConfig,
}

impl GatewayConfig {
    /// Loads configuration from environment variables, applying the
    /// documented defaults for everything tunable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let primary = require_env("PROCESSOR_DEFAULT_URL")?;
        let fallback = require_env("PROCESSOR_FALLBACK_URL")?;
        let store_connection_string = require_env("STORE_CONNECTION_STRING")?;

        let defaults = CircuitBreakerConfig::default();
        let circuit_breaker = CircuitBreakerConfig {
            failure_threshold: env_u32("F_OPEN", defaults.failure_threshold)?,
            success_threshold: env_u32("S_CLOSE", defaults.success_threshold)?,
            cooldown: env_duration_secs("T_COOLDOWN", defaults.cooldown)?,
            record_ttl: defaults.record_ttl,
        };

        let defaults = HealthConfig::default();
        let health = HealthConfig {
            cache_ttl: env_duration_secs("CACHE_TTL", defaults.cache_ttl)?,
            probe_timeout: env_duration_millis("PROBE_TIMEOUT_MS", defaults.probe_timeout)?,
            latency_threshold: env_duration_millis("L_LAT", defaults.latency_threshold)?,
        };

        let defaults = DispatchConfig::default();
        let max_tries = env_usize("N_TRIES", defaults.max_tries)?;
        let backoff = env_backoff("BACKOFF_MS", &defaults.backoff)?;
        let dispatch = DispatchConfig {
            max_tries,
            backoff,
            payment_timeout: env_duration_millis("PAYMENT_TIMEOUT_MS", defaults.payment_timeout)?,
        };

        Ok(Self {
            processors: ProcessorUrls { primary, fallback },
            store_connection_string,
            circuit_breaker,
            health,
            dispatch,
        })
    }
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

/// Reads an optional environment variable, falling back to `default` when
/// unset. A present-but-unparsable value is a startup error, never silently
/// ignored.
fn optional_env(name: &'static str) -> Option<String> {
    std::env::var(name).ok()
}

fn env_u32(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    match optional_env(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
            name,
            value,
            reason: e.to_string(),
        }),
    }
}

fn env_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match optional_env(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
            name,
            value,
            reason: e.to_string(),
        }),
    }
}

fn env_duration_secs(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match optional_env(name) {
        None => Ok(default),
        Some(value) => value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::Invalid { name, value, reason: e.to_string() }),
    }
}

fn env_duration_millis(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match optional_env(name) {
        None => Ok(default),
        Some(value) => value
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::Invalid { name, value, reason: e.to_string() }),
    }
}

/// Parses a comma-separated list of millisecond backoff steps, e.g. `25,100`.
fn env_backoff(name: &'static str, default: &[Duration]) -> Result<Vec<Duration>, ConfigError> {
    match optional_env(name) {
        None => Ok(default.to_vec()),
        Some(value) => value
            .split(',')
            .map(|step| {
                step.trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|e| ConfigError::Invalid {
                        name,
                        value: value.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect(),
    }
}

#[cfg(test)]
pub fn test_config(primary: impl Into<String>, fallback: impl Into<String>) -> GatewayConfig {
    GatewayConfig {
        processors: ProcessorUrls {
            primary: primary.into(),
            fallback: fallback.into(),
        },
        store_connection_string: "redis://127.0.0.1/".to_string(),
        circuit_breaker: CircuitBreakerConfig::default(),
        health: HealthConfig::default(),
        dispatch: DispatchConfig::default(),
    }
}
