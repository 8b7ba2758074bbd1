//! Settings read from the environment.

use chrono::Duration;

use crate::collectors::ServiceKind;
use crate::error::ConfigError;
use crate::metrics::MetricWindows;
use crate::out::OutMode;
use crate::utils::{env_opt, parse_number, split_list};

pub const DEFAULT_REGION: &str = "ap-northeast-2";
pub const DEFAULT_FIXTURE: &str = "mocks/rds_fixture.json";

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub regions: Vec<String>,
    pub services: Vec<ServiceKind>,
    pub out_mode: OutMode,
    pub endpoint: Option<String>,
    pub batch_size: usize,
    pub batch_flush_ms: u64,
    /// fixture path when running without AWS
    pub mock_fixture: Option<String>,
    pub account_id: Option<String>,
    pub stale_lookback_days: i64,
}

impl CollectorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_opt)
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let regions = split_list(&get("COLLECTOR_REGIONS").unwrap_or_else(|| DEFAULT_REGION.into()));
        if regions.is_empty() {
            return Err(ConfigError::EmptyRegions);
        }
        let services = ServiceKind::parse_list(&get("COLLECTOR_SERVICES").unwrap_or_else(|| "rds".into()))?;
        let out_mode = OutMode::parse(&get("OUT_MODE").unwrap_or_else(|| "stdout".into()));
        let endpoint = get("COLLECTOR_ENDPOINT");
        if out_mode == OutMode::Http && endpoint.is_none() {
            return Err(ConfigError::MissingEndpoint);
        }

        let batch_size: usize = match get("BATCH_SIZE") {
            Some(v) => parse_number("BATCH_SIZE", &v)?,
            None => 100,
        };
        if batch_size == 0 {
            return Err(ConfigError::InvalidNumber { key: "BATCH_SIZE", value: "0".into() });
        }
        let batch_flush_ms = match get("BATCH_FLUSH_MS") {
            Some(v) => parse_number("BATCH_FLUSH_MS", &v)?,
            None => 0,
        };
        let stale_lookback_days: i64 = match get("STALE_LOOKBACK_DAYS") {
            Some(v) => parse_number("STALE_LOOKBACK_DAYS", &v)?,
            None => 14,
        };
        if stale_lookback_days <= 0 {
            return Err(ConfigError::InvalidNumber {
                key: "STALE_LOOKBACK_DAYS",
                value: stale_lookback_days.to_string(),
            });
        }

        // MOCK_MODE=1 picks the bundled fixture
        let mock_fixture = get("MOCK_MODE").map(|v| match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => DEFAULT_FIXTURE.to_string(),
            _ => v,
        });

        Ok(Self {
            regions,
            services,
            out_mode,
            endpoint,
            batch_size,
            batch_flush_ms,
            mock_fixture,
            account_id: get("AWS_ACCOUNT_ID"),
            stale_lookback_days,
        })
    }

    pub fn windows(&self) -> MetricWindows {
        MetricWindows {
            stale_lookback: Duration::days(self.stale_lookback_days),
            ..MetricWindows::default()
        }
    }
}
