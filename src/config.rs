//! Configuration Module
//!
//! Cache construction options with defaults and validation.

use std::time::Duration;

use chrono::TimeDelta;

use crate::error::{CacheError, Result};

// == Limits ==
/// Largest accepted ttl magnitude, in seconds (~253,000 years). Expirations
/// computed from a ttl within this bound always fit the timestamp range.
pub const MAX_TTL_SECONDS: f64 = 8.0e12;

// == Cache Config ==
/// Construction options for a [`TtlCache`](crate::TtlCache).
///
/// All fields are independently defaulted; build a config with struct update
/// syntax:
///
/// ```
/// use doc_ttl_cache::CacheConfig;
///
/// let config = CacheConfig {
///     ttl: 30.0,
///     collection_name: "sessions".to_string(),
///     ..CacheConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Seconds added to "now" to compute an entry's expiration on every write.
    /// May be fractional.
    pub ttl: f64,
    /// Seconds between background sweep executions. May be fractional.
    pub check_period: f64,
    /// Clear the entire backing collection at construction time
    pub flush_on_create: bool,
    /// Name of the external collection backing this cache instance
    pub collection_name: String,
    /// Swallow (and log) store failures instead of propagating them
    pub ignore_store_error: bool,
    /// Return raw store results from write operations instead of a plain
    /// acknowledgement
    pub return_store_results: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: 10.0,
            check_period: 5.0,
            flush_on_create: false,
            collection_name: "cache".to_string(),
            ignore_store_error: false,
            return_store_results: false,
        }
    }
}

impl CacheConfig {
    // == Validation ==
    /// Checks the numeric options for values that cannot drive scheduling.
    ///
    /// `ttl` must be finite and within [`MAX_TTL_SECONDS`] of zero (a
    /// negative ttl is allowed and produces entries that are already
    /// expired). `check_period` must be finite and non-negative because it
    /// becomes a timer interval.
    pub fn validate(&self) -> Result<()> {
        if !self.ttl.is_finite() {
            return Err(CacheError::InvalidConfig(
                "ttl must be a finite number".to_string(),
            ));
        }
        if self.ttl.abs() > MAX_TTL_SECONDS {
            return Err(CacheError::InvalidConfig(
                "ttl is outside the representable time range".to_string(),
            ));
        }
        if !self.check_period.is_finite() || self.check_period < 0.0 {
            return Err(CacheError::InvalidConfig(
                "check_period must be a non-negative finite number".to_string(),
            ));
        }
        Ok(())
    }

    // == Derived Durations ==
    /// The ttl as a signed chrono offset, truncated to millisecond precision.
    pub fn ttl_delta(&self) -> TimeDelta {
        TimeDelta::milliseconds((self.ttl * 1000.0) as i64)
    }

    /// The sweep interval as a native scheduling duration.
    pub fn check_period_duration(&self) -> Duration {
        Duration::from_millis((self.check_period * 1000.0) as u64)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, 10.0);
        assert_eq!(config.check_period, 5.0);
        assert!(!config.flush_on_create);
        assert_eq!(config.collection_name, "cache");
        assert!(!config.ignore_store_error);
        assert!(!config.return_store_results);
    }

    #[test]
    fn test_config_default_validates() {
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_nan_ttl() {
        let config = CacheConfig {
            ttl: f64::NAN,
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_rejects_out_of_range_ttl() {
        for extreme in [1.0e18, -1.0e18, MAX_TTL_SECONDS * 2.0] {
            let config = CacheConfig {
                ttl: extreme,
                ..CacheConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(CacheError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_config_rejects_infinite_check_period() {
        let config = CacheConfig {
            check_period: f64::INFINITY,
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_rejects_negative_check_period() {
        let config = CacheConfig {
            check_period: -1.0,
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_allows_negative_ttl() {
        let config = CacheConfig {
            ttl: -5.0,
            ..CacheConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.ttl_delta(), TimeDelta::milliseconds(-5000));
    }

    #[test]
    fn test_check_period_converted_to_milliseconds() {
        let config = CacheConfig {
            check_period: 2.5,
            ..CacheConfig::default()
        };
        assert_eq!(config.check_period_duration(), Duration::from_millis(2500));
    }
}
