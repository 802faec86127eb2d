//! # Broker Configuration
//!
//! Limits that bound how much untrusted input a single message can make the
//! broker decode or store.

use std::env;
use thiserror::Error;

/// Broker limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Largest encoded voucher accepted by the decoder.
    pub max_voucher_bytes: u64,
    /// Largest encoded parameter blob accepted at the raw dispatch boundary.
    pub max_params_bytes: u64,
    /// Open channels a single payer may hold at once.
    pub max_channels_per_payer: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_voucher_bytes: 4096,
            max_params_bytes: 8192,
            max_channels_per_payer: 1024,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A limit was set to zero.
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
    /// Parameters must be able to carry a full voucher.
    #[error("max_params_bytes ({params}) is smaller than max_voucher_bytes ({voucher})")]
    ParamsSmallerThanVoucher { params: u64, voucher: u64 },
}

impl BrokerConfig {
    /// Create configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    ///
    /// - `PB_MAX_VOUCHER_BYTES`
    /// - `PB_MAX_PARAMS_BYTES`
    /// - `PB_MAX_CHANNELS_PER_PAYER`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_voucher_bytes: env_or("PB_MAX_VOUCHER_BYTES", defaults.max_voucher_bytes),
            max_params_bytes: env_or("PB_MAX_PARAMS_BYTES", defaults.max_params_bytes),
            max_channels_per_payer: env_or(
                "PB_MAX_CHANNELS_PER_PAYER",
                defaults.max_channels_per_payer,
            ),
        }
    }

    /// Reject limits that would make the broker unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_voucher_bytes == 0 {
            return Err(ConfigError::ZeroLimit("max_voucher_bytes"));
        }
        if self.max_channels_per_payer == 0 {
            return Err(ConfigError::ZeroLimit("max_channels_per_payer"));
        }
        if self.max_params_bytes < self.max_voucher_bytes {
            return Err(ConfigError::ParamsSmallerThanVoucher {
                params: self.max_params_bytes,
                voucher: self.max_voucher_bytes,
            });
        }
        Ok(())
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
