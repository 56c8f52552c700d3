// src/engine/firewall.rs
//
// Image Firewall: byte-level limits enforced before any engine parse.

use crate::engine::io::embedded_icc_profile;
use crate::error::{Result, ThumbgateError};
use std::str::FromStr;

const STRICT_MAX_BYTES: u64 = 32 * 1024 * 1024; // 32MB input cap
const LENIENT_MAX_BYTES: u64 = 48 * 1024 * 1024; // 48MB input cap
const STRICT_MAX_ICC_BYTES: u64 = 64 * 1024;
const LENIENT_MAX_ICC_BYTES: u64 = 512 * 1024;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FirewallPolicy {
    #[default]
    Disabled,
    Strict,
    Lenient,
    Custom,
}

impl FirewallPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirewallPolicy::Disabled => "disabled",
            FirewallPolicy::Strict => "strict",
            FirewallPolicy::Lenient => "lenient",
            FirewallPolicy::Custom => "custom",
        }
    }
}

impl FromStr for FirewallPolicy {
    type Err = ThumbgateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" => Ok(FirewallPolicy::Disabled),
            "strict" => Ok(FirewallPolicy::Strict),
            "lenient" => Ok(FirewallPolicy::Lenient),
            "custom" => Ok(FirewallPolicy::Custom),
            _ => Err(ThumbgateError::bad_option(
                "firewall_policy",
                s.to_string(),
                "expected one of disabled, strict, lenient, custom",
            )),
        }
    }
}

/// Input limits checked by the validator.
///
/// `Disabled` checks nothing; `Custom` starts with no limits and is meant to
/// be filled in with the `with_*` builders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirewallConfig {
    pub policy: FirewallPolicy,
    pub max_bytes: Option<u64>,
    pub max_icc_bytes: Option<u64>,
}

impl FirewallConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            policy: FirewallPolicy::Strict,
            max_bytes: Some(STRICT_MAX_BYTES),
            max_icc_bytes: Some(STRICT_MAX_ICC_BYTES),
        }
    }

    pub fn lenient() -> Self {
        Self {
            policy: FirewallPolicy::Lenient,
            max_bytes: Some(LENIENT_MAX_BYTES),
            max_icc_bytes: Some(LENIENT_MAX_ICC_BYTES),
        }
    }

    pub fn custom() -> Self {
        Self {
            policy: FirewallPolicy::Custom,
            max_bytes: None,
            max_icc_bytes: None,
        }
    }

    pub fn apply_policy(policy: FirewallPolicy) -> Self {
        match policy {
            FirewallPolicy::Disabled => Self::disabled(),
            FirewallPolicy::Strict => Self::strict(),
            FirewallPolicy::Lenient => Self::lenient(),
            FirewallPolicy::Custom => Self::custom(),
        }
    }

    pub fn with_max_bytes(mut self, limit: u64) -> Self {
        self.max_bytes = Some(limit);
        self
    }

    pub fn with_max_icc_bytes(mut self, limit: u64) -> Self {
        self.max_icc_bytes = Some(limit);
        self
    }

    pub fn enabled(&self) -> bool {
        self.policy != FirewallPolicy::Disabled
    }

    pub fn enforce_source_len(&self, len: usize) -> Result<()> {
        if !self.enabled() {
            return Ok(());
        }
        if let Some(limit) = self.max_bytes {
            let len = len as u64;
            if len > limit {
                return Err(ThumbgateError::too_big(format!(
                    "input size {len} bytes exceeds firewall limit of {limit} bytes"
                )));
            }
        }
        Ok(())
    }

    /// Measure the embedded ICC profile, if any, against `max_icc_bytes`.
    /// Only container chunk tables are walked.
    pub fn scan_metadata(&self, data: &[u8]) -> Result<()> {
        if !self.enabled() {
            return Ok(());
        }
        let Some(limit) = self.max_icc_bytes else {
            return Ok(());
        };
        if let Some(icc) = embedded_icc_profile(data) {
            let icc_len = icc.len() as u64;
            if icc_len > limit {
                return Err(ThumbgateError::too_big(format!(
                    "ICC profile ({icc_len} bytes) exceeds firewall limit of {limit} bytes"
                )));
            }
        }
        Ok(())
    }
}
