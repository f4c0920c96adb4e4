//! Retention policy parsing.
//!
//! ## Grammar
//!
//! ```text
//! keep_all | true
//! keep_none | false
//! <n>[k|m|g] <type> [<n>[k|m|g]]
//! ```
//!
//! `type` is one of `files`, `size`, `txs`, `entries`, `hours` (`h`),
//! `days` (`d`), `minutes` (`m`) or `seconds` (`s`). Suffixes multiply by
//! 1000 for counts and by 1024 for sizes. The trailing value is only
//! accepted after a time type and caps the total size of retained logs.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Parsed retention policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdConfig {
    /// Never prune.
    KeepAll,
    /// Prune everything that may be pruned.
    KeepNone,
    /// Keep this many files.
    Files(u64),
    /// Keep this many bytes of log files.
    Size(u64),
    /// Keep this many entries.
    Entries(u64),
    /// Keep this much history, optionally capped in bytes.
    Timespan {
        /// Age of the oldest retained history.
        keep: Duration,
        /// Total size that forces pruning regardless of age.
        size_cap: Option<u64>,
    },
}

#[derive(Clone, Copy)]
enum Unit {
    Files,
    Size,
    Entries,
    Time(u64),
}

impl ThresholdConfig {
    /// Parses a retention policy string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRetentionPolicy`] if the string does not
    /// follow the grammar.
    pub fn parse(policy: &str) -> CoreResult<Self> {
        let trimmed = policy.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "keep_all" | "true" => return Ok(Self::KeepAll),
            "keep_none" | "false" => return Ok(Self::KeepNone),
            _ => {}
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let (amount, unit, cap) = match parts.as_slice() {
            [amount, unit] => (*amount, *unit, None),
            [amount, unit, cap] => (*amount, *unit, Some(*cap)),
            _ => {
                return Err(CoreError::invalid_retention_policy(
                    policy,
                    "expected '<amount> <type> [<size cap>]'",
                ))
            }
        };

        let unit = parse_unit(policy, unit)?;
        let size_cap = cap.map(|cap| parse_amount(policy, cap, 1024)).transpose()?;
        if size_cap.is_some() && !matches!(unit, Unit::Time(_)) {
            return Err(CoreError::invalid_retention_policy(
                policy,
                "a size cap is only allowed with a time based policy",
            ));
        }

        let config = match unit {
            Unit::Files => Self::Files(parse_amount(policy, amount, 1000)?),
            Unit::Entries => Self::Entries(parse_amount(policy, amount, 1000)?),
            Unit::Size => Self::Size(parse_amount(policy, amount, 1024)?),
            Unit::Time(millis_per_unit) => {
                let count = parse_amount(policy, amount, 1000)?;
                let millis = count.checked_mul(millis_per_unit).ok_or_else(|| {
                    CoreError::invalid_retention_policy(policy, "time span overflows")
                })?;
                Self::Timespan {
                    keep: Duration::from_millis(millis),
                    size_cap,
                }
            }
        };
        Ok(config)
    }
}

fn parse_unit(policy: &str, unit: &str) -> CoreResult<Unit> {
    let unit = match unit.to_ascii_lowercase().as_str() {
        "files" => Unit::Files,
        "size" => Unit::Size,
        "txs" | "entries" => Unit::Entries,
        "hours" | "h" => Unit::Time(60 * 60 * 1000),
        "days" | "d" => Unit::Time(24 * 60 * 60 * 1000),
        "minutes" | "m" => Unit::Time(60 * 1000),
        "seconds" | "s" => Unit::Time(1000),
        other => {
            return Err(CoreError::invalid_retention_policy(
                policy,
                format!("unknown type '{other}'"),
            ))
        }
    };
    Ok(unit)
}

fn parse_amount(policy: &str, amount: &str, base: u64) -> CoreResult<u64> {
    let lower = amount.to_ascii_lowercase();
    let (digits, multiplier) = match lower.as_bytes().last() {
        Some(b'k') => (&lower[..lower.len() - 1], base),
        Some(b'm') => (&lower[..lower.len() - 1], base * base),
        Some(b'g') => (&lower[..lower.len() - 1], base * base * base),
        _ => (lower.as_str(), 1),
    };
    let value: u64 = digits.parse().map_err(|_| {
        CoreError::invalid_retention_policy(policy, format!("invalid amount '{amount}'"))
    })?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| CoreError::invalid_retention_policy(policy, format!("amount '{amount}' overflows")))
}

impl FromStr for ThresholdConfig {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ThresholdConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepAll => write!(f, "keep_all"),
            Self::KeepNone => write!(f, "keep_none"),
            Self::Files(n) => write!(f, "{n} files"),
            Self::Size(n) => write!(f, "{n} size"),
            Self::Entries(n) => write!(f, "{n} entries"),
            Self::Timespan { keep, size_cap } => {
                write!(f, "{} seconds", keep.as_secs())?;
                if let Some(cap) = size_cap {
                    write!(f, " {cap}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_all_and_keep_none() {
        assert_eq!(ThresholdConfig::parse("keep_all").unwrap(), ThresholdConfig::KeepAll);
        assert_eq!(ThresholdConfig::parse("true").unwrap(), ThresholdConfig::KeepAll);
        assert_eq!(ThresholdConfig::parse(" KEEP_NONE ").unwrap(), ThresholdConfig::KeepNone);
        assert_eq!(ThresholdConfig::parse("false").unwrap(), ThresholdConfig::KeepNone);
    }

    #[test]
    fn counts_and_sizes_use_different_suffix_bases() {
        assert_eq!(ThresholdConfig::parse("10 files").unwrap(), ThresholdConfig::Files(10));
        assert_eq!(ThresholdConfig::parse("2k txs").unwrap(), ThresholdConfig::Entries(2_000));
        assert_eq!(
            ThresholdConfig::parse("3m entries").unwrap(),
            ThresholdConfig::Entries(3_000_000)
        );
        assert_eq!(ThresholdConfig::parse("1k size").unwrap(), ThresholdConfig::Size(1024));
        assert_eq!(
            ThresholdConfig::parse("2G size").unwrap(),
            ThresholdConfig::Size(2 * 1024 * 1024 * 1024)
        );
    }

    #[test]
    fn time_policies() {
        assert_eq!(
            "2 days".parse::<ThresholdConfig>().unwrap(),
            ThresholdConfig::Timespan {
                keep: Duration::from_secs(2 * 24 * 3600),
                size_cap: None,
            }
        );
        assert_eq!(
            ThresholdConfig::parse("5 h 100m").unwrap(),
            ThresholdConfig::Timespan {
                keep: Duration::from_secs(5 * 3600),
                size_cap: Some(100 * 1024 * 1024),
            }
        );
        assert_eq!(
            ThresholdConfig::parse("30 s").unwrap(),
            ThresholdConfig::Timespan {
                keep: Duration::from_secs(30),
                size_cap: None,
            }
        );
    }

    #[test]
    fn rejects_malformed_policies() {
        for policy in ["", "files", "ten files", "10 weeks", "10 files 1k", "1 2 3 4", "-1 files"] {
            assert!(
                matches!(
                    ThresholdConfig::parse(policy),
                    Err(CoreError::InvalidRetentionPolicy { .. })
                ),
                "{policy} should be rejected"
            );
        }
    }

    #[test]
    fn display_parses_back() {
        for policy in ["keep_all", "keep_none", "7 files", "100 size", "5 entries", "60 seconds 4096"] {
            let config = ThresholdConfig::parse(policy).unwrap();
            assert_eq!(ThresholdConfig::parse(&config.to_string()).unwrap(), config);
        }
    }
}
