//! Thread count expressions accepted in configuration.
//!
//! | Written as | Meaning |
//! |------------|---------|
//! | `8` | exactly 8 |
//! | `"auto"`, `"HOST_CPUS"` | number of host CPUs |
//! | `"HOST_CPUS*0.5"` | half the host CPUs, floored |
//! | `"HOST_CPUS-1"` | host CPUs minus one |
//!
//! Host-relative values never resolve below 1.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const HOST_CPUS: &str = "HOST_CPUS";

/// Thread count parse errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThreadCountError {
    #[error("invalid thread count '{0}': expected an integer, 'auto' or HOST_CPUS[*factor|-n]")]
    Invalid(String),

    #[error("invalid HOST_CPUS factor '{0}': must be a finite number greater than 0")]
    InvalidFactor(String),
}

/// A fixed or host-relative number of threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThreadCount {
    Fixed(usize),
    HostCpus { factor: f64, minus: usize },
}

impl Default for ThreadCount {
    fn default() -> Self {
        ThreadCount::auto()
    }
}

impl ThreadCount {
    /// All host CPUs.
    pub const fn auto() -> Self {
        ThreadCount::HostCpus {
            factor: 1.0,
            minus: 0,
        }
    }

    /// Concrete count for a host with `host_cpus` CPUs.
    ///
    /// A scaled count too large for `usize` resolves to `usize::MAX`, which
    /// configuration validation and pool startup both reject.
    pub fn resolve(&self, host_cpus: usize) -> usize {
        match *self {
            ThreadCount::Fixed(n) => n,
            ThreadCount::HostCpus { factor, minus } => scale(host_cpus, factor)
                .unwrap_or(usize::MAX)
                .saturating_sub(minus)
                .max(1),
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, ThreadCount::Fixed(0))
    }
}

fn scale(host_cpus: usize, factor: f64) -> Option<usize> {
    let scaled = (host_cpus as f64 * factor).floor();
    // usize::MAX as f64 rounds up to 2^64, which does not fit
    if scaled.is_finite() && scaled >= 0.0 && scaled < usize::MAX as f64 {
        Some(scaled as usize)
    } else {
        None
    }
}

impl From<usize> for ThreadCount {
    fn from(n: usize) -> Self {
        ThreadCount::Fixed(n)
    }
}

impl FromStr for ThreadCount {
    type Err = ThreadCountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<usize>() {
            return Ok(ThreadCount::Fixed(n));
        }
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(ThreadCount::auto());
        }

        let rest = trimmed
            .strip_prefix(HOST_CPUS)
            .ok_or_else(|| ThreadCountError::Invalid(s.to_string()))?
            .trim();

        if rest.is_empty() {
            Ok(ThreadCount::auto())
        } else if let Some(factor) = rest.strip_prefix('*') {
            let factor = factor.trim();
            match factor.parse::<f64>() {
                Ok(f) if f.is_finite() && f > 0.0 => Ok(ThreadCount::HostCpus {
                    factor: f,
                    minus: 0,
                }),
                _ => Err(ThreadCountError::InvalidFactor(factor.to_string())),
            }
        } else if let Some(minus) = rest.strip_prefix('-') {
            minus
                .trim()
                .parse::<usize>()
                .map(|minus| ThreadCount::HostCpus { factor: 1.0, minus })
                .map_err(|_| ThreadCountError::Invalid(s.to_string()))
        } else {
            Err(ThreadCountError::Invalid(s.to_string()))
        }
    }
}

impl fmt::Display for ThreadCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ThreadCount::Fixed(n) => write!(f, "{}", n),
            ThreadCount::HostCpus { factor, minus } => {
                write!(f, "{}", HOST_CPUS)?;
                if factor != 1.0 {
                    write!(f, "*{}", factor)?;
                }
                if minus > 0 {
                    write!(f, "-{}", minus)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for ThreadCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            ThreadCount::Fixed(n) => match u64::try_from(n) {
                Ok(n) => serializer.serialize_u64(n),
                Err(_) => serializer.collect_str(&n),
            },
            _ => serializer.collect_str(self),
        }
    }
}

impl<'de> Deserialize<'de> for ThreadCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => usize::try_from(n)
                .map(ThreadCount::Fixed)
                .map_err(|_| serde::de::Error::custom(format!("thread count {} is too large", n))),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Number of CPUs available to this process, at least 1.
pub fn host_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
