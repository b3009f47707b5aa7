use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::domain::errors::DomainError;

/// Frame, grain or sample rate as `numerator/denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rational {
    pub numerator: u64,
    pub denominator: u64,
}

impl Rational {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub const fn whole(numerator: u64) -> Self {
        Self::new(numerator, 1)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl FromStr for Rational {
    type Err = DomainError;

    /// Accepts `50` or `30000/1001`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::parse(format!("invalid rational: {}", s));
        let (numerator, denominator) = match s.trim().split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (s.trim(), "1"),
        };
        let numerator = numerator.parse().map_err(|_| invalid())?;
        let denominator: u64 = denominator.parse().map_err(|_| invalid())?;
        if denominator == 0 {
            return Err(invalid());
        }
        Ok(Self::new(numerator, denominator))
    }
}
