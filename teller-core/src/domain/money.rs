//! Currency amounts as integer cents

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest balance the ledger will hold: 2^53 cents.
///
/// Kept at the edge of exact `f64` integers so every balance survives a trip
/// through a JSON number on the caller side.
pub const MAX_CENTS: i64 = 1 << 53;

/// A non-negative currency amount in cents (USD only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    /// Wrap a raw cent count. Returns None outside `0..=MAX_CENTS`.
    pub fn new(cents: i64) -> Option<Self> {
        (0..=MAX_CENTS).contains(&cents).then_some(Self(cents))
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Round a caller-supplied dollar amount to cents.
    ///
    /// Uses half-away-from-zero rounding on `amount * 100`. Returns None for
    /// non-finite input or anything that rounds outside `0..=MAX_CENTS`.
    pub fn from_dollars(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        let scaled = (amount * 100.0).round();
        if scaled < 0.0 || scaled > MAX_CENTS as f64 {
            return None;
        }
        Self::new(scaled as i64)
    }

    /// Dollar value with exactly two decimal places
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn checked_add(self, other: Cents) -> Option<Cents> {
        self.0.checked_add(other.0).and_then(Self::new)
    }

    pub fn checked_sub(self, other: Cents) -> Option<Cents> {
        self.0.checked_sub(other.0).and_then(Self::new)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// Error parsing a stored balance string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCentsError(pub String);

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseCentsError {}

impl FromStr for Cents {
    type Err = ParseCentsError;

    /// Parse a decimal dollar string such as `"1000.00"` or `"749.5"`.
    ///
    /// Strict: sub-cent precision and negative values are rejected rather
    /// than rounded, since a stored balance must decode exactly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| ParseCentsError(format!("not a decimal: {}", e)))?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ParseCentsError("negative balance".to_string()));
        }
        let scaled = value * Decimal::ONE_HUNDRED;
        if !scaled.fract().is_zero() {
            return Err(ParseCentsError("sub-cent precision".to_string()));
        }
        i64::try_from(scaled)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| ParseCentsError("balance out of range".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dollars_rounds_to_cents() {
        assert_eq!(Cents::from_dollars(250.50).unwrap().get(), 25050);
        assert_eq!(Cents::from_dollars(50.01).unwrap().get(), 5001);
        assert_eq!(Cents::from_dollars(0.004).unwrap().get(), 0);
    }

    #[test]
    fn test_from_dollars_rejects_non_finite() {
        assert!(Cents::from_dollars(f64::NAN).is_none());
        assert!(Cents::from_dollars(f64::INFINITY).is_none());
        assert!(Cents::from_dollars(-1.0).is_none());
        assert!(Cents::from_dollars(1e300).is_none());
    }

    #[test]
    fn test_display_has_two_decimals() {
        assert_eq!(Cents::new(100000).unwrap().to_string(), "1000.00");
        assert_eq!(Cents::new(74950).unwrap().to_string(), "749.50");
        assert_eq!(Cents::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_parse_accepts_legacy_formats() {
        assert_eq!("1000".parse::<Cents>().unwrap().get(), 100000);
        assert_eq!("749.5".parse::<Cents>().unwrap().get(), 74950);
        assert_eq!("0.01".parse::<Cents>().unwrap().get(), 1);
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!("abc".parse::<Cents>().is_err());
        assert!("-5.00".parse::<Cents>().is_err());
        assert!("1.005".parse::<Cents>().is_err());
    }

    #[test]
    fn test_checked_arithmetic_respects_bounds() {
        let max = Cents::new(MAX_CENTS).unwrap();
        assert!(max.checked_add(Cents::new(1).unwrap()).is_none());
        assert!(Cents::ZERO.checked_sub(Cents::new(1).unwrap()).is_none());
        assert_eq!(
            Cents::new(100).unwrap().checked_sub(Cents::new(40).unwrap()),
            Cents::new(60)
        );
    }
}
