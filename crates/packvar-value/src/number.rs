//! Arbitrary-precision decimal numbers.
//!
//! Numbers keep the exact decimal digits they were written with so that
//! `0.1` stays `0.1` and integers wider than 64 bits survive a round trip
//! through the resolver. Values are normalized on construction, which makes
//! structural equality numeric equality.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Above this many padding zeros the canonical form switches to exponent notation.
const MAX_PLAIN_ZEROS: i64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number(Repr);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Repr {
    /// `digits * 10^exponent`; `digits` has no leading or trailing zeros
    /// except for zero itself, which is `"0"` with exponent 0.
    Finite {
        negative: bool,
        digits: String,
        exponent: i64,
    },
    Infinite {
        negative: bool,
    },
}

impl Number {
    pub fn zero() -> Self {
        Self(Repr::Finite {
            negative: false,
            digits: "0".to_string(),
            exponent: 0,
        })
    }

    pub fn infinity() -> Self {
        Self(Repr::Infinite { negative: false })
    }

    pub fn neg_infinity() -> Self {
        Self(Repr::Infinite { negative: true })
    }

    /// Parses a decimal literal such as `42`, `-1.5`, or `6.02e23`.
    ///
    /// `inf` and `infinity` (any case, optionally signed) are accepted as
    /// the two infinities. Returns `None` for anything else.
    pub fn parse(text: &str) -> Option<Self> {
        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };

        if rest.eq_ignore_ascii_case("inf") || rest.eq_ignore_ascii_case("infinity") {
            return Some(Self(Repr::Infinite { negative }));
        }

        let (mantissa, exponent) = match rest.find(['e', 'E']) {
            Some(at) => (&rest[..at], rest[at + 1..].parse::<i64>().ok()?),
            None => (rest, 0),
        };
        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((_, "")) => return None,
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (mantissa, ""),
        };
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
            return None;
        }

        let frac_len = i64::try_from(frac_part.len()).ok()?;
        let exponent = exponent.checked_sub(frac_len)?;
        Some(Self::normalized(
            negative,
            format!("{int_part}{frac_part}"),
            exponent,
        ))
    }

    pub fn from_i64(value: i64) -> Self {
        let negative = value < 0;
        Self::normalized(negative, value.unsigned_abs().to_string(), 0)
    }

    /// Converts a float using its shortest round-trip representation.
    ///
    /// Returns `None` for NaN, which has no place in the value domain.
    pub fn from_f64(value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        if value.is_infinite() {
            return Some(Self(Repr::Infinite {
                negative: value.is_sign_negative(),
            }));
        }
        Self::parse(&format!("{value:e}"))
    }

    fn normalized(negative: bool, digits: String, exponent: i64) -> Self {
        let significant = digits.trim_start_matches('0');
        if significant.is_empty() {
            return Self::zero();
        }
        let trimmed = significant.trim_end_matches('0');
        let dropped = (significant.len() - trimmed.len()) as i64;
        Self(Repr::Finite {
            negative,
            digits: trimmed.to_string(),
            exponent: exponent.saturating_add(dropped),
        })
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self.0, Repr::Infinite { .. })
    }

    pub fn is_negative(&self) -> bool {
        match &self.0 {
            Repr::Finite { negative, .. } | Repr::Infinite { negative } => *negative,
        }
    }

    /// True when the number has no fractional part.
    pub fn is_integer(&self) -> bool {
        matches!(self.0, Repr::Finite { exponent, .. } if exponent >= 0)
    }

    /// The exact integer value, if the number is integral and fits in an `i64`.
    pub fn to_i64(&self) -> Option<i64> {
        let Repr::Finite {
            negative,
            digits,
            exponent,
        } = &self.0
        else {
            return None;
        };
        let width = i64::try_from(digits.len())
            .ok()
            .and_then(|len| len.checked_add(*exponent));
        if *exponent < 0 || width.is_none_or(|width| width > 19) {
            return None;
        }
        let sign = if *negative { "-" } else { "" };
        let zeros = "0".repeat(*exponent as usize);
        format!("{sign}{digits}{zeros}").parse().ok()
    }

    /// The nearest float. Magnitudes beyond `f64` saturate to infinity.
    pub fn to_f64(&self) -> f64 {
        match &self.0 {
            Repr::Infinite { negative: true } => f64::NEG_INFINITY,
            Repr::Infinite { negative: false } => f64::INFINITY,
            Repr::Finite {
                negative,
                digits,
                exponent,
            } => {
                let sign = if *negative { "-" } else { "" };
                format!("{sign}{digits}e{exponent}")
                    .parse()
                    .unwrap_or(f64::NAN)
            }
        }
    }

    pub fn negate(&self) -> Self {
        match &self.0 {
            Repr::Finite { digits, .. } if digits == "0" => self.clone(),
            Repr::Finite {
                negative,
                digits,
                exponent,
            } => Self(Repr::Finite {
                negative: !negative,
                digits: digits.clone(),
                exponent: *exponent,
            }),
            Repr::Infinite { negative } => Self(Repr::Infinite {
                negative: !negative,
            }),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (negative, digits, exponent) = match &self.0 {
            Repr::Infinite { negative: true } => return f.write_str("-Infinity"),
            Repr::Infinite { negative: false } => return f.write_str("Infinity"),
            Repr::Finite {
                negative,
                digits,
                exponent,
            } => (*negative, digits, *exponent),
        };
        let sign = if negative { "-" } else { "" };
        let point = i64::try_from(digits.len())
            .unwrap_or(i64::MAX)
            .saturating_add(exponent);

        if exponent >= 0 {
            if exponent > MAX_PLAIN_ZEROS {
                return write!(f, "{sign}{digits}e{exponent}");
            }
            write!(f, "{sign}{digits}{}", "0".repeat(exponent as usize))
        } else if point > 0 {
            let (whole, frac) = digits.split_at(point as usize);
            write!(f, "{sign}{whole}.{frac}")
        } else if -point > MAX_PLAIN_ZEROS {
            write!(f, "{sign}{digits}e{exponent}")
        } else {
            write!(f, "{sign}0.{}{digits}", "0".repeat((-point) as usize))
        }
    }
}

impl FromStr for Number {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidNumber {
            text: s.to_string(),
        })
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Self::from_i64(i64::from(value))
    }
}

impl From<u32> for Number {
    fn from(value: u32) -> Self {
        Self::from_i64(i64::from(value))
    }
}
