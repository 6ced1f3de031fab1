//! Exact numeric values produced by the coercion layer.
//!
//! Values use Arrow's `Decimal128` semantics (a scaled `i128`), so they can be
//! written straight into a `Decimal128Array` by the scan driver.

use std::fmt;
use std::str::FromStr;

use arrow::datatypes::DECIMAL128_MAX_PRECISION;
use arrow_buffer::i256;

/// Maximum precision supported by `DecimalValue` (aligns with Arrow's Decimal128).
pub const MAX_DECIMAL_PRECISION: u8 = DECIMAL128_MAX_PRECISION;
const POW10_BASE: i256 = i256::from_i128(10);

/// Errors that can occur while building decimal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecimalError {
    /// Text is not a decimal number.
    Malformed(String),
    /// Requested scale falls outside the supported range.
    ScaleOutOfRange { scale: i32 },
    /// Value has more digits than Decimal128 can hold.
    PrecisionOverflow,
}

impl fmt::Display for DecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecimalError::Malformed(text) => write!(f, "'{text}' is not a decimal number"),
            DecimalError::ScaleOutOfRange { scale } => {
                write!(f, "decimal scale {scale} outside supported range")
            }
            DecimalError::PrecisionOverflow => write!(
                f,
                "decimal value exceeds {MAX_DECIMAL_PRECISION} digits of precision"
            ),
        }
    }
}

impl std::error::Error for DecimalError {}

/// Runtime representation of a Decimal128 value.
///
/// The scale is always non-negative: exponents in parsed text are folded into
/// the integer part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecimalValue {
    value: i128,
    scale: i8,
}

impl DecimalValue {
    /// Create a decimal from its raw parts, validating precision bounds.
    pub fn new(value: i128, scale: i8) -> Result<Self, DecimalError> {
        if !(0..=MAX_DECIMAL_PRECISION as i8).contains(&scale) {
            return Err(DecimalError::ScaleOutOfRange {
                scale: scale as i32,
            });
        }
        if digit_count_i256(i256::from_i128(value)) > MAX_DECIMAL_PRECISION {
            return Err(DecimalError::PrecisionOverflow);
        }
        Ok(Self { value, scale })
    }

    /// Construct a decimal from integer value with zero scale.
    pub fn from_i64(value: i64) -> Self {
        Self {
            value: value as i128,
            scale: 0,
        }
    }

    /// Return the scaled integer backing this decimal.
    #[inline]
    pub fn raw_value(self) -> i128 {
        self.value
    }

    /// Return the scale (number of fractional digits).
    #[inline]
    pub fn scale(self) -> i8 {
        self.scale
    }

    /// Return the decimal precision (total digit count).
    #[inline]
    pub fn precision(self) -> u8 {
        digit_count_i256(i256::from_i128(self.value))
    }

    /// Convert the decimal into an `f64` (lossy for high precision inputs).
    pub fn to_f64(self) -> f64 {
        if self.value == 0 {
            return 0.0;
        }
        let denominator = 10_f64.powi(self.scale as i32);
        (self.value as f64) / denominator
    }

    /// Re-express the value with `scale` fractional digits, if that is exact.
    pub fn rescale(self, scale: i8) -> Option<Self> {
        if scale == self.scale {
            return Some(self);
        }
        if scale > self.scale {
            let factor = 10_i128.checked_pow((scale - self.scale) as u32)?;
            let value = self.value.checked_mul(factor)?;
            return Self::new(value, scale).ok();
        }
        let factor = 10_i128.checked_pow((self.scale - scale) as u32)?;
        if self.value % factor != 0 {
            return None;
        }
        Self::new(self.value / factor, scale).ok()
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.value);
        }
        let negative = self.value < 0;
        let digits = digit_buffer(i256::from_i128(self.value));
        if digits.len() <= self.scale as usize {
            let mut result = String::with_capacity(self.scale as usize + 3);
            if negative {
                result.push('-');
            }
            result.push_str("0.");
            for _ in digits.len()..self.scale as usize {
                result.push('0');
            }
            result.push_str(&digits);
            return f.write_str(&result);
        }
        let split = digits.len() - self.scale as usize;
        if negative {
            f.write_str("-")?;
        }
        f.write_str(&digits[..split])?;
        f.write_str(".")?;
        f.write_str(&digits[split..])
    }
}

impl FromStr for DecimalValue {
    type Err = DecimalError;

    /// Parse `[+-]digits[.digits][(e|E)[+-]digits]` without surrounding
    /// whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DecimalError::Malformed(s.to_string());

        let (mantissa, exponent) = match s.find(['e', 'E']) {
            Some(idx) => {
                let exponent = s[idx + 1..].parse::<i32>().map_err(|_| malformed())?;
                (&s[..idx], exponent)
            }
            None => (s, 0),
        };

        let (negative, unsigned) = match mantissa.as_bytes().first() {
            Some(b'-') => (true, &mantissa[1..]),
            Some(b'+') => (false, &mantissa[1..]),
            _ => (false, mantissa),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(malformed());
        }
        if !int_part
            .bytes()
            .chain(frac_part.bytes())
            .all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }

        let combined = format!("{int_part}{frac_part}");
        let significant = combined.trim_start_matches('0');
        let mut value = if significant.is_empty() {
            0
        } else {
            significant
                .parse::<i128>()
                .map_err(|_| DecimalError::PrecisionOverflow)?
        };
        if negative {
            value = -value;
        }

        let mut scale = frac_part.len() as i64 - exponent as i64;
        if scale < 0 {
            let factor = u32::try_from(-scale)
                .ok()
                .and_then(|exp| 10_i128.checked_pow(exp))
                .ok_or(DecimalError::PrecisionOverflow)?;
            value = value
                .checked_mul(factor)
                .ok_or(DecimalError::PrecisionOverflow)?;
            scale = 0;
        }
        let scale = i8::try_from(scale).map_err(|_| DecimalError::ScaleOutOfRange {
            scale: scale.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        })?;

        Self::new(value, scale)
    }
}

impl PartialOrd for DecimalValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DecimalValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if self.scale == other.scale {
            return self.value.cmp(&other.value);
        }

        let max_scale = std::cmp::max(self.scale, other.scale);
        let scale_diff_self = (max_scale - self.scale) as u32;
        let scale_diff_other = (max_scale - other.scale) as u32;

        // Both sides fit in i128 and the scale gap is at most 38 digits, so the
        // scaled values stay inside i256.
        let l_scaled =
            i256::from_i128(self.value).wrapping_mul(POW10_BASE.wrapping_pow(scale_diff_self));
        let r_scaled =
            i256::from_i128(other.value).wrapping_mul(POW10_BASE.wrapping_pow(scale_diff_other));

        l_scaled.cmp(&r_scaled)
    }
}

fn digit_count_i256(mut value: i256) -> u8 {
    if value == i256::ZERO {
        return 1;
    }
    if value < i256::ZERO {
        value = value.wrapping_neg();
    }
    let mut count: u8 = 0;
    while value != i256::ZERO {
        value = value.wrapping_div(POW10_BASE);
        count += 1;
    }
    count
}

fn digit_buffer(mut value: i256) -> String {
    if value == i256::ZERO {
        return "0".to_owned();
    }
    if value < i256::ZERO {
        value = value.wrapping_neg();
    }
    let mut buf = Vec::new();
    let mut current = value;
    while current != i256::ZERO {
        let rem = current.wrapping_rem(POW10_BASE);
        let digit = rem.as_i128() as u8;
        buf.push((b'0' + digit) as char);
        current = current.wrapping_div(POW10_BASE);
    }
    buf.iter().rev().collect()
}
