//! IEEE 754-2008 decimal128 in binary integer decimal (BID) layout.
//!
//! Bit 127 is the sign, bits 126..113 the biased exponent, and bits 112..0
//! the coefficient. Values that need more than 34 significant digits are
//! rounded half-to-even before packing.

use crate::{Error, Result, Value};
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use num_bigint::{BigInt, Sign};

const EXPONENT_BIAS: i64 = 6176;
const MIN_EXPONENT: i64 = -6176;
const MAX_EXPONENT: i64 = 6111;
const MAX_DIGITS: u64 = 34;
const COEFFICIENT_MASK: u128 = (1 << 113) - 1;

fn digit_count(coefficient: &BigInt) -> usize {
    coefficient.magnitude().to_string().len()
}

/// Packs a decimal into 16 little-endian bytes.
pub(crate) fn encode(value: &BigDecimal) -> Result<[u8; 16]> {
    let mut value = value.normalized();
    if value.digits() > MAX_DIGITS {
        value = value.with_prec(MAX_DIGITS);
    }

    let (mut coefficient, scale) = value.as_bigint_and_exponent();
    let mut exponent = -scale;
    if exponent + (value.digits() as i64) < MIN_EXPONENT {
        // Rounds to zero at the smallest exponent.
        coefficient = BigInt::from(0);
        exponent = MIN_EXPONENT;
    }

    if exponent < MIN_EXPONENT {
        let rounded = value.with_scale_round(-MIN_EXPONENT, RoundingMode::HalfEven);
        let (c, s) = rounded.as_bigint_and_exponent();
        coefficient = c;
        exponent = -s;
    }
    // Clamp large exponents by padding the coefficient with zeros.
    while exponent > MAX_EXPONENT && digit_count(&coefficient) < MAX_DIGITS as usize {
        coefficient *= 10;
        exponent -= 1;
    }
    if exponent > MAX_EXPONENT {
        return Err(Error::serialize(
            "Decimal128",
            format!("{value} is out of range"),
        ));
    }

    let magnitude = coefficient
        .magnitude()
        .to_u128()
        .ok_or_else(|| Error::serialize("Decimal128", format!("{value} has too many digits")))?;
    let sign: u128 = if coefficient.sign() == Sign::Minus { 1 } else { 0 };
    let biased = (exponent + EXPONENT_BIAS) as u128;

    let bits = (sign << 127) | (biased << 113) | magnitude;
    Ok(bits.to_le_bytes())
}

/// Unpacks 16 little-endian bytes. Infinities and NaN become doubles.
pub(crate) fn decode(bytes: [u8; 16]) -> Value {
    let bits = u128::from_le_bytes(bytes);
    let negative = bits >> 127 == 1;

    match (bits >> 122) & 0x1F {
        0x1F => return Value::Double(f64::NAN),
        0x1E => {
            return Value::Double(if negative {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            })
        }
        _ => {}
    }

    let (biased, coefficient) = if (bits >> 125) & 0b11 == 0b11 {
        // The large-coefficient form always exceeds 34 digits: non-canonical, read as zero.
        (((bits >> 111) & 0x3FFF) as i64, 0)
    } else {
        (((bits >> 113) & 0x3FFF) as i64, bits & COEFFICIENT_MASK)
    };
    let coefficient = if coefficient >= 10u128.pow(MAX_DIGITS as u32) {
        0
    } else {
        coefficient
    };

    let mut int = BigInt::from(coefficient);
    if negative {
        int = -int;
    }
    Value::Decimal(BigDecimal::new(int, EXPONENT_BIAS - biased))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_known_encodings() {
        // 1 is coefficient 1, exponent 0
        let one = encode(&dec("1")).unwrap();
        assert_eq!(
            u128::from_le_bytes(one),
            (EXPONENT_BIAS as u128) << 113 | 1
        );

        let negative = encode(&dec("-0.5")).unwrap();
        let bits = u128::from_le_bytes(negative);
        assert_eq!(bits >> 127, 1);
        assert_eq!(bits & COEFFICIENT_MASK, 5);
        assert_eq!(((bits >> 113) & 0x3FFF) as i64 - EXPONENT_BIAS, -1);
    }

    #[test]
    fn test_far_below_range_encodes_zero() {
        let bytes = encode(&dec("1e-400000000")).unwrap();
        assert_eq!(decode(bytes), Value::Decimal(BigDecimal::from(0)));
        assert!(encode(&dec("1e400000000")).is_err());
    }

    #[test]
    fn test_decode_restores_value() {
        for s in ["0", "1.25", "-98765.4321", "1E+20", "0.000001"] {
            let bytes = encode(&dec(s)).unwrap();
            assert_eq!(decode(bytes), Value::Decimal(dec(s)), "{s}");
        }
    }

    #[test]
    fn test_rounds_to_34_digits() {
        let long = dec("1.23456789012345678901234567890123456789");
        let bytes = encode(&long).unwrap();
        let Value::Decimal(back) = decode(bytes) else {
            panic!("expected a decimal");
        };
        assert_eq!(back, dec("1.234567890123456789012345678901235"));
    }

    #[test]
    fn test_special_values() {
        let nan = (0x1Fu128 << 122).to_le_bytes();
        assert!(matches!(decode(nan), Value::Double(f) if f.is_nan()));
        let neg_inf = (1u128 << 127 | 0x1Eu128 << 122).to_le_bytes();
        assert_eq!(decode(neg_inf), Value::Double(f64::NEG_INFINITY));
    }

    #[test]
    fn test_out_of_range() {
        assert!(encode(&dec("1E+7000")).is_err());
        let tiny = encode(&dec("1E-7000")).unwrap();
        assert_eq!(decode(tiny), Value::Decimal(BigDecimal::from(0)));
    }
}
