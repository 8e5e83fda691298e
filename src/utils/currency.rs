use bigdecimal::{BigDecimal, Signed, ToPrimitive};
use crate::error::AppError;

/// Conversions between display amounts (major units, BigDecimal) and the
/// integer minor-unit amounts the gateway API expects.
///
/// Gateway API requirements:
/// - All amounts are integers in the currency's smallest unit (paise for
///   INR, cents for USD, yen for JPY).
/// - Zero-decimal currencies (JPY, KRW) don't multiply by 100.
/// - Two-decimal currencies (INR, USD, EUR) multiply by 100.
///
/// `minor_to_major` must be the exact inverse of `major_to_minor` for any
/// amount representable in the currency, otherwise displayed totals drift
/// from what was charged.

/// Convert a major-unit amount to the gateway's minor-unit integer.
///
/// Rejects negative amounts and amounts with sub-minor-unit precision
/// (e.g. 49.999 INR), since truncating those would silently change the
/// charge.
pub fn major_to_minor(amount: &BigDecimal, currency: &str) -> Result<i64, AppError> {
    if currency.is_empty() {
        return Err(AppError::Validation("Currency code cannot be empty".to_string()));
    }

    if amount.is_negative() {
        return Err(AppError::InvalidAmount(
            format!("Amount cannot be negative: {}", amount)
        ));
    }

    let scaled = if is_zero_decimal_currency(currency) {
        amount.clone()
    } else {
        amount * BigDecimal::from(100)
    };

    if !scaled.is_integer() {
        return Err(AppError::InvalidAmount(
            format!("Amount {} {} is not representable in minor units", amount, currency)
        ));
    }

    scaled.to_i64()
        .ok_or_else(|| AppError::InvalidAmount(
            format!("Amount {} {} cannot be converted to a minor-unit integer", amount, currency)
        ))
}

/// Convert a gateway minor-unit amount back to the major-unit value used for
/// display and local persistence.
pub fn minor_to_major(amount_minor: i64, currency: &str) -> Result<BigDecimal, AppError> {
    if currency.is_empty() {
        return Err(AppError::Validation("Currency code cannot be empty".to_string()));
    }

    let amount = BigDecimal::from(amount_minor);

    if is_zero_decimal_currency(currency) {
        Ok(amount)
    } else {
        Ok(amount / BigDecimal::from(100))
    }
}

/// Round an amount to the precision the currency supports.
///
/// Applied before minor-unit conversion so float noise from JSON number
/// decoding (49.99 arriving as 49.990000000000002) doesn't reject or skew a
/// legitimate charge.
pub fn round_for_currency(amount: &BigDecimal, currency: &str) -> BigDecimal {
    if is_zero_decimal_currency(currency) {
        amount.round(0)
    } else {
        amount.round(2)
    }
}

/// Currencies whose smallest unit is the whole unit.
fn is_zero_decimal_currency(currency: &str) -> bool {
    matches!(
        currency.to_uppercase().as_str(),
        "BIF" | "CLP" | "DJF" | "GNF" | "JPY" | "KMF" | "KRW"
            | "MGA" | "PYG" | "RWF" | "UGX" | "VND" | "VUV" | "XAF"
            | "XOF" | "XPF"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    #[test]
    fn test_two_decimal_conversion() {
        let amount = BigDecimal::from_str("49.99").unwrap();
        assert_eq!(major_to_minor(&amount, "INR").unwrap(), 4999);
        assert_eq!(minor_to_major(4999, "INR").unwrap(), amount);
    }

    #[test]
    fn test_whole_amount_conversion() {
        let amount = BigDecimal::from(100);
        assert_eq!(major_to_minor(&amount, "INR").unwrap(), 10000);
    }

    #[test]
    fn test_zero_decimal_currency_passes_through() {
        let amount = BigDecimal::from(500);
        assert_eq!(major_to_minor(&amount, "JPY").unwrap(), 500);
        assert_eq!(minor_to_major(500, "jpy").unwrap(), amount);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let amount = BigDecimal::from_str("-1.00").unwrap();
        assert!(matches!(
            major_to_minor(&amount, "INR"),
            Err(AppError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_sub_minor_precision_rejected() {
        let amount = BigDecimal::from_str("49.999").unwrap();
        assert!(matches!(
            major_to_minor(&amount, "INR"),
            Err(AppError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_round_for_currency_strips_float_noise() {
        let noisy = BigDecimal::from_str("49.990000000000002").unwrap();
        let rounded = round_for_currency(&noisy, "INR");
        assert_eq!(rounded, BigDecimal::from_str("49.99").unwrap());
        assert_eq!(major_to_minor(&rounded, "INR").unwrap(), 4999);
    }

    #[test]
    fn test_round_for_currency_zero_decimal() {
        let noisy = BigDecimal::from_str("500.2").unwrap();
        assert_eq!(round_for_currency(&noisy, "JPY"), BigDecimal::from(500));
    }

    #[test]
    fn test_empty_currency_rejected() {
        let amount = BigDecimal::from(1);
        assert!(major_to_minor(&amount, "").is_err());
        assert!(minor_to_major(100, "").is_err());
    }

    proptest! {
        // Round trip for every amount representable in a two-decimal
        // currency: major -> minor -> major is the identity.
        #[test]
        fn prop_round_trip_two_decimal(minor in 0i64..=10_000_000_000) {
            let major = minor_to_major(minor, "INR").unwrap();
            prop_assert_eq!(major_to_minor(&major, "INR").unwrap(), minor);
        }

        #[test]
        fn prop_round_trip_zero_decimal(minor in 0i64..=10_000_000_000) {
            let major = minor_to_major(minor, "JPY").unwrap();
            prop_assert_eq!(major_to_minor(&major, "JPY").unwrap(), minor);
        }
    }
}
