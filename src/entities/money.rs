//! Serialization for monetary columns.
//!
//! SQLite hands decimals back with their minimal scale, so a stored 396.00
//! reads as 396. Monetary JSON is pinned to two decimals here so responses
//! stay stable regardless of the backend.

use rust_decimal::Decimal;
use serde::Serializer;

/// The value with at least two decimal places. Values already carrying a
/// wider scale are left alone.
pub fn two_dp(value: Decimal) -> Decimal {
    let mut value = value;
    if value.scale() < 2 {
        value.rescale(2);
    }
    value
}

pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&two_dp(*value).to_string())
}

pub mod option {
    use super::two_dp;
    use rust_decimal::Decimal;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(
        value: &Option<Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&two_dp(*value).to_string()),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::two_dp;
    use rust_decimal_macros::dec;

    #[test]
    fn pads_short_scales_only() {
        assert_eq!(two_dp(dec!(396)).to_string(), "396.00");
        assert_eq!(two_dp(dec!(5.9)).to_string(), "5.90");
        assert_eq!(two_dp(dec!(19.99)).to_string(), "19.99");
        assert_eq!(two_dp(dec!(0.1234)).to_string(), "0.1234");
    }
}
