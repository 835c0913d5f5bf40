/// Floor a value at 13 decimal places.
///
/// Fees are charged as a fraction of the transferred amount; nodes must agree
/// bit-for-bit on the result, so the truncation precision is fixed.
pub const FEE_PRECISION: f64 = 1e13;

pub fn floor_to_fee_precision(value: f64) -> f64 {
    (value * FEE_PRECISION).floor() / FEE_PRECISION
}

pub fn mean(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<i64>() as f64 / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_floor_precision() {
        // 100 * 0.001 carries float noise; the floor must land on 0.1 exactly
        assert_eq!(floor_to_fee_precision(100.0 * 0.001), 0.1);
        assert_eq!(floor_to_fee_precision(0.0), 0.0);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[10, 20, 30]), 20.0);
    }
}
