//! Numeric helpers shared by the valuation and aggregation code.

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Median with midpoint interpolation for even lengths; 0.0 for an empty slice.
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Compound annual growth rate as a fraction.
///
/// Undetermined unless `initial > 0`, `periods > 0` and the ratio is non-negative.
pub fn cagr(initial: f64, final_value: f64, periods: f64) -> Option<f64> {
    if initial <= 0.0 || periods <= 0.0 {
        return None;
    }
    let ratio = final_value / initial;
    if ratio < 0.0 || !ratio.is_finite() {
        return None;
    }
    Some(ratio.powf(1.0 / periods) - 1.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
