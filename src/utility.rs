//! Period utility.

/// CRRA utility `c^(1-σ) / (1-σ)`, with `ln(c)` at `σ = 1`.
///
/// Non-positive consumption maps to `lowval`, which acts as the consumption
/// non-negativity constraint inside the grid search.
pub fn crra(consumption: f64, risk_aversion: f64, lowval: f64) -> f64 {
    if consumption <= 0.0 {
        return lowval;
    }
    if (risk_aversion - 1.0).abs() < f64::EPSILON {
        consumption.ln()
    } else {
        let exponent = 1.0 - risk_aversion;
        consumption.powf(exponent) / exponent
    }
}
