//! Conversion between display amounts and integer base units.

use ethers_core::types::U256;
use ethers_core::utils;

/// Converts a display amount into base units (e.g. wei for 18 decimals).
///
/// Uses the shortest decimal representation of `amount`, so `0.1` becomes
/// exactly `10^17` at 18 decimals. Fractional digits beyond `decimals` are
/// truncated.
pub fn parse_units(amount: f64, decimals: u8) -> Result<u128, String> {
    if !amount.is_finite() {
        return Err("amount must be a finite number".to_owned());
    }
    if amount <= 0.0 {
        return Err("amount must be greater than zero".to_owned());
    }

    let rendered = amount.to_string();
    let truncated = match rendered.split_once('.') {
        Some((whole, fraction)) if fraction.len() > usize::from(decimals) => {
            format!("{whole}.{}", &fraction[..usize::from(decimals)])
        }
        _ => rendered,
    };

    let value: U256 = utils::parse_units(truncated, u32::from(decimals))
        .map_err(|err| format!("amount {amount} is not a valid decimal: {err}"))?
        .into();

    if value > U256::from(u128::MAX) {
        return Err(format!("amount {amount} is out of range"));
    }
    if value.is_zero() {
        return Err(format!("amount {amount} is below the smallest unit"));
    }
    Ok(value.as_u128())
}

/// Converts base units into a display amount.
pub fn format_units(value: u128, decimals: u8) -> f64 {
    utils::format_units(U256::from(value), u32::from(decimals))
        .ok()
        .and_then(|formatted| formatted.parse().ok())
        .unwrap_or_else(|| value as f64 / 10_f64.powi(i32::from(decimals)))
}
