//! Exact conversion between whole-coin decimal strings and wei.

use alloy_primitives::U256;
use alloy_primitives::utils::{format_ether, parse_ether};
use mf_api_types::MarketError;

/// Parse a whole-coin decimal string into wei.
///
/// The conversion is exact: inputs finer than the native unit's 18 decimals
/// are rejected rather than rounded.
pub fn to_wei(amount: &str) -> Result<U256, MarketError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(MarketError::InvalidInput("price is required".to_owned()));
    }
    if trimmed.starts_with('-') {
        return Err(MarketError::InvalidInput(format!(
            "price cannot be negative: {trimmed}"
        )));
    }
    parse_ether(trimmed)
        .map_err(|err| MarketError::InvalidInput(format!("invalid price '{trimmed}': {err}")))
}

/// Render wei as a whole-coin decimal string with insignificant zeros
/// trimmed, e.g. `1500000000000000000 -> "1.5"`.
pub fn to_decimal(wei: U256) -> String {
    let formatted = format_ether(wei);
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                whole.to_owned()
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => formatted,
    }
}
