//! Human-readable formatting of wei amounts.

use alloy_core::primitives::{
    U256,
    utils::{ParseUnits, Unit},
};

/// Format a wei amount in ether, e.g. `10.0` or `0.25`.
pub fn format_ether(wei: U256) -> String {
    trim_fraction(ParseUnits::from(wei).format_units(Unit::ETHER))
}

/// Format a wei amount in gwei, e.g. `1.5`.
pub fn format_gwei(wei: U256) -> String {
    trim_fraction(ParseUnits::from(wei).format_units(Unit::GWEI))
}

/// Drop trailing fractional zeros but always keep one digit after the point.
fn trim_fraction(formatted: String) -> String {
    match formatted.split_once('.') {
        Some((int, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                format!("{int}.0")
            } else {
                format!("{int}.{frac}")
            }
        }
        None => format!("{formatted}.0"),
    }
}
