// src/units.rs
// Exact conversion between human decimal amounts and base units

use alloy_primitives::{
    utils::{format_units, parse_units},
    U256,
};
use anchor_lang::prelude::*;

use crate::errors::VaultError;

/// 10^decimals, or an overflow error past what fits in 256 bits
pub fn scale(decimals: u8) -> Result<U256> {
    U256::from(10u8)
        .checked_pow(U256::from(decimals))
        .ok_or(error!(VaultError::AmountOverflow))
}

fn parse_digits(digits: &str) -> Result<U256> {
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| error!(VaultError::AmountOverflow))
}

/// Converts a decimal string such as `"1.5"` into base units without rounding.
///
/// Fractional digits beyond `decimals` are rejected rather than truncated, since the
/// result is the value moved on chain. Signs and exponents are not accepted.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    require!(
        !(whole.is_empty() && fraction.is_empty()),
        VaultError::InvalidAmount
    );
    require!(
        whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()),
        VaultError::InvalidAmount
    );
    require!(
        fraction.len() <= decimals as usize,
        VaultError::ExcessPrecision
    );

    // parse_units wraps on overflow, so the scaled whole part is checked first
    let scaled_whole = parse_digits(whole)?
        .checked_mul(scale(decimals)?)
        .ok_or(error!(VaultError::AmountOverflow))?;
    let value = parse_units(amount, decimals)
        .map_err(|_| error!(VaultError::AmountOverflow))?
        .get_absolute();
    require!(value >= scaled_whole, VaultError::AmountOverflow);
    Ok(value)
}

/// Inverse of [`to_base_units`], with trailing fractional zeros removed
pub fn from_base_units(value: U256, decimals: u8) -> String {
    let Ok(text) = format_units(value, decimals) else {
        return value.to_string();
    };
    match text.split_once('.') {
        Some((whole, fraction)) => match fraction.trim_end_matches('0') {
            "" => whole.to_string(),
            fraction => format!("{whole}.{fraction}"),
        },
        None => text,
    }
}

/// Converts an amount the backend reported as a JSON number.
///
/// The shortest decimal form of the float is used, and digits the asset cannot represent
/// are dropped.
pub fn from_reported(value: f64, decimals: u8) -> Result<U256> {
    require!(value.is_finite() && value >= 0.0, VaultError::InvalidAmount);
    let text = value.to_string();
    let text = match text.split_once('.') {
        Some((whole, fraction)) if fraction.len() > decimals as usize => {
            format!("{whole}.{}", &fraction[..decimals as usize])
        }
        _ => text,
    };
    to_base_units(&text, decimals)
}
