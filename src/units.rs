// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Conversion between base-unit (wei) integers and decimal ether strings.
//!
//! The conversion is fixed-point with eighteen decimals and inverse-consistent:
//! `parse_ether(&format_ether(wei)) == wei` for every wei value, and
//! `format_ether(parse_ether(text)?)` reproduces `text` up to trailing zeros.

use alloy::primitives::U256;
use num_bigint::BigUint;
use num_traits::Zero;

use crate::common::ChainClientError;

/// Number of decimals of the base-unit representation of ether.
pub const ETHER_DECIMALS: usize = 18;

/// Formats a wei amount as a decimal ether string, trimming trailing zeros
/// from the fractional part.
pub fn format_ether(wei: U256) -> String {
    let wei = BigUint::from_bytes_be(&wei.to_be_bytes::<32>());
    let scale = BigUint::from(10u8).pow(ETHER_DECIMALS as u32);
    let whole = &wei / &scale;
    let frac = &wei % &scale;
    if frac.is_zero() {
        whole.to_string()
    } else {
        let frac = format!("{frac:0>ETHER_DECIMALS$}");
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }
}

/// Parses a decimal ether string into wei.
///
/// Amounts with more than eighteen fractional digits are rejected: they have
/// no base-unit representation.
pub fn parse_ether(text: &str) -> Result<U256, ChainClientError> {
    let (whole, frac) = match text.split_once('.') {
        None => (text, ""),
        Some((whole, frac)) => (whole, frac),
    };
    if (whole.is_empty() && frac.is_empty()) || frac.len() > ETHER_DECIMALS {
        return Err(ChainClientError::InvalidAmount(text.to_string()));
    }
    let scale = BigUint::from(10u8).pow(ETHER_DECIMALS as u32);
    let frac_scale = BigUint::from(10u8).pow((ETHER_DECIMALS - frac.len()) as u32);
    let wei = parse_digits(whole, text)? * scale + parse_digits(frac, text)? * frac_scale;
    biguint_to_u256(&wei)
}

fn parse_digits(digits: &str, amount: &str) -> Result<BigUint, ChainClientError> {
    if digits.is_empty() {
        return Ok(BigUint::zero());
    }
    if !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ChainClientError::InvalidAmount(amount.to_string()));
    }
    BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| ChainClientError::InvalidAmount(amount.to_string()))
}

fn biguint_to_u256(value: &BigUint) -> Result<U256, ChainClientError> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(ChainClientError::NumericOverflow);
    }
    Ok(U256::from_be_slice(&bytes))
}
