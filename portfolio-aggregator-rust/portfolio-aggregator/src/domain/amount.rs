//! Base-unit amount parsing and decimal conversion.

use ethers::core::types::U256;
use ethers::utils::format_units;

/// Decimals of ETH, MATIC and BNB.
pub const EVM_NATIVE_DECIMALS: u32 = 18;

/// Lamports per SOL is 10^9.
pub const LAMPORT_DECIMALS: u32 = 9;

/// Parses a `0x`-prefixed JSON-RPC hex quantity.
pub fn parse_hex_quantity(quantity: &str) -> Option<U256> {
    let digits = quantity.strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }
    U256::from_str_radix(digits, 16).ok()
}

/// Parses a base-10 integer amount as reported by data providers.
pub fn parse_decimal_amount(amount: &str) -> Option<U256> {
    let amount = amount.trim();
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_dec_str(amount).ok()
}

/// Divides a base-unit amount by `10^decimals`.
pub fn from_base_units(amount: U256, decimals: u32) -> Option<f64> {
    let formatted = format_units(amount, decimals).ok()?;
    formatted.parse::<f64>().ok()
}

pub fn wei_to_native(wei: U256) -> Option<f64> {
    from_base_units(wei, EVM_NATIVE_DECIMALS)
}

pub fn lamports_to_sol(lamports: u64) -> Option<f64> {
    from_base_units(U256::from(lamports), LAMPORT_DECIMALS)
}
