//! Fixed-point conversions for 18-decimal on-chain amounts.

use alloy::primitives::U256;
use rust_decimal::Decimal;

/// Decimals used by every rate and synth amount
pub const DEFAULT_DECIMALS: u8 = 18;

/// Largest exponent whose power of ten fits in a uint256
const MAX_DECIMALS: u8 = 77;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    InvalidDecimals(u8),
    /// The exact value does not fit in a `Decimal`
    OutOfRange(String),
    InvalidAmount(String),
}

impl std::fmt::Display for UnitsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitsError::InvalidDecimals(d) => write!(f, "Invalid decimals: {}", d),
            UnitsError::OutOfRange(value) => write!(f, "Value out of decimal range: {}", value),
            UnitsError::InvalidAmount(value) => write!(f, "Invalid amount: {}", value),
        }
    }
}

impl std::error::Error for UnitsError {}

/// One whole unit at 18 decimals (10^18)
pub fn one_unit() -> U256 {
    U256::from(10u64).pow(U256::from(DEFAULT_DECIMALS))
}

/// Exact decimal text of `value / 10^decimals`, with every fractional digit kept
pub fn format_units(value: U256, decimals: u8) -> Result<String, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::InvalidDecimals(decimals));
    }
    if decimals == 0 {
        return Ok(value.to_string());
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let integer = value / divisor;
    let fraction = value % divisor;

    Ok(format!(
        "{}.{:0>width$}",
        integer,
        fraction.to_string(),
        width = decimals as usize
    ))
}

/// Convert a fixed-point mantissa into a `Decimal`
///
/// The division is exact. Values whose significant digits do not fit in a
/// `Decimal` are rejected instead of rounded.
pub fn to_decimal(value: U256, decimals: u8) -> Result<Decimal, UnitsError> {
    let text = format_units(value, decimals)?;
    let significant = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };

    Decimal::from_str_exact(significant)
        .map(|d| d.normalize())
        .map_err(|_| UnitsError::OutOfRange(text.clone()))
}

/// USD value of `amount` units of an asset priced at `rate`, both 18-decimal
///
/// The product is taken on the raw mantissas, so it is exact before conversion.
pub fn usd_amount_from_asset_amount(amount: U256, rate: U256) -> Result<Decimal, UnitsError> {
    let product = amount
        .checked_mul(rate)
        .ok_or_else(|| UnitsError::OutOfRange(format!("{} * {}", amount, rate)))?;

    to_decimal(product, DEFAULT_DECIMALS * 2)
}

/// Parse a base-10 uint256 (as stored in the database and accepted by the API)
pub fn parse_u256(text: &str) -> Result<U256, UnitsError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(UnitsError::InvalidAmount(text.to_string()));
    }
    U256::from_str_radix(trimmed, 10).map_err(|_| UnitsError::InvalidAmount(text.to_string()))
}
