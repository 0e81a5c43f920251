//! Converts amounts between two symbols of a price table through the base
//! currency.



use rust_decimal::{
    Decimal,
    RoundingStrategy,
};
use thiserror::Error;
use tracing::info;

use crate::price_table::PriceTable;



/// Number of decimal places in conversion result.
pub const RESULT_DECIMALS: u32 = 8;



#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("No coins available")]
    NoDataAvailable,

    #[error("Amount must be a number")]
    InvalidAmount,

    #[error("Symbol must be one of: {}", available.join(", "))]
    UnknownSymbol {
        available: Vec<String>,
    },
}



/// All symbols currently available, in table order.
pub fn list_symbols(table: &PriceTable) -> Vec<String> {
    table.symbols()
}



/// Convert `amount` of `from` into `to`. When `to` is None, base currency is
/// used.
///
/// Returned value is formatted with exactly 8 decimal places.
pub fn convert(table: &PriceTable, from: &str, amount: &str, to: Option<&str>)
    -> Result<String, ConvertError>
{
    let Some(base) = table.base() else {
        return Err(ConvertError::NoDataAvailable)
    };

    let from = from.trim().to_uppercase();
    let to = to.unwrap_or(base.symbol.as_str()).trim().to_uppercase();

    let amount = amount_parse(amount)?;

    let (Some(from_entry), Some(to_entry)) = (table.get(&from), table.get(&to)) else {
        return Err(ConvertError::UnknownSymbol {
            available: table.symbols(),
        })
    };

    // Finite amount can still overflow for very large inputs.
    let value = (amount * from_entry.price) / to_entry.price;
    if !value.is_finite() {
        return Err(ConvertError::InvalidAmount)
    }

    let result = fixed_format(value, RESULT_DECIMALS);

    info!(%from, %to, amount, %result, "converted");

    Ok(result)
}



fn amount_parse(amount: &str) -> Result<f64, ConvertError> {
    match amount.trim().parse::<f64>() {
        Ok(val) if val.is_finite() => Ok(val),
        _ => Err(ConvertError::InvalidAmount),
    }
}



/// Fixed point formatting that rounds ties away from zero, as people expect
/// from a money amount. Rust float formatting would round ties to even.
fn fixed_format(value: f64, decimals: u32) -> String {
    let Some(dec) = Decimal::from_f64_retain(value) else {
        // Value too large for Decimal. Such magnitudes have no fractional
        // part in f64 anyway, so rounding mode does not matter.
        return format!("{:.*}", decimals as usize, value)
    };

    let rounded = dec.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);

    format!("{:.*}", decimals as usize, rounded)
}
