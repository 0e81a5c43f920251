use serde::Deserialize;



/// Single ticker as returned by market data endpoint.
///
/// `symbol` - exchange pair name, i.e. ETHUSDT.
/// `last_price` - last trade price as decimal string. Endpoint sends it as
/// string, so parsing is left to the table builder which decides what to do
/// with values that are not positive numbers.
///
/// All other fields sent by the endpoint are ignored.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RawTicker {
    pub symbol: String,

    #[serde(rename = "lastPrice")]
    pub last_price: String,
}



impl RawTicker {
    pub fn new(symbol: &str, last_price: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            last_price: last_price.to_string(),
        }
    }
}



/// Normalized price of a single symbol relative to base currency.
///
/// `symbol` - uppercase symbol with base currency stripped, i.e. ETH.
/// `price` - how much of base currency one unit of symbol is worth.
/// `is_base` - set only for the base currency itself, whose price is 1.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedSymbol {
    pub symbol: String,
    pub price: f64,
    pub is_base: bool,
}



impl PricedSymbol {
    pub fn new(symbol: String, price: f64) -> Self {
        Self {
            symbol, price, is_base: false,
        }
    }



    pub fn base(symbol: String) -> Self {
        Self {
            symbol, price: 1.0, is_base: true,
        }
    }
}
