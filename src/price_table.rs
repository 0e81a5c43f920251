//! Builds symbol→price table relative to a single base currency.
//!
//! Only pairs that have base currency on either side are used, so any two
//! symbols of the table can be converted through the base currency.



use std::collections::{
    HashMap,
    HashSet,
};

use tracing::debug;

use crate::price_info::{
    PricedSymbol,
    RawTicker,
};



/// Immutable, sorted price table. Built wholesale on each refresh.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    entries: Vec<PricedSymbol>,
    index: HashMap<String, usize>,
    base: Option<usize>,
}



impl PriceTable {
    /// Build price table from raw tickers.
    ///
    /// Base currency code is case insensitive. Synthetic base entry always
    /// wins over tickers that normalize to the same symbol, among tickers the
    /// first one wins.
    pub fn build(tickers: &[RawTicker], base: &str) -> Self {
        let base = base.trim().to_uppercase();

        let mut entries: Vec<PricedSymbol> = Vec::with_capacity(tickers.len() + 1);
        let mut seen: HashSet<String> = HashSet::with_capacity(tickers.len() + 1);

        seen.insert(base.clone());
        entries.push(PricedSymbol::base(base.clone()));

        for ticker in tickers {
            let Some(priced) = normalize(ticker, &base) else {
                continue
            };

            if seen.contains(&priced.symbol) {
                debug!(symbol = %ticker.symbol, normalized = %priced.symbol,
                    "dropping duplicate ticker"
                );
                continue
            }

            seen.insert(priced.symbol.clone());
            entries.push(priced);
        }

        // Plain byte order, deterministic regardless of locale.
        entries.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        Self::from_sorted(entries)
    }



    fn from_sorted(entries: Vec<PricedSymbol>) -> Self {
        let index = entries.iter()
            .enumerate()
            .map(|(i, e)| (e.symbol.clone(), i))
            .collect();
        let base = entries.iter().position(|e| e.is_base);

        Self {
            entries, index, base,
        }
    }



    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }



    pub fn len(&self) -> usize {
        self.entries.len()
    }



    pub fn entries(&self) -> &[PricedSymbol] {
        &self.entries
    }



    pub fn get(&self, symbol: &str) -> Option<&PricedSymbol> {
        self.index.get(symbol).map(|&i| &self.entries[i])
    }



    /// Base currency entry. Only empty table has none.
    pub fn base(&self) -> Option<&PricedSymbol> {
        self.base.map(|i| &self.entries[i])
    }



    /// All symbols in table order.
    pub fn symbols(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.symbol.clone()).collect()
    }
}



/// Turns raw ticker into priced symbol, or None if ticker can not be used
/// for star conversion through base currency.
fn normalize(ticker: &RawTicker, base: &str) -> Option<PricedSymbol> {
    let Ok(last_price) = ticker.last_price.trim().parse::<f64>() else {
        return None
    };

    if !last_price.is_finite() || last_price <= 0.0 {
        return None
    }

    let pair = ticker.symbol.trim().to_uppercase();
    let base_first = pair.starts_with(base);

    if !base_first && !pair.ends_with(base) {
        return None
    }

    let symbol = pair.replacen(base, "", 1).trim().to_uppercase();
    if symbol.is_empty() {
        return None
    }

    // Pair BASE/ASSET lists price of base in asset units, so it must be
    // inverted to get price of asset in base units.
    let price = if base_first {
        1.0 / last_price
    }
    else {
        last_price
    };

    if !price.is_finite() || price <= 0.0 {
        return None
    }

    Some(PricedSymbol::new(symbol, price))
}



#[cfg(test)]
mod test {
    use super::*;

    fn tickers(raw: &[(&str, &str)]) -> Vec<RawTicker> {
        raw.iter().map(|(s, p)| RawTicker::new(s, p)).collect()
    }

    #[test]
    fn test_build_single_pair() {
        let table = PriceTable::build(&tickers(&[("ETHUSDT", "2000")]), "USDT");

        assert_eq!(table.entries(), &[
            PricedSymbol::new("ETH".to_string(), 2000.0),
            PricedSymbol::base("USDT".to_string()),
        ]);
    }



    #[test]
    fn test_base_first_pair_is_inverted() {
        let table = PriceTable::build(&tickers(&[("BUSDBRL", "4")]), "BUSD");

        let brl = table.get("BRL").expect("BRL must be present");
        assert_eq!(brl.price, 0.25);
        assert!(!brl.is_base);
    }



    #[test]
    fn test_filters_pairs_without_base_and_non_positive_prices() {
        let table = PriceTable::build(&tickers(&[
            ("ETHBTC", "0.05"),
            ("BTCUSDT", "50000"),
            ("LUNAUSDT", "0.00000000"),
            ("XRPUSDT", "-1"),
            ("DOGEUSDT", "abc"),
            ("SOLUSDT", "NaN"),
        ]), "USDT");

        assert_eq!(table.symbols(), vec!["BTC", "USDT"]);
    }



    #[test]
    fn test_base_code_is_case_insensitive() {
        let table = PriceTable::build(&tickers(&[("ETHUSDT", "2000")]), " usdt ");

        let base = table.base().expect("base must be present");
        assert_eq!(base.symbol, "USDT");
        assert_eq!(base.price, 1.0);
        assert!(table.get("ETH").is_some());
    }



    #[test]
    fn test_only_first_occurrence_of_base_is_stripped() {
        // Symbol both starts and ends with base, pair is treated as base first.
        let table = PriceTable::build(&tickers(&[("USDTUSD", "2")]), "USD");

        let entry = table.get("TUSD").expect("TUSD must be present");
        assert_eq!(entry.price, 0.5);
    }



    #[test]
    fn test_symbol_equal_to_base_is_dropped() {
        let table = PriceTable::build(&tickers(&[("USDT", "1.2")]), "USDT");

        assert_eq!(table.len(), 1);
        assert!(table.base().is_some());
    }



    #[test]
    fn test_duplicates_keep_base_and_first_ticker() {
        let table = PriceTable::build(&tickers(&[
            ("BUSDUSDT", "1.01"),
            ("USDTBUSD", "0.5"),
            ("ETHBUSD", "2000"),
            ("BUSDETH", "0.001"),
            ("BUSDBUSD", "3"),
        ]), "BUSD");

        assert_eq!(table.symbols(), vec!["BUSD", "ETH", "USDT"]);
        assert_eq!(table.get("BUSD").map(|e| e.price), Some(1.0));
        assert_eq!(table.get("USDT").map(|e| e.price), Some(1.0 / 1.01));
        assert_eq!(table.get("ETH").map(|e| e.price), Some(2000.0));
    }



    #[test]
    fn test_table_invariants_hold_for_any_base() {
        let raw = tickers(&[
            ("BTCUSDT", "50000"), ("ETHUSDT", "2000"), ("USDTBRL", "5"),
            ("ETHBUSD", "1999"), ("BUSDUSDT", "1.0001"), ("BNBBTC", "0.01"),
            ("ADABUSD", "0.3"), ("ZECUSDT", "0"), ("aaveusdt", "90"),
        ]);

        for base in ["USDT", "BUSD", "BTC", "EUR"] {
            let table = PriceTable::build(&raw, base);

            let bases: Vec<_> = table.entries().iter().filter(|e| e.is_base).collect();
            assert_eq!(bases.len(), 1);
            assert_eq!(bases[0].symbol, base);
            assert_eq!(bases[0].price, 1.0);

            assert!(table.entries().iter().all(|e| e.price > 0.0));

            let symbols = table.symbols();
            assert!(symbols.windows(2).all(|w| w[0] < w[1]),
                "symbols must be sorted and unique: {:?}", symbols
            );
        }
    }



    #[test]
    fn test_sort_is_byte_order() {
        let table = PriceTable::build(&tickers(&[
            ("bUSDT", "1"), ("AUSDT", "1"), ("1INCHUSDT", "1"),
        ]), "USDT");

        assert_eq!(table.symbols(), vec!["1INCH", "A", "B", "USDT"]);
    }



    #[test]
    fn test_base_lookup_after_sort() {
        let table = PriceTable::build(&tickers(&[
            ("ZECUSDT", "30"), ("AAVEUSDT", "90"), ("XRPUSDT", "0.5"),
        ]), "USDT");

        assert_eq!(table.symbols(), vec!["AAVE", "USDT", "XRP", "ZEC"]);
        assert_eq!(table.base(), Some(&PricedSymbol::base("USDT".to_string())));
        assert_eq!(table.base(), table.get("USDT"));
    }



    #[test]
    fn test_default_table_is_empty() {
        let table = PriceTable::default();

        assert!(table.is_empty());
        assert!(table.base().is_none());
        assert!(table.symbols().is_empty());
    }
}
