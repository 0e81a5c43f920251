use std::{
    sync::Arc,
    time::{
        Duration,
        Instant,
    },
};

use async_trait::async_trait;
use reqwest::{
    Client,
    StatusCode,
};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{
    debug,
    info,
    warn,
};

use crate::{
    atomic_swap::AtomicSwap,
    price_info::RawTicker,
    price_table::PriceTable,
    shared_state::SharedState,
};



/// Upstream fetch failure. Never reaches HTTP clients, previous price table
/// stays in use.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("remote endpoint returned status: {0}")]
    Status(StatusCode),

    #[error("could not decode response as JSON: {0}")]
    Decode(#[from] serde_json::Error),
}



/// Source of raw tickers. Collector depends only on this, not on a specific
/// exchange.
#[async_trait]
pub trait TickerSource: Send + Sync {
    async fn fetch_tickers(&self) -> Result<Vec<RawTicker>, FetchError>;
}



/// Fetches tickers from HTTP endpoint returning JSON array of
/// `{symbol, lastPrice}` objects, i.e. Binance /api/v3/ticker/24hr.
pub struct HttpTickerSource {
    client: Client,
    url: String,
}



impl HttpTickerSource {
    /// `timeout` applies to the whole request, including reading the body.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}



#[async_trait]
impl TickerSource for HttpTickerSource {
    async fn fetch_tickers(&self) -> Result<Vec<RawTicker>, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status))
        }

        let body = response.text().await?;
        let decoded: Vec<RawTicker> = serde_json::from_str(&body)?;

        Ok(decoded)
    }
}



pub struct AsyncHTTPCollector<S> {
    source: S,
    base: String,
    table: Arc<AtomicSwap<PriceTable>>,
    request_period: u64,
}



impl<S: TickerSource> AsyncHTTPCollector<S> {
    pub fn new(source: S, base: &str, table: Arc<AtomicSwap<PriceTable>>) -> Self {
        Self {
            source,
            base: base.to_string(),
            table,
            request_period: 60_000,
        }
    }


    /// Set request period in milliseconds.
    ///
    /// This describes how long should be the pause between refresh attempts.
    /// There is no retry on failure, next attempt happens after this period.
    pub fn request_period_millis_set(&mut self, request_period: u64) {
        self.request_period = request_period;
    }


    /// Fetch tickers once, rebuild price table and swap it in.
    ///
    /// On error the current table is left untouched and error is returned to
    /// the caller, who decides whether and when to try again.
    pub async fn refresh_once(&self) -> Result<usize, FetchError> {
        let tickers = self.source.fetch_tickers().await?;
        let table = PriceTable::build(&tickers, &self.base);
        let count = table.len();

        debug!(tickers = tickers.len(), symbols = count, "price table built");
        self.table.swap(table);

        Ok(count)
    }
}



/// Refresh loop. Runs until shut down is triggered, one refresh at a time, so
/// refreshes never interleave.
pub async fn main<S: TickerSource>(collector: AsyncHTTPCollector<S>,
    shared_state: Arc<SharedState>
) {
    let req_period = Duration::from_millis(collector.request_period);
    let mut failures: usize = 0;

    while !shared_state.is_shut_down() {
        let start = Instant::now();

        match collector.refresh_once().await {
            Ok(count) => {
                if failures > 0 {
                    info!(failures, "price refresh recovered");
                }
                failures = 0;

                info!(symbols = count, "price table refreshed");
            }

            Err(e) => {
                failures += 1;

                warn!(error = %e, consecutive_failures = failures,
                    "price refresh failed, keeping previous table"
                );
            }
        }

        // If refresh took longer than the period, next one starts right away.
        let Some(sleep_duration) = req_period.checked_sub(start.elapsed()) else {
            continue
        };

        tokio::select! {
            _ = sleep(sleep_duration) => {},
            _ = shared_state.shut_down_wait() => {},
        }
    }
}



#[cfg(test)]
mod test {
    use std::sync::atomic::{
        AtomicUsize,
        Ordering,
    };

    use wiremock::{
        matchers::{
            method,
            path,
        },
        Mock,
        MockServer,
        ResponseTemplate,
    };

    use super::*;

    const TICKERS_PATH: &str = "/api/v3/ticker/24hr";

    async fn mock_server(response: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(TICKERS_PATH))
            .respond_with(response)
            .mount(&server)
            .await;

        server
    }

    fn collector_for(server: &MockServer, table: Arc<AtomicSwap<PriceTable>>)
        -> AsyncHTTPCollector<HttpTickerSource>
    {
        let url = format!("{}{}", server.uri(), TICKERS_PATH);
        let source = HttpTickerSource::new(&url, Duration::from_millis(500))
            .expect("client must build");

        AsyncHTTPCollector::new(source, "USDT", table)
    }

    fn previous_table() -> Arc<AtomicSwap<PriceTable>> {
        Arc::new(AtomicSwap::new(PriceTable::build(
            &[RawTicker::new("BTCUSDT", "50000")], "USDT"
        )))
    }

    #[test_log::test(tokio::test)]
    async fn test_refresh_swaps_table() {
        let body = r#"[
            {"symbol":"ETHUSDT","lastPrice":"2000.00000000"},
            {"symbol":"ETHBTC","lastPrice":"0.04000000"},
            {"symbol":"USDTBRL","lastPrice":"5.00000000"}
        ]"#;
        let server = mock_server(ResponseTemplate::new(200).set_body_string(body)).await;

        let table = Arc::new(AtomicSwap::new(PriceTable::default()));
        let collector = collector_for(&server, table.clone());

        let count = collector.refresh_once().await.expect("refresh must succeed");

        assert_eq!(count, 3);
        assert_eq!(table.load().symbols(), vec!["BRL", "ETH", "USDT"]);
    }



    #[test_log::test(tokio::test)]
    async fn test_error_status_keeps_previous_table() {
        let server = mock_server(ResponseTemplate::new(500)).await;
        let table = previous_table();
        let collector = collector_for(&server, table.clone());

        let err = collector.refresh_once().await.unwrap_err();

        assert!(matches!(err, FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
        assert_eq!(table.load().symbols(), vec!["BTC", "USDT"]);
    }



    #[test_log::test(tokio::test)]
    async fn test_malformed_body_keeps_previous_table() {
        let server = mock_server(
            ResponseTemplate::new(200).set_body_string(r#"{"code":-1003,"msg":"banned"}"#)
        ).await;
        let table = previous_table();
        let collector = collector_for(&server, table.clone());

        let err = collector.refresh_once().await.unwrap_err();

        assert!(matches!(err, FetchError::Decode(..)));
        assert_eq!(table.load().symbols(), vec!["BTC", "USDT"]);
    }



    #[test_log::test(tokio::test)]
    async fn test_slow_endpoint_times_out() {
        let server = mock_server(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_secs(3))
        ).await;
        let table = previous_table();
        let collector = collector_for(&server, table.clone());

        let err = collector.refresh_once().await.unwrap_err();

        assert!(matches!(err, FetchError::Request(..)));
        assert_eq!(table.load().symbols(), vec!["BTC", "USDT"]);
    }



    struct FlakySource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TickerSource for FlakySource {
        async fn fetch_tickers(&self) -> Result<Vec<RawTicker>, FetchError> {
            // Every other call fails.
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call % 2 == 1 {
                return Err(FetchError::Status(StatusCode::BAD_GATEWAY))
            }

            Ok(vec![RawTicker::new("ETHUSDT", &format!("{}", 2000 + call))])
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_main_refreshes_until_shut_down() {
        let table = Arc::new(AtomicSwap::new(PriceTable::default()));
        let state = Arc::new(SharedState::default());

        let mut collector = AsyncHTTPCollector::new(
            FlakySource { calls: AtomicUsize::new(0) }, "USDT", table.clone()
        );
        collector.request_period_millis_set(5);

        let handle = tokio::spawn(main(collector, state.clone()));

        // Wait until failed refreshes are followed by successful ones.
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let price = table.load().get("ETH").map(|e| e.price);
                if matches!(price, Some(p) if p >= 2004.0) {
                    break
                }
                sleep(Duration::from_millis(5)).await;
            }
        }).await.expect("table was not refreshed");

        // Failed refreshes never leave the table empty.
        assert!(!table.load().is_empty());

        state.shut_down_trigger();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("collector did not stop")
            .expect("collector panicked");
    }
}
