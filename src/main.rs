use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{
    error,
    info,
};
use tracing_subscriber::EnvFilter;

pub mod api;
pub mod async_http_collector;
pub mod atomic_swap;
pub mod config;
pub mod conversion;
pub mod price_info;
pub mod price_table;
pub mod shared_state;
pub mod storage;
pub mod usage_event;

use api::AppState;
use async_http_collector::{
    AsyncHTTPCollector,
    HttpTickerSource,
};
use atomic_swap::AtomicSwap;
use config::{
    Config,
    EventStorage,
};
use price_table::PriceTable;
use shared_state::SharedState;
use storage::{
    postgres::Postgres,
    stdout::Stdout,
};
use usage_event::UsageEvent;



fn init_tracing() {
    // RUST_LOG=debug ./coin_convert
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}



#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("application started");

    let config = Config::from_env()?;

    let state = Arc::new(SharedState::default());

    // Empty until first refresh succeeds, conversions fail with "No coins
    // available" meanwhile.
    let table = Arc::new(AtomicSwap::new(PriceTable::default()));

    let (tx_events, rx_events) = mpsc::channel::<UsageEvent>(200);

    let source = HttpTickerSource::new(&config.url_tickers, config.fetch_timeout)?;
    let mut collector = AsyncHTTPCollector::new(source, &config.base_currency, table.clone());
    collector.request_period_millis_set(config.refresh_period.as_millis() as u64);

    let storage_h = match config.event_storage {
        EventStorage::Stdout => {
            tokio::spawn(storage::main(Stdout::new(rx_events), state.clone()))
        }
        EventStorage::Postgres { ref config_string } => {
            let storage = Postgres::new(rx_events, config_string);
            tokio::spawn(storage::main(storage, state.clone()))
        }
    };

    let collector_h = tokio::spawn(
        async_http_collector::main(collector, state.clone())
    );

    let state_signal = state.clone();
    let sig_h = tokio::spawn(async move {
        if let Ok(..) = tokio::signal::ctrl_c().await {
            info!("shut down requested");
            state_signal.shut_down_trigger();
        }
    });

    let app_state = AppState {
        table,
        events: tx_events,
    };
    let router = api::app_router(app_state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        addr = %config.bind_addr,
        base = %config.base_currency,
        upstream = %config.url_tickers,
        "server listening"
    );

    let state_server = state.clone();
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async move { state_server.shut_down_wait().await })
        .await;

    // Server may have stopped on its own, make sure everything else stops too.
    state.shut_down_trigger();

    if let Err(e) = &served {
        error!(error = %e, "server stopped with error");
    }

    // Router owned the last event sender, so storage drains and exits.
    let _ = collector_h.await;
    let _ = storage_h.await;
    sig_h.abort();

    served?;
    Ok(())
}
