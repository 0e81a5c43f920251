//! Service configuration, loaded from environment and optional `.env` file.

use std::{
    env,
    net::{
        Ipv4Addr,
        SocketAddr,
    },
    time::Duration,
};

use anyhow::{
    bail,
    Context,
};
use tracing::debug;



pub const DEFAULT_URL_TICKERS: &str = "https://api2.binance.com/api/v3/ticker/24hr";



/// Where usage events posted to /api/log/{key} end up.
#[derive(Debug, Clone, PartialEq)]
pub enum EventStorage {
    Stdout,
    Postgres {
        config_string: String,
    },
}



#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub base_currency: String,
    pub url_tickers: String,
    pub refresh_period: Duration,
    pub fetch_timeout: Duration,
    pub static_dir: String,
    pub event_storage: EventStorage,
}



macro_rules! load_or_default {
    ($lookup:expr, $name:expr, $default:expr) => {{
        match $lookup($name) {
            Some(val) => val,
            None => $default.to_string(),
        }
    }}
}



impl Config {
    /// Load configuration from ENV. Values from `.env` are used only if not
    /// already set in the environment. Missing `.env` is fine.
    pub fn from_env() -> anyhow::Result<Self> {
        if let Err(e) = dotenv::dotenv() {
            debug!(error = %e, "no .env loaded");
        }

        Self::from_lookup(|name| env::var(name).ok())
    }



    /// Build configuration from arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
        where F: Fn(&str) -> Option<String>
    {
        let port = load_or_default!(lookup, "PORT", "3000");
        let port: u16 = port.trim().parse()
            .with_context(|| format!("PORT must be a port number, got {:?}", port))?;

        let base_currency = load_or_default!(lookup, "BASE_CURRENCY", "BUSD")
            .trim()
            .to_uppercase();
        if base_currency.is_empty() {
            bail!("BASE_CURRENCY must not be empty");
        }

        let url_tickers = load_or_default!(lookup, "URL_TICKERS", DEFAULT_URL_TICKERS);

        let refresh_secs = load_or_default!(lookup, "REFRESH_PERIOD_SECS", "60");
        let refresh_secs: u64 = refresh_secs.trim().parse()
            .with_context(|| format!("REFRESH_PERIOD_SECS must be a number, got {:?}",
                refresh_secs
            ))?;
        // Zero period would refresh back to back and hammer the upstream.
        if refresh_secs == 0 {
            bail!("REFRESH_PERIOD_SECS must be at least 1");
        }

        let timeout_ms = load_or_default!(lookup, "FETCH_TIMEOUT_MS", "10000");
        let timeout_ms: u64 = timeout_ms.trim().parse()
            .with_context(|| format!("FETCH_TIMEOUT_MS must be a number, got {:?}",
                timeout_ms
            ))?;

        let static_dir = load_or_default!(lookup, "STATIC_DIR", "root");

        let event_storage = match load_or_default!(lookup, "EVENT_STORAGE", "stdout")
            .trim()
            .to_lowercase()
            .as_str()
        {
            "stdout" => EventStorage::Stdout,
            "postgres" => EventStorage::Postgres {
                config_string: pg_config_string(&lookup),
            },
            other => bail!("EVENT_STORAGE must be stdout or postgres, got {:?}", other),
        };

        Ok(Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            base_currency,
            url_tickers,
            refresh_period: Duration::from_secs(refresh_secs),
            fetch_timeout: Duration::from_millis(timeout_ms),
            static_dir,
            event_storage,
        })
    }
}



fn pg_config_string<F>(lookup: &F) -> String
    where F: Fn(&str) -> Option<String>
{
    let host = load_or_default!(lookup, "DB_HOST", "127.0.0.1");
    let port = load_or_default!(lookup, "DB_PORT", "5432");
    let user = load_or_default!(lookup, "DB_USER", "demouser");
    let dbname = load_or_default!(lookup, "DB_NAME", "demo");
    let password = load_or_default!(lookup, "DB_PASS", "");

    format!(concat!("host='{}' port='{}' user='{}'",
        " dbname='{}' password='{}'"), host, port, user, dbname, password
    )
}
