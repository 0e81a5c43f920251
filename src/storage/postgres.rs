use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_postgres::{
    connect as pg_connect,
    NoTls,
    Client,
};
use tracing::{
    debug,
    error,
    warn,
};

use async_trait::async_trait;

use crate::{
    usage_event::UsageEvent,
    shared_state::SharedState,
    storage::Storage,
};



/// Postgres storage implementation.
///
/// `rx` - receiver for usage event channel.
/// `count` - count for received events.
/// `config_string` - libpq style connection string.
///
/// Expects table:
/// `create table usage_event(key text, known boolean, created timestamptz)`.
pub struct Postgres {
    rx: mpsc::Receiver<UsageEvent>,
    count: usize,
    config_string: String,
    client: Option<Client>,
}



impl Postgres {
    pub fn new(rx: mpsc::Receiver<UsageEvent>, config_string: &str) -> Self {
        Self {
            rx,
            count: 0,
            config_string: config_string.to_string(),
            client: None,
        }
    }



    // Method that ensures that there is active Postgresql connection.
    async fn connection_ensure(&mut self) {
        if let Some(client) = &self.client {
            if !client.is_closed() {
                return
            }
            warn!("Postgres connection closed, reconnecting");
            self.client = None;
        }

        let (client, connection) = match pg_connect(&self.config_string, NoTls).await {
            Ok(ret) => ret,
            Err(e) => {
                error!(error = %e, "could not connect to DB");
                return;
            }
        };

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "Postgres connection error");
            }
        });

        self.client = Some(client);
    }



    // Insert usage event into Postgresql DB if connection is available.
    async fn insert_event(&mut self, event: UsageEvent) -> Result<(), ()> {
        self.connection_ensure().await;

        let Some(ref client) = self.client else {
            error!("DB connection not active, dropping usage event");
            return Err(())
        };

        let sql = r#"
            insert into usage_event(key, known, created)
            values($1, $2, to_timestamp($3::bigint))
        "#;

        let r = client.execute(sql, &[
            &event.key, &event.known, &(event.timestamp as i64),
        ]).await;

        if let Err(e) = r {
            error!(error = %e, key = %event.key, "Database insert failed");
            return Err(())
        }

        return Ok(())
    }
}



#[async_trait]
impl Storage for Postgres {
    async fn main(mut self, shared_state: Arc<SharedState>) {
        // If HTTP server is gone, there is nobody left to send events.
        while let Some(event) = self.rx.recv().await {
            self.count += 1;

            // Telemetry is fire and forget, failed rows are dropped.
            if let Ok(..) = self.insert_event(event).await {
                debug!(count = self.count, "usage event stored");
            }

            if shared_state.is_shut_down() {
                return
            }
        }
    }
}
