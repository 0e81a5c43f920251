use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use async_trait::async_trait;

use crate::{
    usage_event::UsageEvent,
    shared_state::SharedState,
    storage::Storage,
};



/// Storage that does not store anything, but writes events to the log
/// instead.
pub struct Stdout {
    rx: mpsc::Receiver<UsageEvent>,
    count: usize,
}



impl Stdout {
    pub fn new(rx: mpsc::Receiver<UsageEvent>) -> Self {
        Self {
            rx,
            count: 0,
        }
    }
}



#[async_trait]
impl Storage for Stdout {
    async fn main(mut self, shared_state: Arc<SharedState>) {
        // If HTTP server is gone, there is nobody left to send events.
        while let Some(event) = self.rx.recv().await {
            self.count += 1;

            info!(target: "usage_event", key = %event.key, known = event.known,
                timestamp = event.timestamp, count = self.count, "usage event"
            );

            if shared_state.is_shut_down() {
                return
            }
        }
    }
}
