use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};

use tokio::sync::Notify;



#[derive(Default)]
pub struct SharedState {
    // While this is 0, all threads and coroutines can continue to do their
    // tasks. When this is set to 1, concurrent tasks should be gracefully
    // finished.
    // If some task is sleeping, it will take this into account only when it
    // is woken up.
    pub shut_down: AtomicUsize,

    // Wakes tasks that would rather wait for shut down than poll for it, i.e.
    // HTTP server.
    shut_down_notify: Notify,
}



impl SharedState {
    pub fn shut_down_trigger(&self) {
        self.shut_down.store(1, Ordering::SeqCst);
        self.shut_down_notify.notify_waiters();
    }



    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Relaxed) != 0
    }



    /// Resolves once shut down has been triggered.
    pub async fn shut_down_wait(&self) {
        loop {
            let notified = self.shut_down_notify.notified();
            tokio::pin!(notified);

            // Register interest before checking the flag, otherwise trigger
            // could happen in between and we would sleep forever.
            notified.as_mut().enable();

            if self.is_shut_down() {
                return
            }

            notified.await;
        }
    }
}
