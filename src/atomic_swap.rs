//! Price table is rebuilt in the background while HTTP handlers keep reading
//! it, so the current table lives behind a swappable `Arc`.
//!
//! Readers clone the `Arc` and work on that snapshot for as long as they need,
//! a writer replaces the whole value. The lock only guards the pointer, never
//! the data, so a reader can never observe a half-built value.



use std::sync::{
    Arc,
    PoisonError,
    RwLock,
};



/// Holds a heap allocated value that can be replaced atomically while other
/// tasks still hold snapshots of the previous one.
#[derive(Debug)]
pub struct AtomicSwap<T> {
    cur: RwLock<Arc<T>>,
}



impl<T: Send + Sync> AtomicSwap<T> {
    pub fn new(val: T) -> Self {
        Self {
            cur: RwLock::new(Arc::new(val)),
        }
    }



    /// Returns snapshot of current value.
    pub fn load(&self) -> Arc<T> {
        // Nothing can panic while holding the lock, but even if it did the
        // pointer itself is always valid, so poisoning can be ignored.
        let guard = self.cur.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }



    /// Replaces current value and returns the previous one.
    ///
    /// Snapshots loaded before the swap stay valid and keep pointing to the
    /// previous value.
    pub fn swap(&self, val: T) -> Arc<T> {
        let next = Arc::new(val);
        let mut guard = self.cur.write().unwrap_or_else(PoisonError::into_inner);

        std::mem::replace(&mut *guard, next)
    }
}
