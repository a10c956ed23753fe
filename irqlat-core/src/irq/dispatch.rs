// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Edge handler and single-slot consumer registration.
//!
//! `EdgeDispatcher::handle_edge` runs in interrupt context: it bumps an
//! atomic counter and, if a consumer is registered, posts one notification.
//! It never allocates, logs or blocks. The consumer slot sits behind a
//! `spin::RwLock` whose read side is the only lock taken on that path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use spin::RwLock;

/// Receiver of edge notifications.
///
/// `notify` is called from interrupt context and must be bounded-time and
/// non-blocking. Repeated calls before the consumer looks may coalesce.
pub trait EventSink: Send + Sync {
    fn notify(&self);
}

/// Outcome of one invocation of the edge handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// The edge was ours and was counted.
    Handled,
    /// The handler is not armed; the edge was ignored.
    None,
}

/// Handler state shared between the endpoint and whatever raises edges.
#[derive(Default)]
pub struct EdgeDispatcher {
    edges: AtomicU64,
    armed: AtomicBool,
    consumer: RwLock<Option<Arc<dyn EventSink>>>,
}

impl EdgeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rising-edge handler.
    pub fn handle_edge(&self) -> IrqReturn {
        if !self.armed.load(Ordering::Acquire) {
            return IrqReturn::None;
        }

        self.edges.fetch_add(1, Ordering::Relaxed);
        if let Some(consumer) = self.consumer.read().as_ref() {
            consumer.notify();
        }
        IrqReturn::Handled
    }

    /// Register a consumer, silently evicting any previous one.
    /// Returns the evicted consumer, if there was one.
    pub fn register_consumer(&self, consumer: Arc<dyn EventSink>) -> Option<Arc<dyn EventSink>> {
        let evicted = self.consumer.write().replace(consumer);
        tracing::debug!(evicted = evicted.is_some(), "Registered edge consumer");
        evicted
    }

    /// Drop the registered consumer, if any.
    pub fn deregister_consumer(&self) -> Option<Arc<dyn EventSink>> {
        self.consumer.write().take()
    }

    pub fn has_consumer(&self) -> bool {
        self.consumer.read().is_some()
    }

    /// Total edges handled since load. Never reset by consumption.
    pub fn edge_count(&self) -> u64 {
        self.edges.load(Ordering::Relaxed)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub(crate) fn set_armed(&self, armed: bool) {
        self.armed.store(armed, Ordering::Release);
    }
}

impl std::fmt::Debug for EdgeDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeDispatcher")
            .field("edges", &self.edge_count())
            .field("armed", &self.is_armed())
            .field("has_consumer", &self.has_consumer())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingSink(AtomicU64);

    impl EventSink for CountingSink {
        fn notify(&self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_unarmed_handler_ignores_edges() {
        let dispatcher = EdgeDispatcher::new();
        assert_eq!(dispatcher.handle_edge(), IrqReturn::None);
        assert_eq!(dispatcher.edge_count(), 0);
    }

    #[test]
    fn test_edges_counted_without_consumer() {
        let dispatcher = EdgeDispatcher::new();
        dispatcher.set_armed(true);
        assert_eq!(dispatcher.handle_edge(), IrqReturn::Handled);
        assert_eq!(dispatcher.handle_edge(), IrqReturn::Handled);
        assert_eq!(dispatcher.edge_count(), 2);
    }

    #[test]
    fn test_new_consumer_evicts_old() {
        let dispatcher = EdgeDispatcher::new();
        dispatcher.set_armed(true);

        let first = Arc::new(CountingSink::default());
        let second = Arc::new(CountingSink::default());

        assert!(dispatcher.register_consumer(first.clone()).is_none());
        dispatcher.handle_edge();
        assert!(dispatcher.register_consumer(second.clone()).is_some());
        dispatcher.handle_edge();

        assert_eq!(first.0.load(Ordering::Relaxed), 1);
        assert_eq!(second.0.load(Ordering::Relaxed), 1);
        assert_eq!(dispatcher.edge_count(), 2);
    }

    #[test]
    fn test_deregister_consumer() {
        let dispatcher = EdgeDispatcher::new();
        dispatcher.register_consumer(Arc::new(CountingSink::default()));
        assert!(dispatcher.has_consumer());
        assert!(dispatcher.deregister_consumer().is_some());
        assert!(!dispatcher.has_consumer());
    }
}
