//! Outbound event fan-out
//!
//! Decoded results leave the core as `MarketEvent`s delivered to every
//! registered subscriber over an unbounded channel. Publishing never blocks or
//! awaits; subscribers whose receiver has been dropped are pruned on the next
//! publish.
//!
//! Ordering: events are delivered to each subscriber in publish order, so a
//! packet's batch event always precedes its per-quote events.

use crate::core::{FiveMinuteBarSet, MinuteBarSet, Quote};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Event published to downstream consumers
#[derive(Debug, Clone)]
pub enum MarketEvent {
    /// Every quote decoded from one packet
    QuoteBatch(Arc<Vec<Quote>>),
    /// One quote, published after its packet's batch
    Quote(Arc<Quote>),
    MinuteBarSet(Arc<MinuteBarSet>),
    FiveMinuteBarSet(Arc<FiveMinuteBarSet>),
    /// Raw code -> name entries from one symbol table packet
    SymbolTableBatch(Arc<HashMap<String, String>>),
    /// Debounced cache change, no payload
    CacheChanged,
}

/// Discriminant used for subscription filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    QuoteBatch,
    Quote,
    MinuteBarSet,
    FiveMinuteBarSet,
    SymbolTableBatch,
    CacheChanged,
}

impl MarketEvent {
    #[inline]
    pub fn kind(&self) -> EventKind {
        match self {
            MarketEvent::QuoteBatch(_) => EventKind::QuoteBatch,
            MarketEvent::Quote(_) => EventKind::Quote,
            MarketEvent::MinuteBarSet(_) => EventKind::MinuteBarSet,
            MarketEvent::FiveMinuteBarSet(_) => EventKind::FiveMinuteBarSet,
            MarketEvent::SymbolTableBatch(_) => EventKind::SymbolTableBatch,
            MarketEvent::CacheChanged => EventKind::CacheChanged,
        }
    }
}

struct Subscriber {
    /// Empty means every kind
    kinds: Vec<EventKind>,
    tx: UnboundedSender<MarketEvent>,
}

impl Subscriber {
    #[inline]
    fn wants(&self, kind: EventKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// Fan-out of `MarketEvent`s to registered subscribers
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every event kind
    pub fn subscribe(&self) -> UnboundedReceiver<MarketEvent> {
        self.subscribe_to(&[])
    }

    /// Subscribe to the listed kinds only; an empty list means all kinds
    ///
    /// Bulk consumers typically take `QuoteBatch` and skip per-quote events.
    pub fn subscribe_to(&self, kinds: &[EventKind]) -> UnboundedReceiver<MarketEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(Subscriber {
            kinds: kinds.to_vec(),
            tx,
        });
        rx
    }

    /// Deliver `event` to every interested subscriber
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, event: MarketEvent) -> usize {
        let kind = event.kind();
        let mut subscribers = self.subscribers.lock();
        let mut delivered = 0;
        subscribers.retain(|sub| {
            if !sub.wants(kind) {
                return !sub.tx.is_closed();
            }
            match sub.tx.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        delivered
    }

    /// True when at least one live subscriber wants `kind`
    ///
    /// Lets the publisher skip building events nobody will read.
    pub fn has_interest(&self, kind: EventKind) -> bool {
        self.subscribers
            .lock()
            .iter()
            .any(|sub| sub.wants(kind) && !sub.tx.is_closed())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert_eq!(bus.publish(MarketEvent::CacheChanged), 2);
        assert!(matches!(a.try_recv(), Ok(MarketEvent::CacheChanged)));
        assert!(matches!(b.try_recv(), Ok(MarketEvent::CacheChanged)));
    }

    #[test]
    fn test_filtered_subscription() {
        let bus = EventBus::new();
        let mut batches = bus.subscribe_to(&[EventKind::QuoteBatch]);

        bus.publish(MarketEvent::Quote(Arc::new(Quote::new("SH600000"))));
        bus.publish(MarketEvent::QuoteBatch(Arc::new(vec![Quote::new("SH600000")])));

        match batches.try_recv() {
            Ok(MarketEvent::QuoteBatch(quotes)) => assert_eq!(quotes.len(), 1),
            other => panic!("expected batch, got {other:?}"),
        }
        assert!(batches.try_recv().is_err());
        assert!(bus.has_interest(EventKind::QuoteBatch));
        assert!(!bus.has_interest(EventKind::Quote));
    }

    #[test]
    fn test_closed_subscribers_pruned() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.publish(MarketEvent::CacheChanged), 1);
        assert_eq!(bus.subscriber_count(), 1);
        drop(kept);
    }

    #[test]
    fn test_publish_order_preserved() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(MarketEvent::QuoteBatch(Arc::new(Vec::new())));
        bus.publish(MarketEvent::Quote(Arc::new(Quote::new("SH600000"))));

        assert_eq!(rx.try_recv().map(|e| e.kind()), Ok(EventKind::QuoteBatch));
        assert_eq!(rx.try_recv().map(|e| e.kind()), Ok(EventKind::Quote));
    }

    #[test]
    fn test_publish_wakes_waiting_receiver() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let mut recv = tokio_test::task::spawn(rx.recv());

        tokio_test::assert_pending!(recv.poll());
        bus.publish(MarketEvent::CacheChanged);
        assert!(recv.is_woken());
        let event = tokio_test::assert_ready!(recv.poll());
        assert!(matches!(event, Some(MarketEvent::CacheChanged)));
    }
}
