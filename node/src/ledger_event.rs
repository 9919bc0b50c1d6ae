//! Fan-out of committed ledger events to in-process subscribers.

use tasknet_ledger::RecordedEvent;

type Listener = Box<dyn Fn(&RecordedEvent) + Send + Sync>;

/// Synchronous fan-out event bus for ledger events.
///
/// Listeners are invoked inline on the committing thread, after the change is
/// durable. Mutating the ledger from a listener is rejected as re-entrant.
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &RecordedEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tasknet_ledger::LedgerEvent;
    use tasknet_types::Address;

    #[test]
    fn every_listener_sees_every_event() {
        let mut bus = EventBus::new();
        let seen = Arc::new(AtomicU64::new(0));
        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            bus.subscribe(Box::new(move |e: &RecordedEvent| {
                seen.fetch_add(e.seq + 1, Ordering::SeqCst);
            }));
        }
        bus.emit(&RecordedEvent {
            seq: 4,
            event: LedgerEvent::ValidatorCreated {
                validator: Address::new("tn_v"),
            },
        });
        assert_eq!(bus.listener_count(), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }
}
