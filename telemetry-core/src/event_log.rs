// Bounded newest-first log of discrete events.
// Invariants: insertion at the head; overflow truncates the tail; no deduplication.

use std::collections::VecDeque;

use crate::model::Event;

#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<Event>,
    cap: usize,
}

impl EventLog {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn record(&mut self, event: Event) {
        self.entries.push_front(event);
        self.entries.truncate(self.cap);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventType, Severity};
    use proptest::prelude::*;

    fn event(ts: u64) -> Event {
        Event::new(ts, EventType::Log, Some(Severity::Info), format!("entry {ts}"))
    }

    #[test]
    fn newest_event_is_first() {
        let mut log = EventLog::new(10);
        log.record(event(1));
        log.record(event(2));
        let snapshot = log.snapshot();
        assert_eq!(snapshot[0].ts, 2);
        assert_eq!(snapshot[1].ts, 1);
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut log = EventLog::new(3);
        for ts in 1..=5 {
            log.record(event(ts));
        }
        let order: Vec<u64> = log.snapshot().iter().map(|e| e.ts).collect();
        assert_eq!(order, vec![5, 4, 3]);
    }

    #[test]
    fn identical_events_are_all_kept() {
        let mut log = EventLog::new(5);
        log.record(event(7));
        log.record(event(7));
        assert_eq!(log.len(), 2);
    }

    proptest! {
        #[test]
        fn bounded_and_newest_first(cap in 1usize..32, count in 0u64..128) {
            let mut log = EventLog::new(cap);
            for ts in 0..count {
                log.record(event(ts));
            }
            let snapshot = log.snapshot();
            prop_assert_eq!(snapshot.len(), (count as usize).min(cap));
            if count > 0 {
                prop_assert_eq!(snapshot[0].ts, count - 1);
            }
            prop_assert!(snapshot.windows(2).all(|pair| pair[0].ts > pair[1].ts));
        }
    }
}
