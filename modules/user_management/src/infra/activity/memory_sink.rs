use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::contract::model::LogEvent;
use crate::domain::ports::LogSink;

/// Process-lifetime event store. Bounded sinks drop the oldest event first.
pub struct InMemoryLogSink {
    events: RwLock<VecDeque<LogEvent>>,
    capacity: Option<usize>,
}

impl InMemoryLogSink {
    pub fn unbounded() -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            capacity: None,
        }
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity),
        }
    }

    pub fn from_config(capacity: Option<usize>) -> Self {
        capacity.map_or_else(Self::unbounded, Self::with_capacity)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Default for InMemoryLogSink {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl LogSink for InMemoryLogSink {
    fn append(&self, event: LogEvent) {
        let mut events = self.events.write();
        if let Some(cap) = self.capacity {
            while events.len() >= cap {
                events.pop_front();
            }
        }
        events.push_back(event);
    }

    fn snapshot(&self) -> Vec<LogEvent> {
        self.events.read().iter().cloned().collect()
    }

    fn get(&self, index: usize) -> Option<LogEvent> {
        self.events.read().get(index).cloned()
    }

    fn len(&self) -> usize {
        self.events.read().len()
    }
}
