//! Event sink.
//!
//! Rather than printing from inside mutators and hooks, the engine queues short human-readable
//! messages here; the presentation layer drains them once per frame. The buffer is bounded by
//! `capacity` (default [`DEFAULT_CAPACITY`]); when full, the oldest message is dropped.
use std::collections::VecDeque;
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CAPACITY: usize = 256;

/// Hint for how a presenter might style a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Info,
    Important,
    Sound,
    Animation,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub kind: MessageKind,
}

impl Message {
    pub fn new(text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Append-only FIFO of messages awaiting display.
#[derive(Debug, Clone)]
pub struct EventSink {
    capacity: usize,
    queue: VecDeque<Message>,
    dropped: usize,
}

impl Default for EventSink {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink holding at most `capacity` messages (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            queue: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            dropped: 0,
        }
    }

    /// Queue an informational message.
    pub fn push(&mut self, text: impl Into<String>) {
        self.push_kind(text, MessageKind::Info);
    }

    /// Queue a message with an explicit kind.
    pub fn push_kind(&mut self, text: impl Into<String>, kind: MessageKind) {
        if self.queue.len() == self.capacity {
            self.queue.pop_front();
            self.dropped += 1;
            warn!("event sink full ({} messages); dropped oldest message", self.capacity);
        }
        self.queue.push_back(Message::new(text, kind));
    }

    /// Take every buffered message in arrival order, leaving the sink empty.
    pub fn drain(&mut self) -> Vec<Message> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of messages discarded because the sink was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_order_and_empties() {
        let mut sink = EventSink::new();
        sink.push("one");
        sink.push_kind("two", MessageKind::Important);

        let drained = sink.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].text, "one");
        assert_eq!(drained[1].kind, MessageKind::Important);
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn full_sink_drops_oldest() {
        let mut sink = EventSink::with_capacity(2);
        sink.push("a");
        sink.push("b");
        sink.push("c");

        assert_eq!(sink.dropped(), 1);
        let texts: Vec<_> = sink.drain().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut sink = EventSink::with_capacity(0);
        sink.push("kept");
        assert_eq!(sink.capacity(), 1);
        assert_eq!(sink.len(), 1);
    }
}
