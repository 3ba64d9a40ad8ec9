//! Streaming token coalescing
//!
//! Raw token events can arrive many times per second per agent. The
//! batcher accumulates them per agent and releases one store update per
//! flush interval, capping re-render frequency regardless of delivery
//! rate. Time is injected by the caller so the logic stays deterministic.

use std::collections::HashMap;

/// Flush cadence for buffered tokens.
pub const FLUSH_INTERVAL_MS: i64 = 50;

#[derive(Debug, Clone, Default)]
struct PendingTokens {
    text: String,
    count: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TokenBatcher {
    buffers: HashMap<String, PendingTokens>,
    last_flush_ms: i64,
}

impl TokenBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer one token. The first token after an idle period anchors the
    /// flush clock so a lone token is not flushed immediately.
    pub fn push(&mut self, agent_id: &str, token: &str, now_ms: i64) {
        if self.buffers.is_empty() {
            self.last_flush_ms = now_ms;
        }
        let pending = self.buffers.entry(agent_id.to_string()).or_default();
        pending.text.push_str(token);
        pending.count += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Whether the flush interval has elapsed since the last flush.
    pub fn should_flush(&self, now_ms: i64) -> bool {
        !self.buffers.is_empty() && now_ms - self.last_flush_ms >= FLUSH_INTERVAL_MS
    }

    /// Take every pending buffer, sorted by agent id for deterministic
    /// application order. Resets the flush clock.
    pub fn drain(&mut self, now_ms: i64) -> Vec<(String, String, u64)> {
        self.last_flush_ms = now_ms;
        let mut drained: Vec<(String, String, u64)> = self
            .buffers
            .drain()
            .map(|(agent, pending)| (agent, pending.text, pending.count))
            .collect();
        drained.sort_by(|a, b| a.0.cmp(&b.0));
        drained
    }

    /// Take the buffer for one agent, leaving the rest untouched. Used
    /// when that agent completes and its content must be final.
    pub fn drain_agent(&mut self, agent_id: &str) -> Option<(String, u64)> {
        self.buffers
            .remove(agent_id)
            .map(|pending| (pending.text, pending.count))
    }

    /// Discard everything without applying. Used on reset.
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.last_flush_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_within_interval_do_not_flush() {
        let mut batcher = TokenBatcher::new();
        for i in 0..100 {
            batcher.push("x", "t", 1_000 + i / 10);
        }
        assert!(!batcher.should_flush(1_010));
        assert!(batcher.should_flush(1_000 + FLUSH_INTERVAL_MS));
    }

    #[test]
    fn drain_concatenates_in_arrival_order() {
        let mut batcher = TokenBatcher::new();
        batcher.push("x", "hel", 0);
        batcher.push("x", "lo", 1);
        batcher.push("a", "yo", 2);

        let drained = batcher.drain(50);
        assert_eq!(
            drained,
            vec![
                ("a".to_string(), "yo".to_string(), 1),
                ("x".to_string(), "hello".to_string(), 2),
            ]
        );
        assert!(batcher.is_empty());
    }

    #[test]
    fn drain_agent_leaves_other_buffers() {
        let mut batcher = TokenBatcher::new();
        batcher.push("x", "one", 0);
        batcher.push("y", "two", 0);

        assert_eq!(batcher.drain_agent("x"), Some(("one".to_string(), 1)));
        assert_eq!(batcher.drain_agent("x"), None);
        assert!(!batcher.is_empty());
    }

    #[test]
    fn first_token_after_idle_anchors_the_clock() {
        let mut batcher = TokenBatcher::new();
        batcher.push("x", "t", 10_000);
        // A large wall-clock value right after the first push must not
        // trigger an immediate flush of a single token.
        assert!(!batcher.should_flush(10_001));
    }
}
