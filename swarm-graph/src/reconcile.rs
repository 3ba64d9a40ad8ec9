//! Event reconciler
//!
//! Translates one ordered backend event into store mutations, touching
//! exactly the fields the event is about. Events are applied in arrival
//! order; the dedup key makes re-delivered events a no-op, which the
//! poll transport requires. Out-of-order delivery of genuinely distinct
//! events is not corrected here.

use std::collections::HashSet;

use swarm_types::{
    CompletionStatus, EventEnvelope, ExecEvent, NodeStatus, RunStatus, EDGE_SUCCESS,
};

use crate::batch::TokenBatcher;
use crate::store::GraphStore;

/// Legal status transitions. Terminal statuses only leave via an explicit
/// reset; `running -> needs-input -> running` covers the human-in-the-loop
/// pause.
fn can_transition(from: NodeStatus, to: NodeStatus) -> bool {
    use NodeStatus::*;
    matches!(
        (from, to),
        (Pending, Running)
            | (Running, Completed)
            | (Running, Failed)
            | (Running, NeedsInput)
            | (NeedsInput, Running)
    )
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    seen: HashSet<String>,
    batcher: TokenBatcher,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget dedup state and discard buffered tokens. Call when a new
    /// execution is loaded or the graph is reset.
    pub fn reset(&mut self) {
        self.seen.clear();
        self.batcher.clear();
    }

    /// Whether token buffers are waiting for a flush tick.
    pub fn has_pending_tokens(&self) -> bool {
        !self.batcher.is_empty()
    }

    /// Apply one event. Returns false when the event was already seen
    /// (re-delivered by the transport) and nothing changed.
    pub fn apply(&mut self, store: &mut GraphStore, envelope: &EventEnvelope, now_ms: i64) -> bool {
        if !self.seen.insert(envelope.dedup_key()) {
            tracing::debug!(key = %envelope.dedup_key(), "dropping re-delivered event");
            return false;
        }

        match &envelope.event {
            ExecEvent::AgentStarted {
                agent_id,
                timestamp,
            } => {
                if let Some(node) = store.node_mut(agent_id) {
                    if can_transition(node.status, NodeStatus::Running) {
                        node.status = NodeStatus::Running;
                    }
                    node.error = None;
                    if node.metrics.started_at.is_none() {
                        node.metrics.started_at = Some(*timestamp);
                    }
                }
            }

            ExecEvent::AgentIteration {
                agent_id,
                iteration,
                max_iterations,
                tools_in_use,
                timestamp,
            } => {
                if let Some(node) = store.node_mut(agent_id) {
                    let advanced = node
                        .progress
                        .map(|(n, _)| iteration >= &n)
                        .unwrap_or(true);
                    if advanced {
                        node.progress = Some((*iteration, *max_iterations));
                    }
                    for tool in tools_in_use {
                        if !node.used_tools.contains(tool) {
                            node.used_tools.push(tool.clone());
                        }
                    }
                    if node.status == NodeStatus::Running {
                        bump_elapsed(node, *timestamp);
                    }
                }
            }

            ExecEvent::Token { agent_id, token, .. } => {
                if store.node(agent_id).is_some() {
                    self.batcher.push(agent_id, token, now_ms);
                    if self.batcher.should_flush(now_ms) {
                        self.flush_tokens(store, now_ms);
                    }
                }
            }

            ExecEvent::ToolCalled {
                agent_id,
                tool_name,
                timestamp,
                ..
            } => {
                if let Some(node) = store.node_mut(agent_id) {
                    if !node.used_tools.contains(tool_name) {
                        node.used_tools.push(tool_name.clone());
                    }
                    if node.status == NodeStatus::Running {
                        node.metrics.tool_calls += 1;
                        bump_elapsed(node, *timestamp);
                    }
                }
            }

            ExecEvent::ToolResult {
                agent_id,
                tool_name,
                result,
                ..
            } => {
                if let Some(node) = store.node_mut(agent_id) {
                    let error = result
                        .get("error")
                        .and_then(|v| v.as_str())
                        .map(ToString::to_string);
                    // A failed tool call is a badge, not a node failure;
                    // only agent_completed(status=error) fails the node.
                    node.error = error.clone();
                    let tool = node.tool.get_or_insert_with(Default::default);
                    tool.name = tool_name.clone();
                    tool.result = Some(result.clone());
                    tool.error = error;
                }
            }

            ExecEvent::Handoff { from_id, to_id, .. } => {
                self.apply_handoff(store, from_id, to_id);
            }

            ExecEvent::AgentNeedsInput { agent_id, .. } => {
                if let Some(node) = store.node_mut(agent_id) {
                    if can_transition(node.status, NodeStatus::NeedsInput) {
                        node.status = NodeStatus::NeedsInput;
                    }
                }
            }

            ExecEvent::AgentCompleted {
                agent_id,
                status,
                final_content,
                tokens,
                error,
                timestamp,
            } => {
                // Complete the streamed content before freezing the node.
                if let Some((text, count)) = self.batcher.drain_agent(agent_id) {
                    if let Some(node) = store.node_mut(agent_id) {
                        node.content.push_str(&text);
                        node.metrics.tokens += count;
                    }
                }
                if let Some(node) = store.node_mut(agent_id) {
                    let target = match status {
                        CompletionStatus::Success => NodeStatus::Completed,
                        CompletionStatus::Error => NodeStatus::Failed,
                    };
                    // The poll transport may drop agent_started; synthesize
                    // the missing transition instead of wedging the node.
                    if node.status == NodeStatus::Pending {
                        node.status = NodeStatus::Running;
                    }
                    if can_transition(node.status, target) {
                        node.status = target;
                    }
                    if let Some(content) = final_content {
                        node.content = content.clone();
                    }
                    if let Some(tokens) = tokens {
                        node.metrics.tokens = node.metrics.tokens.max(*tokens);
                    }
                    if let Some(error) = error {
                        node.error = Some(error.clone());
                    }
                    bump_elapsed(node, *timestamp);
                }
            }

            ExecEvent::ExecutionCompleted { .. } => {
                self.flush_tokens(store, now_ms);
                store.set_run_status(RunStatus::Completed, None);
            }

            ExecEvent::ExecutionFailed { error, .. } => {
                self.flush_tokens(store, now_ms);
                store.set_run_status(RunStatus::Error, error.clone());
            }
        }

        true
    }

    /// Apply every buffered token run to the store. Called on the flush
    /// timer, on teardown, and before terminal transitions so no tail
    /// content is lost.
    pub fn flush_tokens(&mut self, store: &mut GraphStore, now_ms: i64) {
        for (agent_id, text, count) in self.batcher.drain(now_ms) {
            if let Some(node) = store.node_mut(&agent_id) {
                node.content.push_str(&text);
                node.metrics.tokens += count;
            }
        }
    }

    /// Mark the traversed edge completed and activate the next outgoing
    /// edge from the receiving agent, when one is resolvable.
    fn apply_handoff(&mut self, store: &mut GraphStore, from_id: &str, to_id: &str) {
        let traversed = best_edge_between(store, from_id, to_id);
        if let Some(edge_id) = traversed {
            if let Some(edge) = store.edge_mut(&edge_id) {
                edge.is_completed = true;
                edge.is_active = false;
            }
        } else {
            tracing::debug!(%from_id, %to_id, "handoff along a missing edge");
        }

        let next = next_outgoing_edge(store, to_id);
        if let Some(edge_id) = next {
            if let Some(edge) = store.edge_mut(&edge_id) {
                edge.is_active = true;
            }
        }
    }
}

/// The edge from `source` to `target`, preferring the `success` label when
/// several labels connect the same pair.
fn best_edge_between(store: &GraphStore, source: &str, target: &str) -> Option<String> {
    let mut candidates: Vec<&swarm_types::FlowEdge> = store
        .edges()
        .iter()
        .filter(|e| e.source == source && e.target == target)
        .collect();
    candidates.sort_by_key(|e| (e.label != EDGE_SUCCESS, e.label.clone()));
    candidates.first().map(|e| e.id.clone())
}

/// First outgoing edge from `source` in deterministic order.
fn next_outgoing_edge(store: &GraphStore, source: &str) -> Option<String> {
    let mut candidates: Vec<&swarm_types::FlowEdge> = store
        .edges()
        .iter()
        .filter(|e| e.source == source && !e.is_completed)
        .collect();
    candidates.sort_by_key(|e| (e.label != EDGE_SUCCESS, e.target.clone(), e.label.clone()));
    candidates.first().map(|e| e.id.clone())
}

fn bump_elapsed(node: &mut swarm_types::FlowNode, timestamp: i64) {
    if let Some(started) = node.metrics.started_at {
        let elapsed = (timestamp - started).max(0) as u64;
        node.metrics.elapsed_ms = node.metrics.elapsed_ms.max(elapsed);
    }
}

/// Rebuild the graph as it looked after the first `count` events, for
/// replay scrubbing. The live store is never mutated; scrubbing operates
/// on a soft-reset copy.
pub fn replay_prefix(base: &GraphStore, events: &[EventEnvelope], count: usize) -> GraphStore {
    let mut store = base.clone();
    store.soft_reset();
    let mut reconciler = Reconciler::new();
    let mut last_ts = 0;
    for envelope in events.iter().take(count) {
        last_ts = envelope.event.timestamp();
        reconciler.apply(&mut store, envelope, last_ts);
    }
    reconciler.flush_tokens(&mut store, last_ts);
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_types::AgentPlan;

    fn seeded_store(ids: &[&str]) -> GraphStore {
        let mut store = GraphStore::new();
        let agents: Vec<AgentPlan> = ids
            .iter()
            .map(|id| AgentPlan {
                id: id.to_string(),
                name: id.to_string(),
                role: None,
                tools: Vec::new(),
                depends_on: Vec::new(),
            })
            .collect();
        store.load_plan(&agents);
        store
    }

    fn started(agent: &str, ts: i64) -> EventEnvelope {
        EventEnvelope::new(ExecEvent::AgentStarted {
            agent_id: agent.to_string(),
            timestamp: ts,
        })
    }

    fn completed(agent: &str, ts: i64) -> EventEnvelope {
        EventEnvelope::new(ExecEvent::AgentCompleted {
            agent_id: agent.to_string(),
            status: CompletionStatus::Success,
            final_content: None,
            tokens: None,
            error: None,
            timestamp: ts,
        })
    }

    fn token(agent: &str, text: &str, ts: i64) -> EventEnvelope {
        EventEnvelope::new(ExecEvent::Token {
            agent_id: agent.to_string(),
            token: text.to_string(),
            timestamp: ts,
        })
    }

    #[test]
    fn agent_started_sets_running_and_clears_error() {
        let mut store = seeded_store(&["a"]);
        store.node_mut("a").unwrap().error = Some("stale".to_string());
        let mut rec = Reconciler::new();

        assert!(rec.apply(&mut store, &started("a", 1_000), 1_000));
        let node = store.node("a").unwrap();
        assert_eq!(node.status, NodeStatus::Running);
        assert_eq!(node.error, None);
        assert_eq!(node.metrics.started_at, Some(1_000));
    }

    #[test]
    fn duplicate_event_is_a_no_op() {
        let mut store = seeded_store(&["a"]);
        let mut rec = Reconciler::new();
        let event = started("a", 1_000);

        assert!(rec.apply(&mut store, &event, 1_000));
        let snapshot = store.nodes().to_vec();
        assert!(!rec.apply(&mut store, &event, 1_001));
        assert_eq!(store.nodes(), snapshot.as_slice());
    }

    #[test]
    fn completed_never_returns_to_running() {
        let mut store = seeded_store(&["a"]);
        let mut rec = Reconciler::new();
        rec.apply(&mut store, &started("a", 1_000), 1_000);
        rec.apply(&mut store, &completed("a", 2_000), 2_000);
        assert_eq!(store.node("a").unwrap().status, NodeStatus::Completed);

        rec.apply(&mut store, &started("a", 3_000), 3_000);
        assert_eq!(store.node("a").unwrap().status, NodeStatus::Completed);
    }

    #[test]
    fn needs_input_round_trip_is_allowed() {
        let mut store = seeded_store(&["a"]);
        let mut rec = Reconciler::new();
        rec.apply(&mut store, &started("a", 1_000), 1_000);
        rec.apply(
            &mut store,
            &EventEnvelope::new(ExecEvent::AgentNeedsInput {
                agent_id: "a".to_string(),
                prompt: None,
                timestamp: 2_000,
            }),
            2_000,
        );
        assert_eq!(store.node("a").unwrap().status, NodeStatus::NeedsInput);

        rec.apply(&mut store, &started("a", 3_000), 3_000);
        assert_eq!(store.node("a").unwrap().status, NodeStatus::Running);
    }

    #[test]
    fn hundred_tokens_coalesce_into_one_update() {
        let mut store = seeded_store(&["x"]);
        let mut rec = Reconciler::new();
        rec.apply(&mut store, &started("x", 0), 0);

        let expected: String = (0..100).map(|i| format!("t{i} ")).collect();
        for i in 0..100 {
            // All tokens land within 10ms of wall clock.
            rec.apply(&mut store, &token("x", &format!("t{i} "), i), i / 10);
        }
        // Nothing applied yet: the interval has not elapsed.
        assert!(store.node("x").unwrap().content.is_empty());
        assert!(rec.has_pending_tokens());

        rec.flush_tokens(&mut store, crate::batch::FLUSH_INTERVAL_MS);
        let node = store.node("x").unwrap();
        assert_eq!(node.content, expected);
        assert_eq!(node.metrics.tokens, 100);
        assert!(!rec.has_pending_tokens());
    }

    #[test]
    fn completion_drains_that_agents_buffer_first() {
        let mut store = seeded_store(&["a", "b"]);
        let mut rec = Reconciler::new();
        rec.apply(&mut store, &started("a", 0), 0);
        rec.apply(&mut store, &started("b", 0), 0);
        rec.apply(&mut store, &token("a", "tail", 1), 1);
        rec.apply(&mut store, &token("b", "other", 1), 1);

        rec.apply(&mut store, &completed("a", 2), 2);
        assert_eq!(store.node("a").unwrap().content, "tail");
        // b's buffer is still pending, untouched by a's completion.
        assert!(store.node("b").unwrap().content.is_empty());
        assert!(rec.has_pending_tokens());
    }

    #[test]
    fn tool_result_error_is_a_badge_not_a_failure() {
        let mut store = seeded_store(&["a"]);
        let mut rec = Reconciler::new();
        rec.apply(&mut store, &started("a", 0), 0);
        rec.apply(
            &mut store,
            &EventEnvelope::new(ExecEvent::ToolResult {
                agent_id: "a".to_string(),
                tool_name: "search".to_string(),
                result: serde_json::json!({"error": "rate limited"}),
                timestamp: 1,
            }),
            1,
        );

        let node = store.node("a").unwrap();
        assert_eq!(node.status, NodeStatus::Running);
        assert_eq!(node.error.as_deref(), Some("rate limited"));
    }

    #[test]
    fn handoff_completes_edge_and_activates_next() {
        let mut store = seeded_store(&["a", "b", "c"]);
        store.connect("a", "b", None).unwrap();
        store.connect("b", "c", None).unwrap();
        let mut rec = Reconciler::new();

        rec.apply(
            &mut store,
            &EventEnvelope::new(ExecEvent::Handoff {
                from_id: "a".to_string(),
                to_id: "b".to_string(),
                reason: None,
                timestamp: 5,
            }),
            5,
        );

        let ab = store.edge("a->b:success").unwrap();
        assert!(ab.is_completed);
        assert!(!ab.is_active);
        assert!(store.edge("b->c:success").unwrap().is_active);
    }

    #[test]
    fn metrics_freeze_once_completed() {
        let mut store = seeded_store(&["a"]);
        let mut rec = Reconciler::new();
        rec.apply(&mut store, &started("a", 0), 0);
        rec.apply(
            &mut store,
            &EventEnvelope::new(ExecEvent::ToolCalled {
                agent_id: "a".to_string(),
                tool_name: "search".to_string(),
                params: serde_json::Value::Null,
                timestamp: 1,
            }),
            1,
        );
        rec.apply(&mut store, &completed("a", 2), 2);
        let frozen = store.node("a").unwrap().metrics.clone();

        rec.apply(
            &mut store,
            &EventEnvelope::new(ExecEvent::ToolCalled {
                agent_id: "a".to_string(),
                tool_name: "browse".to_string(),
                params: serde_json::Value::Null,
                timestamp: 9,
            }),
            9,
        );
        assert_eq!(store.node("a").unwrap().metrics.tool_calls, frozen.tool_calls);
    }

    #[test]
    fn execution_terminal_events_update_the_run_record() {
        let mut store = seeded_store(&["a"]);
        let mut rec = Reconciler::new();
        rec.apply(
            &mut store,
            &EventEnvelope::new(ExecEvent::ExecutionFailed {
                error: Some("provider quota".to_string()),
                timestamp: 1,
            }),
            1,
        );
        assert_eq!(store.run_status(), RunStatus::Error);
        assert_eq!(store.run_error(), Some("provider quota"));
        assert_eq!(store.nodes().len(), 1);
    }

    #[test]
    fn replay_prefix_rebuilds_without_touching_the_live_store() {
        let mut store = seeded_store(&["a", "b"]);
        store.connect("a", "b", None).unwrap();
        let events = vec![
            started("a", 0),
            token("a", "hello", 1),
            completed("a", 2),
            started("b", 3),
        ];
        let mut rec = Reconciler::new();
        for env in &events {
            rec.apply(&mut store, env, env.event.timestamp());
        }
        rec.flush_tokens(&mut store, 100);

        let half = replay_prefix(&store, &events, 2);
        assert_eq!(half.node("a").unwrap().status, NodeStatus::Running);
        assert_eq!(half.node("a").unwrap().content, "hello");
        assert_eq!(half.node("b").unwrap().status, NodeStatus::Pending);

        // Live store untouched by the replay build.
        assert_eq!(store.node("a").unwrap().status, NodeStatus::Completed);
        assert_eq!(store.node("b").unwrap().status, NodeStatus::Running);
    }
}
