//! Shared types between the console UI and the swarm backend
//!
//! These types are used by both:
//! - the algorithmic core (`swarm-graph`, native Rust)
//! - Dioxus components (`swarm-ui`, WASM)
//!
//! Serializable with serde for JSON over the poll/HTTP transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Geometry
// ============================================================================

/// A point in diagram coordinate space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rendered size of a node, read by the layout engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: 180.0,
            height: 72.0,
        }
    }
}

/// Camera state for the diagram: pan offset plus zoom factor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

// ============================================================================
// Graph Model
// ============================================================================

/// The fixed set of block variants a node can be.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Agent,
    ToolCall,
    Decision,
    Validation,
    Transform,
    ParallelFork,
    ParallelJoin,
    Loop,
    HumanInput,
    Start,
    End,
}

impl NodeKind {
    pub const ALL: [NodeKind; 11] = [
        NodeKind::Agent,
        NodeKind::ToolCall,
        NodeKind::Decision,
        NodeKind::Validation,
        NodeKind::Transform,
        NodeKind::ParallelFork,
        NodeKind::ParallelJoin,
        NodeKind::Loop,
        NodeKind::HumanInput,
        NodeKind::Start,
        NodeKind::End,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Agent => "Agent",
            NodeKind::ToolCall => "Tool Call",
            NodeKind::Decision => "Decision",
            NodeKind::Validation => "Validation",
            NodeKind::Transform => "Transform",
            NodeKind::ParallelFork => "Parallel Fork",
            NodeKind::ParallelJoin => "Parallel Join",
            NodeKind::Loop => "Loop",
            NodeKind::HumanInput => "Human Input",
            NodeKind::Start => "Start",
            NodeKind::End => "End",
        }
    }
}

/// Execution status of a node. Driven exclusively by the event reconciler;
/// user edits never touch this field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NodeStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    NeedsInput,
}

impl NodeStatus {
    /// Terminal statuses only leave via an explicit reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Failed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Completed => "completed",
            NodeStatus::Failed => "failed",
            NodeStatus::NeedsInput => "needs input",
        }
    }
}

/// Monotonic execution counters for one node. Never decreased while the
/// node is running; frozen once it leaves `Running`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NodeMetrics {
    pub tokens: u64,
    pub tool_calls: u32,
    pub elapsed_ms: u64,
    pub cost_usd: f64,
    /// Wall-clock ms of the `agent_started` event, used to derive
    /// `elapsed_ms` from later event timestamps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
}

/// Tool metadata carried by `tool-call` nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ToolInfo {
    pub name: String,
    /// Declared parameter schema (JSON Schema).
    pub schema: serde_json::Value,
    /// Current parameter values. User-editable while the node is pending.
    pub params: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// One agent, tool invocation, or control-flow block in the execution graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowNode {
    /// Stable unique id; never changes after creation.
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub description: String,
    pub position: Position,
    pub size: Size,
    pub status: NodeStatus,
    pub metrics: NodeMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolInfo>,
    /// Tools the plan declared for this node.
    #[serde(default)]
    pub planned_tools: Vec<String>,
    /// Tools actually invoked so far.
    #[serde(default)]
    pub used_tools: Vec<String>,
    /// Streaming content buffer, appended to by batched token flushes.
    #[serde(default)]
    pub content: String,
    /// Last transient or fatal error reported for this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Progress through the agent loop as (iteration, max_iterations).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<(u32, u32)>,
}

impl FlowNode {
    pub fn new(kind: NodeKind, label: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), kind, label)
    }

    pub fn with_id(id: impl Into<String>, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            description: String::new(),
            position: Position::default(),
            size: Size::default(),
            status: NodeStatus::default(),
            metrics: NodeMetrics::default(),
            tool: None,
            planned_tools: Vec::new(),
            used_tools: Vec::new(),
            content: String::new(),
            error: None,
            progress: None,
        }
    }

    /// Size derived from content: wide labels widen the card, description
    /// text and tool lists add rows. Committed into `size` by whoever edits
    /// the content; the layout engine only ever reads `size`.
    pub fn estimated_size(&self) -> Size {
        let width = 180.0_f64.max(120.0 + self.label.chars().count() as f64 * 4.0).min(260.0);
        let mut height = 72.0;
        if !self.description.is_empty() {
            height += 16.0;
        }
        if !self.planned_tools.is_empty() || !self.used_tools.is_empty() {
            height += 14.0;
        }
        if let Some(tool) = &self.tool {
            let params = tool.params.as_object().map(|m| m.len()).unwrap_or(0);
            height += params as f64 * 6.0;
        }
        Size { width, height }
    }

    /// Progress fraction in `[0, 1]`, if the agent loop reported one.
    pub fn progress_fraction(&self) -> Option<f32> {
        self.progress.and_then(|(n, max)| {
            if max == 0 {
                None
            } else {
                Some((n as f32 / max as f32).min(1.0))
            }
        })
    }
}

/// Edge label values with dedicated visual treatment.
pub const EDGE_SUCCESS: &str = "success";
pub const EDGE_FAILURE: &str = "failure";
pub const EDGE_RETRY: &str = "retry";
pub const EDGE_TIMEOUT: &str = "timeout";

/// Directed, labeled connection between two node ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Event name; defaults to [`EDGE_SUCCESS`].
    pub label: String,
    /// Currently traversed in the live run.
    #[serde(default)]
    pub is_active: bool,
    /// Traversed previously in this run.
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl FlowEdge {
    /// Edge ids are derived from the (source, target, label) triple, which
    /// also carries the at-most-one-edge-per-triple invariant.
    pub fn new(source: impl Into<String>, target: impl Into<String>, label: Option<&str>) -> Self {
        let source = source.into();
        let target = target.into();
        let label = label.unwrap_or(EDGE_SUCCESS).to_string();
        Self {
            id: format!("{source}->{target}:{label}"),
            source,
            target,
            label,
            is_active: false,
            is_completed: false,
            duration_ms: None,
        }
    }
}

// ============================================================================
// Execution Events
// ============================================================================

/// Completion status reported by `agent_completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Success,
    Error,
}

/// One backend execution event. Timestamps are wall-clock ms as reported
/// by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecEvent {
    AgentStarted {
        agent_id: String,
        timestamp: i64,
    },
    AgentIteration {
        agent_id: String,
        iteration: u32,
        max_iterations: u32,
        #[serde(default)]
        tools_in_use: Vec<String>,
        timestamp: i64,
    },
    Token {
        agent_id: String,
        token: String,
        timestamp: i64,
    },
    ToolCalled {
        agent_id: String,
        tool_name: String,
        #[serde(default)]
        params: serde_json::Value,
        timestamp: i64,
    },
    ToolResult {
        agent_id: String,
        tool_name: String,
        #[serde(default)]
        result: serde_json::Value,
        timestamp: i64,
    },
    Handoff {
        from_id: String,
        to_id: String,
        #[serde(default)]
        reason: Option<String>,
        timestamp: i64,
    },
    AgentNeedsInput {
        agent_id: String,
        #[serde(default)]
        prompt: Option<String>,
        timestamp: i64,
    },
    AgentCompleted {
        agent_id: String,
        status: CompletionStatus,
        #[serde(default)]
        final_content: Option<String>,
        #[serde(default)]
        tokens: Option<u64>,
        #[serde(default)]
        error: Option<String>,
        timestamp: i64,
    },
    ExecutionCompleted {
        timestamp: i64,
    },
    ExecutionFailed {
        #[serde(default)]
        error: Option<String>,
        timestamp: i64,
    },
}

impl ExecEvent {
    pub fn kind_str(&self) -> &'static str {
        match self {
            ExecEvent::AgentStarted { .. } => "agent_started",
            ExecEvent::AgentIteration { .. } => "agent_iteration",
            ExecEvent::Token { .. } => "token",
            ExecEvent::ToolCalled { .. } => "tool_called",
            ExecEvent::ToolResult { .. } => "tool_result",
            ExecEvent::Handoff { .. } => "handoff",
            ExecEvent::AgentNeedsInput { .. } => "agent_needs_input",
            ExecEvent::AgentCompleted { .. } => "agent_completed",
            ExecEvent::ExecutionCompleted { .. } => "execution_completed",
            ExecEvent::ExecutionFailed { .. } => "execution_failed",
        }
    }

    /// The agent the event is about, if any.
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            ExecEvent::AgentStarted { agent_id, .. }
            | ExecEvent::AgentIteration { agent_id, .. }
            | ExecEvent::Token { agent_id, .. }
            | ExecEvent::ToolCalled { agent_id, .. }
            | ExecEvent::ToolResult { agent_id, .. }
            | ExecEvent::AgentNeedsInput { agent_id, .. }
            | ExecEvent::AgentCompleted { agent_id, .. } => Some(agent_id),
            ExecEvent::Handoff { from_id, .. } => Some(from_id),
            ExecEvent::ExecutionCompleted { .. } | ExecEvent::ExecutionFailed { .. } => None,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            ExecEvent::AgentStarted { timestamp, .. }
            | ExecEvent::AgentIteration { timestamp, .. }
            | ExecEvent::Token { timestamp, .. }
            | ExecEvent::ToolCalled { timestamp, .. }
            | ExecEvent::ToolResult { timestamp, .. }
            | ExecEvent::Handoff { timestamp, .. }
            | ExecEvent::AgentNeedsInput { timestamp, .. }
            | ExecEvent::AgentCompleted { timestamp, .. }
            | ExecEvent::ExecutionCompleted { timestamp }
            | ExecEvent::ExecutionFailed { timestamp, .. } => *timestamp,
        }
    }
}

/// Event plus transport metadata. The poll transport redelivers events
/// across successive polls, so every envelope resolves to a dedup key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventEnvelope {
    /// Server-supplied event id, preferred for dedup when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(flatten)]
    pub event: ExecEvent,
}

impl EventEnvelope {
    pub fn new(event: ExecEvent) -> Self {
        Self {
            event_id: None,
            event,
        }
    }

    /// Key used to detect re-delivered events: the server id when present,
    /// otherwise derived from (type, timestamp, agent).
    pub fn dedup_key(&self) -> String {
        if let Some(id) = &self.event_id {
            return id.clone();
        }
        format!(
            "{}:{}:{}",
            self.event.kind_str(),
            self.event.timestamp(),
            self.event.agent_id().unwrap_or("")
        )
    }
}

// ============================================================================
// Poll API Payloads
// ============================================================================

/// Overall status of one execution/conversation as reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    AwaitingInput,
    Completed,
    Error,
}

impl RunStatus {
    /// Polling stops once the run reaches a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Error)
    }
}

/// One agent in the backend's initial execution plan, used to seed the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentPlan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    /// Ids of agents this one consumes output from.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Artifact produced during an execution (report, file, screenshot).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// `GET /swarm/status/{session_id}` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmStatusResponse {
    pub success: bool,
    pub status: RunStatus,
    #[serde(default)]
    pub events: Vec<EventEnvelope>,
    #[serde(default)]
    pub agents: Vec<AgentPlan>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

/// Chat message inside a conversation session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionMessage {
    pub id: String,
    pub role: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Citation source attached to a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub title: String,
    pub url: String,
}

/// `GET /conversation/status/{session_id}` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationStatusResponse {
    pub success: bool,
    pub status: RunStatus,
    #[serde(default)]
    pub messages: Vec<SessionMessage>,
    #[serde(default)]
    pub thoughts: Vec<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub screenshots: Vec<String>,
    #[serde(default)]
    pub progress: Option<f32>,
    #[serde(default)]
    pub awaiting_response: bool,
}

/// One row of `GET /conversation/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: RunStatus,
}

/// Downloadable session snapshot. A convenience export, not a format with
/// compatibility guarantees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExport {
    pub session_id: String,
    pub messages: Vec<SessionMessage>,
    pub sources: Vec<Source>,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Persisted Layouts
// ============================================================================

/// Saved position of one node within a persisted layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedNodePosition {
    pub id: String,
    pub position: Position,
}

/// Node positions + viewport for one execution id, stored in browser-local
/// storage. Last write wins per execution id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedLayout {
    pub execution_id: String,
    pub nodes: Vec<SavedNodePosition>,
    pub viewport: Viewport,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&NodeKind::ToolCall).unwrap();
        assert_eq!(json, "\"tool-call\"");
        let json = serde_json::to_string(&NodeKind::ParallelFork).unwrap();
        assert_eq!(json, "\"parallel-fork\"");
    }

    #[test]
    fn node_status_serializes_kebab_case() {
        let json = serde_json::to_string(&NodeStatus::NeedsInput).unwrap();
        assert_eq!(json, "\"needs-input\"");
    }

    #[test]
    fn exec_event_uses_snake_case_type_tag() {
        let event = ExecEvent::AgentStarted {
            agent_id: "researcher".to_string(),
            timestamp: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "agent_started");
        assert_eq!(json["agent_id"], "researcher");

        let back: ExecEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn envelope_prefers_server_event_id_for_dedup() {
        let event = ExecEvent::Token {
            agent_id: "a1".to_string(),
            token: "hi".to_string(),
            timestamp: 42,
        };
        let mut env = EventEnvelope::new(event);
        assert_eq!(env.dedup_key(), "token:42:a1");

        env.event_id = Some("evt_7".to_string());
        assert_eq!(env.dedup_key(), "evt_7");
    }

    #[test]
    fn handoff_dedup_key_uses_from_agent() {
        let env = EventEnvelope::new(ExecEvent::Handoff {
            from_id: "a1".to_string(),
            to_id: "a2".to_string(),
            reason: None,
            timestamp: 10,
        });
        assert_eq!(env.dedup_key(), "handoff:10:a1");
    }

    #[test]
    fn edge_id_is_derived_from_triple() {
        let edge = FlowEdge::new("a", "b", None);
        assert_eq!(edge.label, EDGE_SUCCESS);
        assert_eq!(edge.id, "a->b:success");

        let retry = FlowEdge::new("a", "b", Some(EDGE_RETRY));
        assert_ne!(retry.id, edge.id);
    }

    #[test]
    fn node_ids_are_unique() {
        let n1 = FlowNode::new(NodeKind::Agent, "one");
        let n2 = FlowNode::new(NodeKind::Agent, "two");
        assert_ne!(n1.id, n2.id);
    }

    #[test]
    fn progress_fraction_guards_zero_max() {
        let mut node = FlowNode::new(NodeKind::Agent, "a");
        assert_eq!(node.progress_fraction(), None);
        node.progress = Some((2, 0));
        assert_eq!(node.progress_fraction(), None);
        node.progress = Some((2, 4));
        assert_eq!(node.progress_fraction(), Some(0.5));
    }

    #[test]
    fn estimated_size_grows_with_content() {
        let bare = FlowNode::new(NodeKind::Agent, "a");
        let mut rich = FlowNode::new(NodeKind::Agent, "a much longer agent label");
        rich.description = "writes the report".to_string();
        rich.planned_tools = vec!["search".to_string()];

        let bare_size = bare.estimated_size();
        let rich_size = rich.estimated_size();
        assert!(rich_size.width > bare_size.width);
        assert!(rich_size.height > bare_size.height);
    }

    #[test]
    fn terminal_statuses() {
        assert!(NodeStatus::Completed.is_terminal());
        assert!(NodeStatus::Failed.is_terminal());
        assert!(!NodeStatus::NeedsInput.is_terminal());
        assert!(RunStatus::Error.is_terminal());
        assert!(!RunStatus::AwaitingInput.is_terminal());
    }

    #[test]
    fn status_response_tolerates_missing_collections() {
        let resp: SwarmStatusResponse =
            serde_json::from_str(r#"{"success":true,"status":"running"}"#).unwrap();
        assert!(resp.events.is_empty());
        assert!(resp.agents.is_empty());
    }
}
