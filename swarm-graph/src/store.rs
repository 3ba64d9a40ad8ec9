//! Graph state store with undo/redo
//!
//! Single source of truth for the node/edge set. Every mutation goes
//! through here so the history invariant holds: structural edits push a
//! snapshot, runtime status/metric updates from the reconciler do not.

use std::collections::{HashMap, HashSet, VecDeque};

use swarm_types::{
    AgentPlan, FlowEdge, FlowNode, NodeKind, NodeStatus, Position, RunStatus, Size,
};

use crate::error::GraphError;

/// Undo depth. Oldest snapshots are dropped first once exceeded.
const MAX_HISTORY: usize = 100;

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
}

/// Structural edit to a node's user-owned content fields. Absent fields are
/// left untouched.
#[derive(Debug, Clone, Default)]
pub struct NodeEdit {
    pub label: Option<String>,
    pub description: Option<String>,
    /// Applied only while the node is still pending; parameters are
    /// read-only once execution has touched the node.
    pub tool_params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphStore {
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
    selection: HashSet<String>,
    /// Element ids (nodes and edges) of the currently highlighted component.
    highlight: Option<HashSet<String>>,
    run_status: RunStatus,
    run_error: Option<String>,
    history: Vec<Snapshot>,
    history_index: usize,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            selection: HashSet::new(),
            highlight: None,
            run_status: RunStatus::Idle,
            run_error: None,
            history: vec![Snapshot {
                nodes: Vec::new(),
                edges: Vec::new(),
            }],
            history_index: 0,
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&FlowEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn run_status(&self) -> RunStatus {
        self.run_status
    }

    pub fn run_error(&self) -> Option<&str> {
        self.run_error.as_deref()
    }

    // ------------------------------------------------------------------
    // Runtime-state path (reconciler)
    // ------------------------------------------------------------------

    /// Mutable node access for status/metric updates. Bypasses history:
    /// execution progress is not something undo rolls back.
    pub fn node_mut(&mut self, id: &str) -> Option<&mut FlowNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn edge_mut(&mut self, id: &str) -> Option<&mut FlowEdge> {
        self.edges.iter_mut().find(|e| e.id == id)
    }

    pub fn edges_mut(&mut self) -> &mut [FlowEdge] {
        &mut self.edges
    }

    /// Run record updates come from the reconciler only.
    pub fn set_run_status(&mut self, status: RunStatus, error: Option<String>) {
        self.run_status = status;
        self.run_error = error;
    }

    // ------------------------------------------------------------------
    // Structural mutations (history-tracked)
    // ------------------------------------------------------------------

    /// Add a user-created block. Returns the new node id.
    pub fn add_node(&mut self, kind: NodeKind, position: Option<Position>) -> String {
        let ordinal = self.nodes.iter().filter(|n| n.kind == kind).count() + 1;
        let mut node = FlowNode::new(kind, format!("{} {}", kind.label(), ordinal));
        if let Some(position) = position {
            node.position = position;
        }
        node.size = node.estimated_size();
        let id = node.id.clone();
        self.nodes.push(node);
        self.push_history();
        id
    }

    /// Delete a node and every edge referencing it. Deleting an unknown id
    /// is a silent no-op.
    pub fn delete_node(&mut self, id: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        if self.nodes.len() == before {
            return false;
        }
        self.edges.retain(|e| e.source != id && e.target != id);
        self.selection.remove(id);
        self.highlight = None;
        self.push_history();
        true
    }

    /// Connect two existing nodes. Rejects self-loops and duplicate
    /// (source, target, label) triples. Returns the new edge id.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        label: Option<&str>,
    ) -> Result<String, GraphError> {
        if source == target {
            return Err(GraphError::SelfLoop(source.to_string()));
        }
        if self.node(source).is_none() {
            return Err(GraphError::UnknownNode(source.to_string()));
        }
        if self.node(target).is_none() {
            return Err(GraphError::UnknownNode(target.to_string()));
        }
        let edge = FlowEdge::new(source, target, label);
        if self
            .edges
            .iter()
            .any(|e| e.source == edge.source && e.target == edge.target && e.label == edge.label)
        {
            return Err(GraphError::DuplicateEdge {
                from: edge.source,
                target: edge.target,
                label: edge.label,
            });
        }
        let id = edge.id.clone();
        self.edges.push(edge);
        self.push_history();
        Ok(id)
    }

    /// Remove an edge by id. Unknown ids are a silent no-op.
    pub fn disconnect(&mut self, edge_id: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e.id != edge_id);
        if self.edges.len() == before {
            return false;
        }
        self.highlight = None;
        self.push_history();
        true
    }

    /// Relabel an edge. The edge id is re-derived from the new triple, and
    /// the duplicate-triple invariant is enforced against the new label.
    pub fn relabel_edge(&mut self, edge_id: &str, label: &str) -> Result<String, GraphError> {
        let Some(index) = self.edges.iter().position(|e| e.id == edge_id) else {
            return Err(GraphError::UnknownEdge(edge_id.to_string()));
        };
        let (source, target) = {
            let edge = &self.edges[index];
            if edge.label == label {
                return Ok(edge.id.clone());
            }
            (edge.source.clone(), edge.target.clone())
        };
        if self
            .edges
            .iter()
            .any(|e| e.source == source && e.target == target && e.label == label)
        {
            return Err(GraphError::DuplicateEdge {
                from: source,
                target,
                label: label.to_string(),
            });
        }
        let edge = &mut self.edges[index];
        edge.label = label.to_string();
        edge.id = format!("{}->{}:{}", edge.source, edge.target, edge.label);
        let id = edge.id.clone();
        self.push_history();
        Ok(id)
    }

    /// Edit user-owned content fields. Returns false for unknown ids.
    pub fn update_node_data(&mut self, id: &str, edit: NodeEdit) -> bool {
        let editable = self
            .node(id)
            .map(|n| n.status == NodeStatus::Pending)
            .unwrap_or(false);
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if let Some(label) = edit.label {
            node.label = label;
        }
        if let Some(description) = edit.description {
            node.description = description;
        }
        if let Some(params) = edit.tool_params {
            if editable {
                if let Some(tool) = node.tool.as_mut() {
                    tool.params = params;
                }
            }
        }
        node.size = node.estimated_size();
        self.push_history();
        true
    }

    /// Remove everything. Undo restores the previous graph.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.selection.clear();
        self.highlight = None;
        self.run_status = RunStatus::Idle;
        self.run_error = None;
        self.push_history();
    }

    /// Reset execution state while keeping the structure, for rerunning the
    /// same graph. Not a history entry.
    pub fn soft_reset(&mut self) {
        for node in &mut self.nodes {
            node.status = NodeStatus::Pending;
            node.metrics = Default::default();
            node.content.clear();
            node.error = None;
            node.progress = None;
            node.used_tools.clear();
            if let Some(tool) = node.tool.as_mut() {
                tool.result = None;
                tool.error = None;
            }
        }
        for edge in &mut self.edges {
            edge.is_active = false;
            edge.is_completed = false;
            edge.duration_ms = None;
        }
        self.run_status = RunStatus::Idle;
        self.run_error = None;
    }

    /// Replace the graph wholesale with the backend's initial plan and
    /// start history from a fresh baseline.
    pub fn load_plan(&mut self, agents: &[AgentPlan]) {
        self.nodes = agents
            .iter()
            .map(|agent| {
                let mut node = FlowNode::with_id(agent.id.clone(), NodeKind::Agent, &agent.name);
                node.description = agent.role.clone().unwrap_or_default();
                node.planned_tools = agent.tools.clone();
                node.size = node.estimated_size();
                node
            })
            .collect();

        let known: HashSet<&str> = agents.iter().map(|a| a.id.as_str()).collect();
        self.edges = Vec::new();
        for agent in agents {
            for dep in &agent.depends_on {
                if !known.contains(dep.as_str()) || dep == &agent.id {
                    continue;
                }
                let edge = FlowEdge::new(dep.clone(), agent.id.clone(), None);
                if !self.edges.iter().any(|e| e.id == edge.id) {
                    self.edges.push(edge);
                }
            }
        }

        self.selection.clear();
        self.highlight = None;
        self.run_status = RunStatus::Idle;
        self.run_error = None;
        self.history = vec![Snapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }];
        self.history_index = 0;
    }

    // ------------------------------------------------------------------
    // Positions and sizes (not history-tracked)
    // ------------------------------------------------------------------

    /// Direct user drag or layout output. Position changes are not undo
    /// entries.
    pub fn set_node_position(&mut self, id: &str, position: Position) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    /// Copy positions from a layout result by node id.
    pub fn apply_positions(&mut self, positioned: &[FlowNode]) {
        let map: HashMap<&str, Position> = positioned
            .iter()
            .map(|n| (n.id.as_str(), n.position))
            .collect();
        for node in &mut self.nodes {
            if let Some(position) = map.get(node.id.as_str()) {
                node.position = *position;
            }
        }
    }

    /// Committed measured size from the render pass. The layout engine only
    /// ever reads sizes from the node set, never measures.
    pub fn set_node_size(&mut self, id: &str, size: Size) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.size = size;
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Undo / redo
    // ------------------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        self.history_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.history_index + 1 < self.history.len()
    }

    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.history_index -= 1;
        self.restore_snapshot();
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.history_index += 1;
        self.restore_snapshot();
        true
    }

    fn restore_snapshot(&mut self) {
        let snapshot = &self.history[self.history_index];
        self.nodes = snapshot.nodes.clone();
        self.edges = snapshot.edges.clone();
        let ids: HashSet<String> = self.nodes.iter().map(|n| n.id.clone()).collect();
        self.selection.retain(|id| ids.contains(id));
        self.highlight = None;
    }

    fn push_history(&mut self) {
        self.history.truncate(self.history_index + 1);
        self.history.push(Snapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        });
        self.history_index = self.history.len() - 1;
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
            self.history_index -= excess;
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn selection(&self) -> &HashSet<String> {
        &self.selection
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    pub fn select_only(&mut self, id: &str) {
        if self.node(id).is_some() {
            self.selection.clear();
            self.selection.insert(id.to_string());
        }
    }

    pub fn toggle_selected(&mut self, id: &str) {
        if !self.selection.remove(id) && self.node(id).is_some() {
            self.selection.insert(id.to_string());
        }
    }

    pub fn select_all(&mut self) {
        self.selection = self.nodes.iter().map(|n| n.id.clone()).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Delete every selected node (edges cascade). One history entry for
    /// the whole batch, so a single undo restores it.
    pub fn delete_selected(&mut self) -> usize {
        if self.selection.is_empty() {
            return 0;
        }
        let doomed = std::mem::take(&mut self.selection);
        let before = self.nodes.len();
        self.nodes.retain(|n| !doomed.contains(&n.id));
        let removed = before - self.nodes.len();
        if removed == 0 {
            return 0;
        }
        self.edges
            .retain(|e| !doomed.contains(&e.source) && !doomed.contains(&e.target));
        self.highlight = None;
        self.push_history();
        removed
    }

    // ------------------------------------------------------------------
    // Path highlighting
    // ------------------------------------------------------------------

    /// Highlight the maximal connected component containing the given edge
    /// (edges treated as bidirectional for reachability). Everything else
    /// renders dimmed until cleared.
    pub fn highlight_component_from_edge(&mut self, edge_id: &str) -> bool {
        let Some(edge) = self.edge(edge_id) else {
            return false;
        };
        let start = edge.source.clone();
        self.highlight = Some(self.connected_component(&start));
        true
    }

    /// Same flood, seeded from a node.
    pub fn highlight_component_from_node(&mut self, node_id: &str) -> bool {
        if self.node(node_id).is_none() {
            return false;
        }
        self.highlight = Some(self.connected_component(node_id));
        true
    }

    pub fn clear_highlight(&mut self) {
        self.highlight = None;
    }

    pub fn has_highlight(&self) -> bool {
        self.highlight.is_some()
    }

    /// Whether an element (node or edge id) is part of the highlighted
    /// component. With no highlight active, everything is at full opacity.
    pub fn is_highlighted(&self, id: &str) -> bool {
        match &self.highlight {
            Some(component) => component.contains(id),
            None => true,
        }
    }

    fn connected_component(&self, start: &str) -> HashSet<String> {
        let mut component: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        component.insert(start.to_string());
        queue.push_back(start.to_string());

        while let Some(current) = queue.pop_front() {
            for edge in &self.edges {
                let neighbor = if edge.source == current {
                    Some(&edge.target)
                } else if edge.target == current {
                    Some(&edge.source)
                } else {
                    None
                };
                if let Some(neighbor) = neighbor {
                    component.insert(edge.id.clone());
                    if component.insert(neighbor.clone()) {
                        queue.push_back(neighbor.clone());
                    }
                }
            }
        }
        component
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_types::EDGE_RETRY;

    fn store_with(ids: &[&str]) -> GraphStore {
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

    #[test]
    fn connect_rejects_self_loops_and_unknown_nodes() {
        let mut store = store_with(&["a", "b"]);
        assert_eq!(
            store.connect("a", "a", None),
            Err(GraphError::SelfLoop("a".to_string()))
        );
        assert_eq!(
            store.connect("a", "ghost", None),
            Err(GraphError::UnknownNode("ghost".to_string()))
        );
        assert!(store.connect("a", "b", None).is_ok());
    }

    #[test]
    fn connect_rejects_duplicate_triple_but_allows_new_label() {
        let mut store = store_with(&["a", "b"]);
        store.connect("a", "b", None).unwrap();
        assert!(matches!(
            store.connect("a", "b", None),
            Err(GraphError::DuplicateEdge { .. })
        ));
        assert!(store.connect("a", "b", Some(EDGE_RETRY)).is_ok());
        assert_eq!(store.edges().len(), 2);
    }

    #[test]
    fn delete_cascades_edges() {
        let mut store = store_with(&["a", "b", "c"]);
        store.connect("a", "b", None).unwrap();
        store.connect("b", "c", None).unwrap();

        assert!(store.delete_node("b"));
        let ids: Vec<&str> = store.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(store.edges().is_empty());
    }

    #[test]
    fn no_dangling_edges_after_any_sequence() {
        let mut store = store_with(&["a", "b", "c", "d"]);
        store.connect("a", "b", None).unwrap();
        store.connect("b", "c", None).unwrap();
        store.connect("c", "d", None).unwrap();
        store.delete_node("c");
        store.add_node(NodeKind::Decision, None);
        store.delete_node("a");

        for edge in store.edges() {
            assert!(store.node(&edge.source).is_some());
            assert!(store.node(&edge.target).is_some());
        }
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut store = store_with(&["a", "b"]);
        let before_nodes = store.nodes().to_vec();
        let before_edges = store.edges().to_vec();

        store.connect("a", "b", None).unwrap();
        let after_nodes = store.nodes().to_vec();
        let after_edges = store.edges().to_vec();

        assert!(store.undo());
        assert_eq!(store.nodes(), before_nodes.as_slice());
        assert_eq!(store.edges(), before_edges.as_slice());

        assert!(store.redo());
        assert_eq!(store.nodes(), after_nodes.as_slice());
        assert_eq!(store.edges(), after_edges.as_slice());
    }

    #[test]
    fn new_mutation_truncates_redo_entries() {
        let mut store = store_with(&["a", "b", "c"]);
        store.connect("a", "b", None).unwrap();
        store.connect("b", "c", None).unwrap();
        store.undo();
        assert!(store.can_redo());

        store.connect("a", "c", None).unwrap();
        assert!(!store.can_redo());
        assert_eq!(store.edges().len(), 2);
    }

    #[test]
    fn status_updates_are_not_history_entries() {
        let mut store = store_with(&["a"]);
        assert!(!store.can_undo());

        store.node_mut("a").unwrap().status = NodeStatus::Running;
        assert!(!store.can_undo());

        store.set_node_position("a", Position::new(10.0, 20.0));
        assert!(!store.can_undo());
    }

    #[test]
    fn soft_reset_keeps_structure_and_clears_runtime_state() {
        let mut store = store_with(&["a", "b"]);
        store.connect("a", "b", None).unwrap();
        {
            let node = store.node_mut("a").unwrap();
            node.status = NodeStatus::Completed;
            node.metrics.tokens = 120;
            node.content = "partial output".to_string();
        }
        let edge_id = store.edges()[0].id.clone();
        store.edge_mut(&edge_id).unwrap().is_completed = true;

        store.soft_reset();

        assert_eq!(store.nodes().len(), 2);
        assert_eq!(store.edges().len(), 1);
        let node = store.node("a").unwrap();
        assert_eq!(node.status, NodeStatus::Pending);
        assert_eq!(node.metrics.tokens, 0);
        assert!(node.content.is_empty());
        assert!(!store.edges()[0].is_completed);
    }

    #[test]
    fn clear_is_undoable() {
        let mut store = store_with(&["a", "b"]);
        store.connect("a", "b", None).unwrap();
        store.clear();
        assert!(store.nodes().is_empty());

        assert!(store.undo());
        assert_eq!(store.nodes().len(), 2);
        assert_eq!(store.edges().len(), 1);
    }

    #[test]
    fn delete_selected_is_one_undo_step() {
        let mut store = store_with(&["a", "b", "c"]);
        store.connect("a", "b", None).unwrap();
        store.toggle_selected("a");
        store.toggle_selected("b");

        assert_eq!(store.delete_selected(), 2);
        assert_eq!(store.nodes().len(), 1);
        assert!(store.edges().is_empty());

        assert!(store.undo());
        assert_eq!(store.nodes().len(), 3);
        assert_eq!(store.edges().len(), 1);
    }

    #[test]
    fn relabel_enforces_triple_invariant() {
        let mut store = store_with(&["a", "b"]);
        let success = store.connect("a", "b", None).unwrap();
        let retry = store.connect("a", "b", Some(EDGE_RETRY)).unwrap();

        assert!(matches!(
            store.relabel_edge(&retry, "success"),
            Err(GraphError::DuplicateEdge { .. })
        ));
        let renamed = store.relabel_edge(&success, "failure").unwrap();
        assert!(store.edge(&renamed).is_some());
    }

    #[test]
    fn highlight_marks_connected_component_only() {
        let mut store = store_with(&["a", "b", "c", "x", "y"]);
        store.connect("a", "b", None).unwrap();
        store.connect("b", "c", None).unwrap();
        store.connect("x", "y", None).unwrap();
        let ab = store.edges()[0].id.clone();

        assert!(store.highlight_component_from_edge(&ab));
        assert!(store.is_highlighted("a"));
        assert!(store.is_highlighted("b"));
        assert!(store.is_highlighted("c"));
        assert!(!store.is_highlighted("x"));
        assert!(!store.is_highlighted("y"));

        store.clear_highlight();
        assert!(store.is_highlighted("x"));
    }

    #[test]
    fn load_plan_builds_dependency_edges_and_skips_unknown() {
        let mut store = GraphStore::new();
        store.load_plan(&[
            AgentPlan {
                id: "planner".to_string(),
                name: "Planner".to_string(),
                role: Some("plans".to_string()),
                tools: vec!["search".to_string()],
                depends_on: Vec::new(),
            },
            AgentPlan {
                id: "coder".to_string(),
                name: "Coder".to_string(),
                role: None,
                tools: Vec::new(),
                depends_on: vec!["planner".to_string(), "ghost".to_string()],
            },
        ]);

        assert_eq!(store.nodes().len(), 2);
        assert_eq!(store.edges().len(), 1);
        assert_eq!(store.edges()[0].source, "planner");
        assert_eq!(store.edges()[0].target, "coder");
        assert!(!store.can_undo());
    }

    #[test]
    fn tool_params_read_only_after_execution_starts() {
        let mut store = store_with(&["a"]);
        store.node_mut("a").unwrap().tool = Some(Default::default());
        store.node_mut("a").unwrap().status = NodeStatus::Running;

        store.update_node_data(
            "a",
            NodeEdit {
                tool_params: Some(serde_json::json!({"q": "late edit"})),
                ..Default::default()
            },
        );
        assert_eq!(
            store.node("a").unwrap().tool.as_ref().unwrap().params,
            serde_json::Value::Null
        );
    }
}
