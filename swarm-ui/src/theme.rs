//! Theme preference plus the visual lookup tables for nodes and edges.
//!
//! Lookups are pure functions over explicit tables; nothing here keeps
//! mutable state.

use swarm_types::{NodeKind, NodeStatus, EDGE_FAILURE, EDGE_RETRY, EDGE_SUCCESS, EDGE_TIMEOUT};

pub const DEFAULT_THEME: &str = "dark";
const THEME_KEY: &str = "swarm-console.theme";

pub fn next_theme(current_theme: &str) -> String {
    if current_theme == "light" {
        "dark".to_string()
    } else {
        "light".to_string()
    }
}

pub fn apply_theme_to_document(theme: &str) {
    if !matches!(theme, "light" | "dark") {
        return;
    }

    if let Some(document) = web_sys::window().and_then(|w| w.document()) {
        if let Some(root) = document.document_element() {
            let _ = root.set_attribute("data-theme", theme);
        }
    }
}

pub fn get_cached_theme_preference() -> Option<String> {
    web_sys::window()
        .and_then(|window| window.local_storage().ok().flatten())
        .and_then(|storage| storage.get_item(THEME_KEY).ok().flatten())
        .filter(|theme| matches!(theme.as_str(), "light" | "dark"))
}

pub fn set_cached_theme_preference(theme: &str) {
    if !matches!(theme, "light" | "dark") {
        return;
    }

    if let Some(storage) =
        web_sys::window().and_then(|window| window.local_storage().ok().flatten())
    {
        let _ = storage.set_item(THEME_KEY, theme);
    }
}

// ============================================================================
// Node / edge visual tables
// ============================================================================

/// Accent color per node kind. Passed explicitly so alternative palettes
/// can swap the whole table.
pub const NODE_ACCENTS: &[(NodeKind, &str)] = &[
    (NodeKind::Agent, "#818cf8"),
    (NodeKind::ToolCall, "#fbbf24"),
    (NodeKind::Decision, "#f472b6"),
    (NodeKind::Validation, "#34d399"),
    (NodeKind::Transform, "#60a5fa"),
    (NodeKind::ParallelFork, "#c084fc"),
    (NodeKind::ParallelJoin, "#c084fc"),
    (NodeKind::Loop, "#fb923c"),
    (NodeKind::HumanInput, "#22d3ee"),
    (NodeKind::Start, "#4ade80"),
    (NodeKind::End, "#94a3b8"),
];

pub fn node_accent(kind: NodeKind, table: &[(NodeKind, &'static str)]) -> &'static str {
    table
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, color)| *color)
        .unwrap_or("#94a3b8")
}

pub fn node_icon(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Agent => "🤖",
        NodeKind::ToolCall => "🔧",
        NodeKind::Decision => "🔀",
        NodeKind::Validation => "✅",
        NodeKind::Transform => "⚙️",
        NodeKind::ParallelFork => "⑂",
        NodeKind::ParallelJoin => "⑃",
        NodeKind::Loop => "🔁",
        NodeKind::HumanInput => "🙋",
        NodeKind::Start => "▶",
        NodeKind::End => "⏹",
    }
}

/// Border/status color for a node's current execution state.
pub fn status_color(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::Pending => "#6b7280",
        NodeStatus::Running => "#38bdf8",
        NodeStatus::Completed => "#4ade80",
        NodeStatus::Failed => "#f87171",
        NodeStatus::NeedsInput => "#facc15",
    }
}

/// Stroke color for an edge label. The special labels get distinct
/// treatment; anything else renders like success.
pub fn edge_color(label: &str) -> &'static str {
    match label {
        EDGE_FAILURE => "#f87171",
        EDGE_RETRY => "#fb923c",
        EDGE_TIMEOUT => "#facc15",
        EDGE_SUCCESS => "#64748b",
        _ => "#64748b",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_toggle_flips_between_light_and_dark() {
        assert_eq!(next_theme("light"), "dark");
        assert_eq!(next_theme("dark"), "light");
        assert_eq!(next_theme("garbage"), "light");
    }

    #[test]
    fn every_node_kind_has_an_accent() {
        for kind in NodeKind::ALL {
            assert!(NODE_ACCENTS.iter().any(|(k, _)| *k == kind));
        }
    }

    #[test]
    fn special_edge_labels_differ_from_success() {
        let success = edge_color(EDGE_SUCCESS);
        assert_ne!(edge_color(EDGE_FAILURE), success);
        assert_ne!(edge_color(EDGE_RETRY), success);
        assert_ne!(edge_color(EDGE_TIMEOUT), success);
        assert_eq!(edge_color("custom"), success);
    }
}
