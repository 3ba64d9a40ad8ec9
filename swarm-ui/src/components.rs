//! Console chrome around the canvas: toolbar, node palette, session
//! panel, node inspector, replay scrubber, and toast notifications.

use dioxus::prelude::*;
use gloo_timers::future::TimeoutFuture;
use swarm_types::{FlowEdge, FlowNode, NodeKind, NodeStatus, SessionSummary};

use crate::console::GraphActions;
use crate::theme::{node_icon, status_color};

// ============================================================================
// Toasts
// ============================================================================

const MAX_TOASTS: usize = 5;
const TOAST_LIFETIME_MS: u32 = 4_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub text: String,
}

impl Toast {
    fn tint(&self) -> &'static str {
        match self.kind {
            ToastKind::Info => "#38bdf8",
            ToastKind::Success => "#4ade80",
            ToastKind::Error => "#f87171",
        }
    }
}

/// Queue a transient notification; it expires on its own. Oldest entries
/// are dropped past the cap.
pub fn push_toast(mut toasts: Signal<Vec<Toast>>, kind: ToastKind, text: impl Into<String>) {
    let id = toasts
        .peek()
        .iter()
        .map(|t| t.id)
        .max()
        .map(|m| m + 1)
        .unwrap_or(0);
    {
        let mut list = toasts.write();
        list.push(Toast {
            id,
            kind,
            text: text.into(),
        });
        if list.len() > MAX_TOASTS {
            list.remove(0);
        }
    }
    spawn(async move {
        TimeoutFuture::new(TOAST_LIFETIME_MS).await;
        toasts.write().retain(|t| t.id != id);
    });
}

#[derive(Debug, Clone, PartialEq)]
struct ToastRow {
    id: u64,
    text: String,
    tint: &'static str,
}

#[component]
pub fn ToastHost(toasts: Vec<Toast>) -> Element {
    let rows: Vec<ToastRow> = toasts
        .iter()
        .map(|toast| ToastRow {
            id: toast.id,
            text: toast.text.clone(),
            tint: toast.tint(),
        })
        .collect();

    rsx! {
        div {
            style: "position: fixed; left: 16px; bottom: 16px; display: flex; flex-direction: column; gap: 8px; z-index: 1000;",
            for row in rows.into_iter() {
                div {
                    key: "{row.id}",
                    style: "padding: 8px 12px; background: var(--panel-bg, #1f2937); border-left: 3px solid {row.tint}; border-radius: 6px; color: var(--text-primary, #e5e7eb); font-size: 0.8rem; box-shadow: 0 4px 12px rgba(0,0,0,0.4); max-width: 320px;",
                    "{row.text}"
                }
            }
        }
    }
}

// ============================================================================
// Toolbar
// ============================================================================

#[component]
pub fn Toolbar(
    run_active: bool,
    awaiting_input: bool,
    can_undo: bool,
    can_redo: bool,
    follow: bool,
    connect_mode: bool,
) -> Element {
    let actions = use_context::<GraphActions>();
    let mut prompt = use_signal(String::new);

    let submit = use_callback(move |_: ()| {
        let text = prompt.peek().trim().to_string();
        if text.is_empty() {
            return;
        }
        if awaiting_input {
            actions.continue_run.call(text);
        } else {
            actions.start.call(text);
        }
        prompt.set(String::new());
    });

    let prompt_placeholder = if awaiting_input {
        "An agent is waiting for your input…"
    } else {
        "Describe a goal for the swarm…"
    };
    let submit_label = if awaiting_input { "Reply" } else { "Run" };

    rsx! {
        div {
            class: "toolbar",
            style: "display: flex; align-items: center; gap: 6px; padding: 8px 12px; background: var(--titlebar-bg, #111827); border-bottom: 1px solid var(--border-color, #374151); flex-wrap: wrap;",

            input {
                r#type: "text",
                style: "flex: 1; min-width: 220px; padding: 6px 10px; background: var(--input-bg, #1f2937); color: var(--text-primary, white); border: 1px solid var(--border-color, #374151); border-radius: 6px;",
                placeholder: "{prompt_placeholder}",
                value: "{prompt}",
                oninput: move |e| prompt.set(e.value()),
                onkeydown: move |e: Event<KeyboardData>| {
                    if e.key() == Key::Enter {
                        submit.call(());
                    }
                },
            }
            button { class: "tb", onclick: move |_| submit.call(()), "{submit_label}" }
            if run_active {
                button { class: "tb danger", onclick: move |_| actions.stop.call(()), "Stop" }
            }

            span { class: "tb-sep" }
            button { class: "tb", disabled: !can_undo, onclick: move |_| actions.undo.call(()), "Undo" }
            button { class: "tb", disabled: !can_redo, onclick: move |_| actions.redo.call(()), "Redo" }

            span { class: "tb-sep" }
            button { class: "tb", onclick: move |_| actions.fit_view.call(()), title: "Fit view (f)", "Fit" }
            button { class: "tb", onclick: move |_| actions.auto_layout.call(()), title: "Auto layout (l)", "Layout" }
            button { class: "tb", onclick: move |_| actions.toggle_direction.call(()), title: "Flip layout direction", "TB/LR" }
            button { class: "tb", onclick: move |_| actions.zoom_in.call(()), "+" }
            button { class: "tb", onclick: move |_| actions.zoom_out.call(()), "−" }

            span { class: "tb-sep" }
            button {
                class: if follow { "tb active" } else { "tb" },
                onclick: move |_| actions.toggle_follow.call(()),
                title: "Follow running node (space)",
                "Follow"
            }
            button {
                class: if connect_mode { "tb active" } else { "tb" },
                onclick: move |_| actions.toggle_connect.call(()),
                title: "Click two nodes to connect them",
                "Connect"
            }
            button { class: "tb", onclick: move |_| actions.toggle_grid.call(()), title: "Toggle grid (g)", "Grid" }
            button { class: "tb", onclick: move |_| actions.toggle_minimap.call(()), title: "Toggle minimap (m)", "Map" }

            span { class: "tb-sep" }
            button { class: "tb", onclick: move |_| actions.soft_reset.call(()), title: "Reset statuses, keep structure", "Reset" }
            button { class: "tb danger", onclick: move |_| actions.clear.call(()), "Clear" }
            button { class: "tb", onclick: move |_| actions.toggle_theme.call(()), "Theme" }
        }
    }
}

// ============================================================================
// Node palette
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct PaletteEntry {
    kind: NodeKind,
    label: &'static str,
    icon: &'static str,
}

#[component]
pub fn PaletteBar() -> Element {
    let actions = use_context::<GraphActions>();
    let entries: Vec<PaletteEntry> = NodeKind::ALL
        .into_iter()
        .map(|kind| PaletteEntry {
            kind,
            label: kind.label(),
            icon: node_icon(kind),
        })
        .collect();

    rsx! {
        div {
            class: "palette",
            style: "display: flex; gap: 4px; padding: 6px 12px; background: var(--titlebar-bg, #111827); border-bottom: 1px solid var(--border-color, #374151); flex-wrap: wrap;",
            span {
                style: "font-size: 0.7rem; color: var(--text-muted, #6b7280); align-self: center; margin-right: 4px;",
                "Add block:"
            }
            for entry in entries.into_iter() {
                button {
                    key: "{entry.label}",
                    class: "tb",
                    title: "{entry.label}",
                    onclick: move |_| actions.add_node.call(entry.kind),
                    "{entry.icon} {entry.label}"
                }
            }
        }
    }
}

// ============================================================================
// Session panel
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct SessionRow {
    id: String,
    title: String,
    when: String,
    is_current: bool,
}

#[component]
pub fn SessionPanel(
    sessions: Vec<SessionSummary>,
    current: Option<String>,
    on_load: Callback<String>,
    on_delete: Callback<String>,
    on_export: Callback<String>,
    on_copy_id: Callback<String>,
    on_refresh: Callback<()>,
) -> Element {
    let rows: Vec<SessionRow> = sessions
        .iter()
        .map(|session| SessionRow {
            id: session.session_id.clone(),
            title: session
                .title
                .clone()
                .unwrap_or_else(|| session.session_id.chars().take(12).collect()),
            when: session.created_at.format("%m-%d %H:%M").to_string(),
            is_current: current.as_deref() == Some(session.session_id.as_str()),
        })
        .collect();
    let empty = rows.is_empty();

    rsx! {
        div {
            class: "session-panel",
            style: "width: 240px; display: flex; flex-direction: column; background: var(--panel-bg, #111827); border-right: 1px solid var(--border-color, #374151); overflow-y: auto;",

            div {
                style: "display: flex; align-items: center; justify-content: space-between; padding: 8px 12px; border-bottom: 1px solid var(--border-color, #374151);",
                span { style: "font-weight: 600; font-size: 0.85rem;", "Sessions" }
                button { class: "tb", onclick: move |_| on_refresh.call(()), "↻" }
            }

            if empty {
                div {
                    style: "padding: 12px; font-size: 0.75rem; color: var(--text-muted, #6b7280);",
                    "No sessions yet. Run a goal to create one."
                }
            }

            for row in rows.into_iter() {
                div {
                    key: "{row.id}",
                    style: if row.is_current {
                        "padding: 8px 12px; border-bottom: 1px solid var(--border-color, #1f2937); cursor: pointer; background: var(--selected-bg, #1e293b);"
                    } else {
                        "padding: 8px 12px; border-bottom: 1px solid var(--border-color, #1f2937); cursor: pointer;"
                    },
                    onclick: {
                        let id = row.id.clone();
                        move |_| on_load.call(id.clone())
                    },
                    div {
                        style: "font-size: 0.8rem; overflow: hidden; text-overflow: ellipsis; white-space: nowrap;",
                        "{row.title}"
                    }
                    div {
                        style: "display: flex; align-items: center; gap: 6px; margin-top: 2px;",
                        span { style: "font-size: 0.65rem; color: var(--text-muted, #6b7280);", "{row.when}" }
                        span { style: "margin-left: auto; display: flex; gap: 2px;",
                            button {
                                class: "tb mini",
                                title: "Export JSON",
                                onclick: {
                                    let id = row.id.clone();
                                    move |e: Event<MouseData>| {
                                        e.stop_propagation();
                                        on_export.call(id.clone());
                                    }
                                },
                                "⭳"
                            }
                            button {
                                class: "tb mini",
                                title: "Copy session id",
                                onclick: {
                                    let id = row.id.clone();
                                    move |e: Event<MouseData>| {
                                        e.stop_propagation();
                                        on_copy_id.call(id.clone());
                                    }
                                },
                                "⧉"
                            }
                            button {
                                class: "tb mini danger",
                                title: "Delete session",
                                onclick: {
                                    let id = row.id.clone();
                                    move |e: Event<MouseData>| {
                                        e.stop_propagation();
                                        on_delete.call(id.clone());
                                    }
                                },
                                "×"
                            }
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Inspector
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct EdgeRow {
    id: String,
    target: String,
    label: String,
}

#[component]
pub fn InspectorPanel(node: FlowNode, outgoing: Vec<FlowEdge>) -> Element {
    let actions = use_context::<GraphActions>();
    let node_id = node.id.clone();
    let editable = node.status == NodeStatus::Pending;
    let status_tint = status_color(node.status);
    let status_label = node.status.label();
    let kind_label = node.kind.label();
    let kind_icon = node_icon(node.kind);
    let metrics = format!(
        "tokens {} · tool calls {} · {:.1}s · ${:.4}",
        node.metrics.tokens,
        node.metrics.tool_calls,
        node.metrics.elapsed_ms as f64 / 1000.0,
        node.metrics.cost_usd
    );
    let params_json = node
        .tool
        .as_ref()
        .map(|t| serde_json::to_string_pretty(&t.params).unwrap_or_default())
        .unwrap_or_default();
    let has_tool = node.tool.is_some();
    let params_label = if editable {
        "Tool parameters"
    } else {
        "Tool parameters (read-only)"
    };
    let planned = node.planned_tools.join(", ");
    let used = node.used_tools.join(", ");

    let edge_rows: Vec<EdgeRow> = outgoing
        .iter()
        .map(|edge| EdgeRow {
            id: edge.id.clone(),
            target: edge.target.clone(),
            label: edge.label.clone(),
        })
        .collect();
    let has_edges = !edge_rows.is_empty();

    let id_rename = node_id.clone();
    let id_describe = node_id.clone();
    let id_params = node_id.clone();
    let id_delete = node_id.clone();

    rsx! {
        div {
            class: "inspector",
            style: "width: 260px; display: flex; flex-direction: column; gap: 8px; padding: 12px; background: var(--panel-bg, #111827); border-left: 1px solid var(--border-color, #374151); overflow-y: auto; font-size: 0.8rem;",

            div {
                style: "display: flex; align-items: center; gap: 6px;",
                span { "{kind_icon}" }
                span { style: "font-weight: 600;", "{kind_label}" }
                span { style: "margin-left: auto; font-size: 0.7rem; color: {status_tint};", "{status_label}" }
            }

            label { style: "font-size: 0.7rem; color: var(--text-muted, #6b7280);", "Label" }
            input {
                r#type: "text",
                style: "padding: 4px 8px; background: var(--input-bg, #1f2937); color: var(--text-primary, white); border: 1px solid var(--border-color, #374151); border-radius: 4px;",
                value: "{node.label}",
                onchange: move |e| actions.rename_node.call((id_rename.clone(), e.value())),
            }

            label { style: "font-size: 0.7rem; color: var(--text-muted, #6b7280);", "Prompt / description" }
            textarea {
                style: "padding: 4px 8px; min-height: 64px; background: var(--input-bg, #1f2937); color: var(--text-primary, white); border: 1px solid var(--border-color, #374151); border-radius: 4px; resize: vertical;",
                value: "{node.description}",
                onchange: move |e| actions.describe_node.call((id_describe.clone(), e.value())),
            }

            if has_tool {
                label { style: "font-size: 0.7rem; color: var(--text-muted, #6b7280);", "{params_label}" }
                textarea {
                    style: "padding: 4px 8px; min-height: 72px; font-family: monospace; background: var(--input-bg, #1f2937); color: var(--text-primary, white); border: 1px solid var(--border-color, #374151); border-radius: 4px; resize: vertical;",
                    readonly: !editable,
                    value: "{params_json}",
                    onchange: move |e| actions.edit_params.call((id_params.clone(), e.value())),
                }
            }

            div { style: "font-size: 0.7rem; color: var(--text-muted, #6b7280);", "{metrics}" }

            if !planned.is_empty() {
                div { style: "font-size: 0.7rem;", "Planned: {planned}" }
            }
            if !used.is_empty() {
                div { style: "font-size: 0.7rem;", "Used: {used}" }
            }

            if has_edges {
                label { style: "font-size: 0.7rem; color: var(--text-muted, #6b7280);", "Outgoing edges" }
            }
            for row in edge_rows.into_iter() {
                div {
                    key: "{row.id}",
                    style: "display: flex; align-items: center; gap: 4px;",
                    span {
                        style: "flex: 1; overflow: hidden; text-overflow: ellipsis; white-space: nowrap; font-size: 0.7rem;",
                        "→ {row.target}"
                    }
                    select {
                        value: "{row.label}",
                        onchange: {
                            let id = row.id.clone();
                            move |e: Event<FormData>| actions.relabel_edge.call((id.clone(), e.value()))
                        },
                        option { value: "success", "success" }
                        option { value: "failure", "failure" }
                        option { value: "retry", "retry" }
                        option { value: "timeout", "timeout" }
                    }
                    button {
                        class: "tb mini danger",
                        onclick: {
                            let id = row.id.clone();
                            move |_| actions.disconnect_edge.call(id.clone())
                        },
                        "×"
                    }
                }
            }

            button {
                class: "tb danger",
                style: "margin-top: auto;",
                onclick: move |_| actions.delete_node.call(id_delete.clone()),
                "Delete block"
            }
        }
    }
}

// ============================================================================
// Replay scrubber
// ============================================================================

#[component]
pub fn ReplayBar(
    count: usize,
    index: usize,
    on_scrub: Callback<usize>,
    on_exit: Callback<()>,
) -> Element {
    rsx! {
        div {
            class: "replay-bar",
            style: "display: flex; align-items: center; gap: 10px; padding: 8px 12px; background: var(--titlebar-bg, #111827); border-top: 1px solid var(--border-color, #374151);",
            span { style: "font-size: 0.75rem; color: var(--text-muted, #9ca3af);", "Replay" }
            input {
                r#type: "range",
                style: "flex: 1;",
                min: "0",
                max: "{count}",
                value: "{index}",
                oninput: move |e| {
                    if let Ok(i) = e.value().parse::<usize>() {
                        on_scrub.call(i);
                    }
                },
            }
            span { style: "font-size: 0.75rem; color: var(--text-muted, #9ca3af);", "{index}/{count}" }
            button { class: "tb", onclick: move |_| on_exit.call(()), "Live" }
        }
    }
}
