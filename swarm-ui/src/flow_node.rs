use dioxus::prelude::*;
use swarm_types::{FlowNode, NodeStatus};

use crate::theme::{node_accent, node_icon, status_color, NODE_ACCENTS};

/// How much streamed content the card previews before truncating.
const CONTENT_PREVIEW_CHARS: usize = 160;

#[component]
pub fn FlowNodeCard(
    node: FlowNode,
    selected: bool,
    dimmed: bool,
    connect_armed: bool,
    on_select: Callback<(String, bool)>,
    on_drag_start: Callback<(String, f64, f64)>,
    on_connect_click: Callback<String>,
    on_highlight: Callback<String>,
) -> Element {
    let node_id = node.id.clone();
    let accent = node_accent(node.kind, NODE_ACCENTS);
    let border = if selected {
        "#e2e8f0"
    } else {
        status_color(node.status)
    };
    let opacity = if dimmed { "0.25" } else { "1.0" };
    let x = node.position.x;
    let y = node.position.y;
    let width = node.size.width;
    let icon = node_icon(node.kind);
    let status_label = node.status.label();
    let status_tint = status_color(node.status);
    let label = node.label.clone();

    let node_id_for_click = node_id.clone();
    let node_id_for_drag = node_id.clone();
    let node_id_for_dbl = node_id;

    let metrics_line = format!(
        "{} tok · {} tools · {:.1}s",
        node.metrics.tokens,
        node.metrics.tool_calls,
        node.metrics.elapsed_ms as f64 / 1000.0
    );

    let preview: String = if node.content.chars().count() > CONTENT_PREVIEW_CHARS {
        let tail: String = node
            .content
            .chars()
            .skip(node.content.chars().count() - CONTENT_PREVIEW_CHARS)
            .collect();
        format!("…{tail}")
    } else {
        node.content.clone()
    };

    let progress_pct = node.progress_fraction().map(|f| f * 100.0);
    let tools_line = if node.used_tools.is_empty() {
        String::new()
    } else {
        format!("⚒ {}", node.used_tools.join(", "))
    };
    let error_line = node.error.clone();

    rsx! {
        div {
            class: if selected { "flow-node selected" } else { "flow-node" },
            style: "position: absolute; left: {x}px; top: {y}px; width: {width}px; opacity: {opacity}; background: var(--node-bg, #1f2937); border: 2px solid {border}; border-left: 4px solid {accent}; border-radius: 10px; padding: 8px 10px; cursor: grab; user-select: none; font-size: 0.8rem; color: var(--text-primary, #e5e7eb); box-shadow: 0 4px 16px rgba(0,0,0,0.4);",
            onclick: move |e: Event<MouseData>| {
                e.stop_propagation();
                if connect_armed {
                    on_connect_click.call(node_id_for_click.clone());
                } else {
                    on_select.call((node_id_for_click.clone(), e.modifiers().shift()));
                }
            },
            ondoubleclick: move |e: Event<MouseData>| {
                e.stop_propagation();
                on_highlight.call(node_id_for_dbl.clone());
            },
            onmousedown: move |e: Event<MouseData>| {
                e.stop_propagation();
                let point = e.client_coordinates();
                on_drag_start.call((node_id_for_drag.clone(), point.x, point.y));
            },

            div {
                style: "display: flex; align-items: center; gap: 6px;",
                span { "{icon}" }
                span {
                    style: "font-weight: 600; overflow: hidden; text-overflow: ellipsis; white-space: nowrap;",
                    "{label}"
                }
                span {
                    style: "margin-left: auto; font-size: 0.65rem; color: {status_tint};",
                    "{status_label}"
                }
            }

            if node.status != NodeStatus::Pending {
                div {
                    style: "margin-top: 4px; font-size: 0.65rem; color: var(--text-muted, #9ca3af);",
                    "{metrics_line}"
                }
            }

            if let Some(pct) = progress_pct {
                div {
                    style: "margin-top: 4px; height: 3px; background: #374151; border-radius: 2px; overflow: hidden;",
                    div {
                        style: "height: 100%; width: {pct}%; background: {accent};",
                    }
                }
            }

            if !tools_line.is_empty() {
                div {
                    style: "margin-top: 4px; font-size: 0.65rem; color: var(--text-muted, #9ca3af); overflow: hidden; text-overflow: ellipsis; white-space: nowrap;",
                    "{tools_line}"
                }
            }

            if !preview.is_empty() {
                div {
                    style: "margin-top: 4px; font-size: 0.65rem; color: var(--text-secondary, #cbd5e1); max-height: 48px; overflow: hidden; word-break: break-word;",
                    "{preview}"
                }
            }

            if let Some(error) = error_line {
                div {
                    style: "margin-top: 4px; font-size: 0.65rem; color: #fca5a5;",
                    "⚠ {error}"
                }
            }
        }
    }
}
