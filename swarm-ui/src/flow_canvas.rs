//! Diagram canvas: SVG edge layer underneath absolutely-positioned node
//! cards, wrapped in a pan/zoom transform. All geometry is derived from
//! the store snapshot handed in as props; the canvas owns no graph state.

use dioxus::prelude::*;
use swarm_graph::GraphStore;
use swarm_types::{FlowEdge, FlowNode, Viewport, EDGE_SUCCESS};

use crate::flow_node::FlowNodeCard;
use crate::theme::{edge_color, status_color};

/// Extra diagram space past the furthest node, so edges near the border
/// are never clipped by the SVG element.
const CANVAS_SLACK: f64 = 800.0;

const MINIMAP_WIDTH: f64 = 176.0;
const MINIMAP_HEIGHT: f64 = 120.0;

#[derive(Debug, Clone, PartialEq)]
struct EdgeView {
    id: String,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    arrow_points: String,
    label: String,
    show_label: bool,
    label_x: f64,
    label_y: f64,
    stroke: &'static str,
    stroke_width: &'static str,
    dash: &'static str,
    opacity: &'static str,
    marching: bool,
}

/// Anchor the segment on facing box edges: bottom-to-top when the pair is
/// stacked, right-to-left when side by side.
fn edge_endpoints(source: &FlowNode, target: &FlowNode) -> (f64, f64, f64, f64) {
    let scx = source.position.x + source.size.width / 2.0;
    let scy = source.position.y + source.size.height / 2.0;
    let tcx = target.position.x + target.size.width / 2.0;
    let tcy = target.position.y + target.size.height / 2.0;

    if (tcy - scy).abs() >= (tcx - scx).abs() {
        if tcy >= scy {
            (scx, source.position.y + source.size.height, tcx, target.position.y)
        } else {
            (scx, source.position.y, tcx, target.position.y + target.size.height)
        }
    } else if tcx >= scx {
        (source.position.x + source.size.width, scy, target.position.x, tcy)
    } else {
        (source.position.x, scy, target.position.x + target.size.width, tcy)
    }
}

fn edge_stroke(edge: &FlowEdge) -> &'static str {
    if edge.is_active {
        "#38bdf8"
    } else if edge.is_completed {
        "#4ade80"
    } else {
        edge_color(&edge.label)
    }
}

fn edge_view(edge: &FlowEdge, source: &FlowNode, target: &FlowNode, dimmed: bool) -> EdgeView {
    let (x1, y1, x2, y2) = edge_endpoints(source, target);

    let dx = x2 - x1;
    let dy = y2 - y1;
    let len = (dx * dx + dy * dy).sqrt().max(1.0);
    let (ux, uy) = (dx / len, dy / len);
    let (px, py) = (-uy, ux);
    let base = (x2 - ux * 10.0, y2 - uy * 10.0);
    let arrow_points = format!(
        "{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}",
        x2,
        y2,
        base.0 + px * 5.0,
        base.1 + py * 5.0,
        base.0 - px * 5.0,
        base.1 - py * 5.0
    );

    EdgeView {
        id: edge.id.clone(),
        x1,
        y1,
        x2,
        y2,
        arrow_points,
        label: edge.label.clone(),
        show_label: edge.label != EDGE_SUCCESS,
        label_x: (x1 + x2) / 2.0,
        label_y: (y1 + y2) / 2.0 - 6.0,
        stroke: edge_stroke(edge),
        stroke_width: if edge.is_active || edge.is_completed {
            "2.5"
        } else {
            "1.5"
        },
        dash: if edge.is_active { "7 5" } else { "" },
        opacity: if dimmed { "0.15" } else { "0.9" },
        marching: edge.is_active,
    }
}

#[component]
pub fn FlowCanvas(
    store: GraphStore,
    viewport: Viewport,
    show_grid: bool,
    show_minimap: bool,
    connect_armed: bool,
    on_select: Callback<(String, bool)>,
    on_drag_start: Callback<(String, f64, f64)>,
    on_connect_click: Callback<String>,
    on_highlight_node: Callback<String>,
    on_highlight_edge: Callback<String>,
    on_background_down: Callback<(f64, f64)>,
    on_mouse_move: Callback<(f64, f64)>,
    on_mouse_up: Callback<()>,
) -> Element {
    let extent_x = store
        .nodes()
        .iter()
        .map(|n| n.position.x + n.size.width)
        .fold(0.0f64, f64::max)
        + CANVAS_SLACK;
    let extent_y = store
        .nodes()
        .iter()
        .map(|n| n.position.y + n.size.height)
        .fold(0.0f64, f64::max)
        + CANVAS_SLACK;

    let vx = viewport.x;
    let vy = viewport.y;
    let zoom = viewport.zoom;

    let grid_style = if show_grid {
        "background-image: radial-gradient(circle, var(--grid-dot, #2a3344) 1px, transparent 1px); background-size: 24px 24px;"
    } else {
        ""
    };

    let dimmed_any = store.has_highlight();
    let edge_views: Vec<EdgeView> = store
        .edges()
        .iter()
        .filter_map(|edge| {
            let source = store.node(&edge.source)?;
            let target = store.node(&edge.target)?;
            let dimmed = dimmed_any && !store.is_highlighted(&edge.id);
            Some(edge_view(edge, source, target, dimmed))
        })
        .collect();

    let nodes: Vec<FlowNode> = store.nodes().to_vec();

    rsx! {
        div {
            class: "flow-canvas",
            style: "position: relative; flex: 1; overflow: hidden; background: var(--canvas-bg, #0f172a); {grid_style}",
            onmousedown: move |e: Event<MouseData>| {
                let point = e.client_coordinates();
                on_background_down.call((point.x, point.y));
            },
            onmousemove: move |e: Event<MouseData>| {
                let point = e.client_coordinates();
                on_mouse_move.call((point.x, point.y));
            },
            onmouseup: move |_| on_mouse_up.call(()),
            onmouseleave: move |_| on_mouse_up.call(()),

            div {
                class: "flow-transform",
                style: "position: absolute; left: 0; top: 0; transform: translate({vx}px, {vy}px) scale({zoom}); transform-origin: 0 0; transition: transform 0.25s ease;",

                svg {
                    width: "{extent_x}",
                    height: "{extent_y}",
                    style: "position: absolute; left: 0; top: 0; pointer-events: none; overflow: visible;",

                    for view in edge_views.into_iter() {
                        g {
                            key: "{view.id}",
                            opacity: "{view.opacity}",
                            line {
                                x1: "{view.x1}",
                                y1: "{view.y1}",
                                x2: "{view.x2}",
                                y2: "{view.y2}",
                                stroke: "{view.stroke}",
                                stroke_width: "{view.stroke_width}",
                                stroke_dasharray: "{view.dash}",
                                class: if view.marching { "edge-line marching" } else { "edge-line" },
                                style: "pointer-events: auto; cursor: pointer;",
                                onclick: {
                                    let edge_id = view.id.clone();
                                    move |e: Event<MouseData>| {
                                        e.stop_propagation();
                                        on_highlight_edge.call(edge_id.clone());
                                    }
                                },
                            }
                            polygon {
                                points: "{view.arrow_points}",
                                fill: "{view.stroke}",
                            }
                            if view.show_label {
                                text {
                                    x: "{view.label_x}",
                                    y: "{view.label_y}",
                                    fill: "{view.stroke}",
                                    font_size: "11",
                                    text_anchor: "middle",
                                    "{view.label}"
                                }
                            }
                        }
                    }
                }

                for node in nodes.into_iter() {
                    FlowNodeCard {
                        key: "{node.id}",
                        selected: store.is_selected(&node.id),
                        dimmed: dimmed_any && !store.is_highlighted(&node.id),
                        connect_armed,
                        on_select,
                        on_drag_start,
                        on_connect_click,
                        on_highlight: on_highlight_node,
                        node,
                    }
                }
            }

            if show_minimap {
                Minimap {
                    store: store.clone(),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct MinimapRect {
    id: String,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    tint: &'static str,
}

/// Scaled-down overview in the corner: one rectangle per node.
#[component]
fn Minimap(store: GraphStore) -> Element {
    let nodes = store.nodes();
    if nodes.is_empty() {
        return rsx! {};
    }

    let min_x = nodes.iter().map(|n| n.position.x).fold(f64::INFINITY, f64::min);
    let min_y = nodes.iter().map(|n| n.position.y).fold(f64::INFINITY, f64::min);
    let max_x = nodes
        .iter()
        .map(|n| n.position.x + n.size.width)
        .fold(f64::NEG_INFINITY, f64::max);
    let max_y = nodes
        .iter()
        .map(|n| n.position.y + n.size.height)
        .fold(f64::NEG_INFINITY, f64::max);

    let span_x = (max_x - min_x).max(1.0);
    let span_y = (max_y - min_y).max(1.0);
    let scale = (MINIMAP_WIDTH / span_x).min(MINIMAP_HEIGHT / span_y);

    let rects: Vec<MinimapRect> = nodes
        .iter()
        .map(|node| MinimapRect {
            id: node.id.clone(),
            x: (node.position.x - min_x) * scale,
            y: (node.position.y - min_y) * scale,
            w: (node.size.width * scale).max(3.0),
            h: (node.size.height * scale).max(2.0),
            tint: status_color(node.status),
        })
        .collect();

    rsx! {
        div {
            class: "minimap",
            style: "position: absolute; right: 12px; bottom: 12px; width: {MINIMAP_WIDTH}px; height: {MINIMAP_HEIGHT}px; background: rgba(15, 23, 42, 0.85); border: 1px solid var(--border-color, #334155); border-radius: 6px; overflow: hidden; pointer-events: none;",

            for rect in rects.into_iter() {
                div {
                    key: "{rect.id}",
                    style: "position: absolute; left: {rect.x}px; top: {rect.y}px; width: {rect.w}px; height: {rect.h}px; background: {rect.tint}; border-radius: 1px;",
                }
            }
        }
    }
}
