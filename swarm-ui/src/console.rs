//! Swarm console - the main view
//!
//! Wires the graph store, reconciler, camera, and persistence into one
//! Dioxus component tree. All graph state lives in the store signal;
//! components receive snapshots and a capability-style set of callbacks
//! instead of reaching into shared state.

use dioxus::prelude::*;
use gloo_timers::future::TimeoutFuture;

use swarm_graph::{
    camera as cam, compute_layout, replay_prefix, FollowCamera, GraphStore, LayoutDirection,
    LayoutOptions, NodeEdit, Reconciler, FLUSH_INTERVAL_MS,
};
use swarm_types::{
    EventEnvelope, FlowEdge, FlowNode, NodeKind, NodeStatus, Position, RunStatus, SessionSummary,
};

use crate::api;
use crate::components::{
    push_toast, InspectorPanel, PaletteBar, ReplayBar, SessionPanel, Toast, ToastHost, ToastKind,
    Toolbar,
};
use crate::flow_canvas::FlowCanvas;
use crate::interop;
use crate::poll::{run_poll_loop, save_current_layout, PollContext};
use crate::shortcuts::{shortcut_for, Shortcut};
use crate::theme::{
    apply_theme_to_document, get_cached_theme_preference, next_theme, set_cached_theme_preference,
    DEFAULT_THEME,
};

/// Layout key used for graphs built by hand, before any backend session
/// exists.
const SCRATCH_EXECUTION_ID: &str = "scratch";

/// How long a path highlight stays before fading on its own.
const HIGHLIGHT_TIMEOUT_MS: u32 = 4_000;

const GLOBAL_CSS: &str = r#"
* { box-sizing: border-box; }
body { margin: 0; font-family: ui-sans-serif, system-ui, sans-serif; }
:root { --canvas-bg: #0f172a; --panel-bg: #111827; --titlebar-bg: #111827;
        --node-bg: #1f2937; --input-bg: #1f2937; --border-color: #374151;
        --selected-bg: #1e293b; --grid-dot: #2a3344;
        --text-primary: #e5e7eb; --text-secondary: #cbd5e1; --text-muted: #9ca3af; }
:root[data-theme="light"] { --canvas-bg: #f1f5f9; --panel-bg: #e2e8f0; --titlebar-bg: #e2e8f0;
        --node-bg: #ffffff; --input-bg: #ffffff; --border-color: #cbd5e1;
        --selected-bg: #dbeafe; --grid-dot: #cbd5e1;
        --text-primary: #0f172a; --text-secondary: #334155; --text-muted: #64748b; }
.tb { padding: 4px 10px; background: var(--input-bg); color: var(--text-primary);
      border: 1px solid var(--border-color); border-radius: 6px; cursor: pointer;
      font-size: 0.75rem; }
.tb:hover:not(:disabled) { border-color: #60a5fa; }
.tb:disabled { opacity: 0.4; cursor: default; }
.tb.active { background: #2563eb; border-color: #3b82f6; color: white; }
.tb.danger { color: #f87171; }
.tb.mini { padding: 0 6px; font-size: 0.7rem; }
.tb-sep { width: 1px; height: 20px; background: var(--border-color); }
@keyframes edge-march { to { stroke-dashoffset: -24; } }
line.marching { animation: edge-march 0.8s linear infinite; }
"#;

/// The store's operation set as one capability object, provided through
/// context so panels don't thread a dozen individual callbacks.
#[derive(Clone, Copy)]
pub struct GraphActions {
    pub start: Callback<String>,
    pub continue_run: Callback<String>,
    pub stop: Callback<()>,
    pub undo: Callback<()>,
    pub redo: Callback<()>,
    pub fit_view: Callback<()>,
    pub auto_layout: Callback<()>,
    pub toggle_direction: Callback<()>,
    pub toggle_follow: Callback<()>,
    pub toggle_connect: Callback<()>,
    pub toggle_grid: Callback<()>,
    pub toggle_minimap: Callback<()>,
    pub toggle_theme: Callback<()>,
    pub zoom_in: Callback<()>,
    pub zoom_out: Callback<()>,
    pub soft_reset: Callback<()>,
    pub clear: Callback<()>,
    pub add_node: Callback<NodeKind>,
    pub delete_node: Callback<String>,
    pub rename_node: Callback<(String, String)>,
    pub describe_node: Callback<(String, String)>,
    pub edit_params: Callback<(String, String)>,
    pub relabel_edge: Callback<(String, String)>,
    pub disconnect_edge: Callback<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Node,
    Pan,
}

#[derive(Debug, Clone, PartialEq)]
struct DragState {
    mode: DragMode,
    node_id: Option<String>,
    last: (f64, f64),
}

#[component]
pub fn ConsoleView() -> Element {
    let mut store = use_signal(GraphStore::new);
    let mut reconciler = use_signal(Reconciler::new);
    let mut camera = use_signal(FollowCamera::new);
    let mut session_id = use_signal(|| None::<String>);
    let mut sessions = use_signal(Vec::<SessionSummary>::new);
    let mut events = use_signal(Vec::<EventEnvelope>::new);
    let mut replay_index = use_signal(|| None::<usize>);
    let mut run_active = use_signal(|| false);
    let mut generation = use_signal(|| 0u64);
    let toasts = use_signal(Vec::<Toast>::new);
    let mut direction = use_signal(LayoutDirection::default);
    let mut show_grid = use_signal(|| true);
    let mut show_minimap = use_signal(|| true);
    let container = use_signal(interop::get_viewport_size);
    let mut drag = use_signal(|| None::<DragState>);
    let mut connect_mode = use_signal(|| false);
    let mut connect_from = use_signal(|| None::<String>);
    let mut current_theme = use_signal(|| DEFAULT_THEME.to_string());
    let mut theme_initialized = use_signal(|| false);
    let seeded_session = use_signal(|| None::<String>);
    let mut highlight_generation = use_signal(|| 0u64);

    let poll_context = PollContext {
        generation,
        store,
        reconciler,
        events,
        camera,
        container,
        run_active,
        seeded_session,
    };

    // Theme is local-only: cached preference or the default.
    use_effect(move || {
        if theme_initialized() {
            return;
        }
        theme_initialized.set(true);
        let theme = get_cached_theme_preference().unwrap_or_else(|| DEFAULT_THEME.to_string());
        apply_theme_to_document(&theme);
        current_theme.set(theme);
    });

    // Load the session list on mount.
    use_effect(move || {
        spawn(async move {
            match api::fetch_sessions().await {
                Ok(list) => sessions.set(list),
                Err(e) => {
                    dioxus_logger::tracing::warn!("failed to fetch sessions: {e}");
                }
            }
        });
    });

    // Token flush ticker: one store update per interval regardless of how
    // fast tokens stream in. Lives as long as the console.
    use_effect(move || {
        spawn(async move {
            loop {
                TimeoutFuture::new(FLUSH_INTERVAL_MS as u32).await;
                if reconciler.peek().has_pending_tokens() {
                    reconciler
                        .write()
                        .flush_tokens(&mut store.write(), interop::now_ms());
                }
            }
        });
    });

    // Teardown must not lose buffered tail content.
    use_drop(move || {
        if reconciler.peek().has_pending_tokens() {
            reconciler
                .write()
                .flush_tokens(&mut store.write(), interop::now_ms());
        }
    });

    let refresh_sessions = use_callback(move |_: ()| {
        spawn(async move {
            match api::fetch_sessions().await {
                Ok(list) => sessions.set(list),
                Err(e) => push_toast(toasts, ToastKind::Error, format!("Sessions: {e}")),
            }
        });
    });

    let start_run = use_callback(move |goal: String| {
        *generation.write() += 1;
        let my_generation = *generation.peek();
        let mut ctx = poll_context;

        store.set(GraphStore::new());
        reconciler.write().reset();
        events.write().clear();
        replay_index.set(None);
        ctx.seeded_session.set(None);
        run_active.set(true);

        spawn(async move {
            match api::start_swarm(&goal).await {
                Ok(new_session) => {
                    session_id.set(Some(new_session.clone()));
                    refresh_sessions.call(());
                    run_poll_loop(new_session, my_generation, ctx).await;
                }
                Err(e) => {
                    run_active.set(false);
                    push_toast(toasts, ToastKind::Error, format!("Start failed: {e}"));
                }
            }
        });
    });

    let continue_run = use_callback(move |reply: String| {
        let Some(session) = session_id.peek().clone() else {
            return;
        };
        spawn(async move {
            if let Err(e) = api::continue_swarm(&session, &reply).await {
                push_toast(toasts, ToastKind::Error, format!("Reply failed: {e}"));
            }
        });
    });

    // Stop: cancel the poll loop, flush buffered tokens, leave statuses
    // exactly as last reported.
    let stop_run = use_callback(move |_: ()| {
        *generation.write() += 1;
        reconciler
            .write()
            .flush_tokens(&mut store.write(), interop::now_ms());
        run_active.set(false);
        push_toast(toasts, ToastKind::Info, "Execution stopped");
    });

    let load_session = use_callback(move |session: String| {
        *generation.write() += 1;
        let my_generation = *generation.peek();
        let mut ctx = poll_context;

        session_id.set(Some(session.clone()));
        store.set(GraphStore::new());
        reconciler.write().reset();
        events.write().clear();
        replay_index.set(None);
        ctx.seeded_session.set(None);
        run_active.set(true);

        spawn(async move {
            run_poll_loop(session, my_generation, ctx).await;
        });
    });

    let delete_session = use_callback(move |session: String| {
        if !interop::confirm("Delete this session?") {
            return;
        }
        let is_current = session_id.peek().as_deref() == Some(session.as_str());
        spawn(async move {
            match api::delete_session(&session).await {
                Ok(()) => {
                    if is_current {
                        *generation.write() += 1;
                        session_id.set(None);
                        run_active.set(false);
                    }
                    refresh_sessions.call(());
                }
                Err(e) => push_toast(toasts, ToastKind::Error, format!("Delete failed: {e}")),
            }
        });
    });

    let export_session = use_callback(move |session: String| {
        spawn(async move {
            match api::fetch_conversation_status(&session).await {
                Ok(status) => {
                    let export =
                        api::build_session_export(&session, status.messages, status.sources);
                    let json = match serde_json::to_string_pretty(&export) {
                        Ok(json) => json,
                        Err(e) => {
                            push_toast(toasts, ToastKind::Error, format!("Export failed: {e}"));
                            return;
                        }
                    };
                    let filename = format!("session-{session}.json");
                    match interop::download_json(&filename, &json) {
                        Ok(()) => push_toast(toasts, ToastKind::Success, "Session exported"),
                        Err(e) => {
                            push_toast(toasts, ToastKind::Error, format!("Download failed: {e}"))
                        }
                    }
                }
                Err(e) => push_toast(toasts, ToastKind::Error, format!("Export failed: {e}")),
            }
        });
    });

    let copy_session_id = use_callback(move |session: String| {
        spawn(async move {
            match interop::copy_to_clipboard(&session).await {
                Ok(()) => push_toast(toasts, ToastKind::Success, "Session id copied"),
                Err(e) => push_toast(toasts, ToastKind::Error, e),
            }
        });
    });

    let auto_layout = use_callback(move |_: ()| {
        let options = LayoutOptions {
            direction: *direction.peek(),
            ..Default::default()
        };
        let positioned = {
            let s = store.read();
            compute_layout(s.nodes(), s.edges(), &options)
        };
        store.write().apply_positions(&positioned);
    });

    let fit_view = use_callback(move |_: ()| {
        let viewport = cam::fit_to_content(store.read().nodes(), *container.peek());
        if let Some(viewport) = viewport {
            camera.write().restore(viewport);
        }
    });

    let add_node = use_callback(move |kind: NodeKind| {
        // Drop the new block at the current view center.
        let viewport = camera.peek().viewport;
        let (cw, ch) = *container.peek();
        let position = Position::new(
            (cw / 2.0 - viewport.x) / viewport.zoom - 90.0,
            (ch / 2.0 - viewport.y) / viewport.zoom - 36.0,
        );
        store.write().add_node(kind, Some(position));
    });

    let delete_selection = use_callback(move |_: ()| {
        let count = store.read().selection().len();
        if count == 0 {
            return;
        }
        if count > 1 && !interop::confirm(&format!("Delete {count} selected blocks?")) {
            return;
        }
        store.write().delete_selected();
    });

    let schedule_highlight_clear = use_callback(move |_: ()| {
        *highlight_generation.write() += 1;
        let my_generation = *highlight_generation.peek();
        spawn(async move {
            TimeoutFuture::new(HIGHLIGHT_TIMEOUT_MS).await;
            if *highlight_generation.peek() == my_generation {
                store.write().clear_highlight();
            }
        });
    });

    let highlight_node = use_callback(move |node_id: String| {
        if store.write().highlight_component_from_node(&node_id) {
            schedule_highlight_clear.call(());
        }
    });

    let highlight_edge = use_callback(move |edge_id: String| {
        if store.write().highlight_component_from_edge(&edge_id) {
            schedule_highlight_clear.call(());
        }
    });

    let select_node = use_callback(move |(node_id, additive): (String, bool)| {
        if additive {
            store.write().toggle_selected(&node_id);
        } else {
            store.write().select_only(&node_id);
        }
    });

    // Connect mode: first click arms a source, second click connects.
    let connect_click = use_callback(move |node_id: String| {
        let source = connect_from.peek().clone();
        match source {
            None => connect_from.set(Some(node_id)),
            Some(source) => {
                connect_from.set(None);
                connect_mode.set(false);
                if let Err(e) = store.write().connect(&source, &node_id, None) {
                    push_toast(toasts, ToastKind::Error, e.to_string());
                }
            }
        }
    });

    let drag_start = use_callback(move |(node_id, x, y): (String, f64, f64)| {
        drag.set(Some(DragState {
            mode: DragMode::Node,
            node_id: Some(node_id),
            last: (x, y),
        }));
    });

    let background_down = use_callback(move |(x, y): (f64, f64)| {
        store.write().clear_selection();
        drag.set(Some(DragState {
            mode: DragMode::Pan,
            node_id: None,
            last: (x, y),
        }));
    });

    let mouse_move = use_callback(move |(x, y): (f64, f64)| {
        let Some(state) = drag.peek().clone() else {
            return;
        };
        let (dx, dy) = (x - state.last.0, y - state.last.1);
        match state.mode {
            DragMode::Node => {
                if let Some(node_id) = &state.node_id {
                    let zoom = camera.peek().viewport.zoom;
                    let current = store.read().node(node_id).map(|n| n.position);
                    if let Some(position) = current {
                        store.write().set_node_position(
                            node_id,
                            Position::new(position.x + dx / zoom, position.y + dy / zoom),
                        );
                    }
                }
            }
            DragMode::Pan => {
                let viewport = camera.peek().viewport;
                camera.write().user_moved(swarm_types::Viewport {
                    x: viewport.x + dx,
                    y: viewport.y + dy,
                    zoom: viewport.zoom,
                });
            }
        }
        drag.set(Some(DragState {
            last: (x, y),
            ..state
        }));
    });

    let mouse_up = use_callback(move |_: ()| {
        let finished = drag.peek().clone();
        drag.set(None);
        if let Some(state) = finished {
            if state.mode == DragMode::Node {
                // Drag-end is the persistence trigger.
                let execution_id = session_id
                    .peek()
                    .clone()
                    .unwrap_or_else(|| SCRATCH_EXECUTION_ID.to_string());
                save_current_layout(&execution_id, &poll_context);
            }
        }
    });

    let zoom_step = use_callback(move |factor: f64| {
        let (cw, ch) = *container.peek();
        let viewport = camera.peek().viewport;
        let next = cam::zoom_at(viewport, factor, (cw / 2.0, ch / 2.0));
        // Manual zoom counts as a user camera move: follow turns off.
        camera.write().user_moved(next);
    });

    let toggle_theme = use_callback(move |_: ()| {
        let theme = next_theme(&current_theme.peek());
        apply_theme_to_document(&theme);
        set_cached_theme_preference(&theme);
        current_theme.set(theme);
    });

    let toggle_follow = use_callback(move |_: ()| {
        let following = camera.peek().is_following();
        camera.write().set_follow(!following);
    });

    let soft_reset = use_callback(move |_: ()| {
        store.write().soft_reset();
        reconciler.write().reset();
    });

    let clear_flow = use_callback(move |_: ()| {
        if !interop::confirm("Clear the whole flow? Undo can restore it.") {
            return;
        }
        store.write().clear();
    });

    let rename_node = use_callback(move |(node_id, label): (String, String)| {
        store.write().update_node_data(
            &node_id,
            NodeEdit {
                label: Some(label),
                ..Default::default()
            },
        );
    });

    let describe_node = use_callback(move |(node_id, description): (String, String)| {
        store.write().update_node_data(
            &node_id,
            NodeEdit {
                description: Some(description),
                ..Default::default()
            },
        );
    });

    let edit_params = use_callback(move |(node_id, raw): (String, String)| {
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(params) => {
                store.write().update_node_data(
                    &node_id,
                    NodeEdit {
                        tool_params: Some(params),
                        ..Default::default()
                    },
                );
            }
            Err(e) => push_toast(toasts, ToastKind::Error, format!("Invalid JSON: {e}")),
        }
    });

    let relabel_edge = use_callback(move |(edge_id, label): (String, String)| {
        if let Err(e) = store.write().relabel_edge(&edge_id, &label) {
            push_toast(toasts, ToastKind::Error, e.to_string());
        }
    });

    let disconnect_edge = use_callback(move |edge_id: String| {
        store.write().disconnect(&edge_id);
    });

    let delete_node = use_callback(move |node_id: String| {
        store.write().delete_node(&node_id);
    });

    let undo = use_callback(move |_: ()| {
        store.write().undo();
    });

    let redo = use_callback(move |_: ()| {
        store.write().redo();
    });

    let toggle_direction = use_callback(move |_: ()| {
        let next = match *direction.peek() {
            LayoutDirection::TopToBottom => LayoutDirection::LeftToRight,
            LayoutDirection::LeftToRight => LayoutDirection::TopToBottom,
        };
        direction.set(next);
        auto_layout.call(());
    });

    let toggle_connect = use_callback(move |_: ()| {
        let enabled = !*connect_mode.peek();
        connect_mode.set(enabled);
        if !enabled {
            connect_from.set(None);
        }
    });

    let toggle_grid = use_callback(move |_: ()| {
        let current = *show_grid.peek();
        show_grid.set(!current);
    });

    let toggle_minimap = use_callback(move |_: ()| {
        let current = *show_minimap.peek();
        show_minimap.set(!current);
    });

    let zoom_in = use_callback(move |_: ()| zoom_step.call(1.2));
    let zoom_out = use_callback(move |_: ()| zoom_step.call(1.0 / 1.2));

    let actions = GraphActions {
        start: start_run,
        continue_run,
        stop: stop_run,
        undo,
        redo,
        fit_view,
        auto_layout,
        toggle_direction,
        toggle_follow,
        toggle_connect,
        toggle_grid,
        toggle_minimap,
        toggle_theme,
        zoom_in,
        zoom_out,
        soft_reset,
        clear: clear_flow,
        add_node,
        delete_node,
        rename_node,
        describe_node,
        edit_params,
        relabel_edge,
        disconnect_edge,
    };
    use_context_provider(|| actions);

    let handle_key = use_callback(move |e: Event<KeyboardData>| {
        let key = e.key().to_string();
        let modifiers = e.modifiers();
        let ctrl = modifiers.ctrl() || modifiers.meta();
        let shift = modifiers.shift();
        let in_input = interop::typing_in_input();

        let Some(shortcut) = shortcut_for(&key, ctrl, shift, in_input) else {
            return;
        };
        e.prevent_default();

        match shortcut {
            Shortcut::FitView => fit_view.call(()),
            Shortcut::AutoLayout => auto_layout.call(()),
            Shortcut::ToggleGrid => toggle_grid.call(()),
            Shortcut::ToggleMinimap => toggle_minimap.call(()),
            Shortcut::ToggleFollow => toggle_follow.call(()),
            Shortcut::ClearSelection => {
                let mut s = store.write();
                s.clear_selection();
                s.clear_highlight();
                connect_from.set(None);
                connect_mode.set(false);
            }
            Shortcut::DeleteSelection => delete_selection.call(()),
            Shortcut::SelectAll => store.write().select_all(),
            Shortcut::DeselectAll => store.write().clear_selection(),
            Shortcut::Undo => undo.call(()),
            Shortcut::Redo => redo.call(()),
        }
    });

    // ------------------------------------------------------------------
    // Render
    // ------------------------------------------------------------------

    let replaying = !run_active() && replay_index().is_some();
    let view_store = if replaying {
        let index = replay_index().unwrap_or(0);
        replay_prefix(&store.read(), &events.read(), index)
    } else {
        store.read().clone()
    };

    let selected_single: Option<FlowNode> = {
        let s = store.read();
        if s.selection().len() == 1 {
            s.selection().iter().next().and_then(|id| s.node(id)).cloned()
        } else {
            None
        }
    };
    let outgoing_edges: Vec<FlowEdge> = selected_single
        .as_ref()
        .map(|node| {
            store
                .read()
                .edges()
                .iter()
                .filter(|e| e.source == node.id)
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    let awaiting_input = store.read().run_status() == RunStatus::AwaitingInput
        || store
            .read()
            .nodes()
            .iter()
            .any(|n| n.status == NodeStatus::NeedsInput);

    let viewport = camera.read().viewport;
    let following = camera.read().is_following();
    let can_undo = store.read().can_undo();
    let can_redo = store.read().can_redo();
    let event_count = events.read().len();
    let show_replay = !run_active() && event_count > 0;
    let replay_position = replay_index().unwrap_or(event_count);
    let connect_armed = connect_mode();

    rsx! {
        div {
            style: "display: flex; flex-direction: column; height: 100vh; background: var(--canvas-bg, #0f172a); color: var(--text-primary, #e5e7eb); outline: none;",
            tabindex: "0",
            onkeydown: move |e| handle_key.call(e),

            style { {GLOBAL_CSS} }

            Toolbar {
                run_active: run_active(),
                awaiting_input,
                can_undo,
                can_redo,
                follow: following,
                connect_mode: connect_armed,
            }

            PaletteBar {}

            div {
                style: "display: flex; flex: 1; overflow: hidden;",

                SessionPanel {
                    sessions: sessions(),
                    current: session_id(),
                    on_load: load_session,
                    on_delete: delete_session,
                    on_export: export_session,
                    on_copy_id: copy_session_id,
                    on_refresh: refresh_sessions,
                }

                FlowCanvas {
                    store: view_store,
                    viewport,
                    show_grid: show_grid(),
                    show_minimap: show_minimap(),
                    connect_armed,
                    on_select: select_node,
                    on_drag_start: drag_start,
                    on_connect_click: connect_click,
                    on_highlight_node: highlight_node,
                    on_highlight_edge: highlight_edge,
                    on_background_down: background_down,
                    on_mouse_move: mouse_move,
                    on_mouse_up: mouse_up,
                }

                if let Some(node) = selected_single {
                    InspectorPanel {
                        node,
                        outgoing: outgoing_edges,
                    }
                }
            }

            if show_replay {
                ReplayBar {
                    count: event_count,
                    index: replay_position,
                    on_scrub: move |i: usize| replay_index.set(Some(i)),
                    on_exit: move |_| replay_index.set(None),
                }
            }

            ToastHost { toasts: toasts() }
        }
    }
}
