//! Polling loop for a live execution.
//!
//! While a run is active the console polls the swarm status endpoint on a
//! fixed interval, feeds new events through the reconciler, and stops on a
//! terminal status. A generation counter guards against overlap: starting
//! a new loop bumps the generation, and any older loop notices on its next
//! iteration and exits. Transport errors are logged and polling continues;
//! the backend is assumed to recover.

use dioxus::prelude::*;
use gloo_timers::future::TimeoutFuture;

use swarm_graph::{compute_layout, persist, FollowCamera, GraphStore, LayoutOptions, Reconciler};
use swarm_types::{EventEnvelope, NodeStatus, SwarmStatusResponse, Viewport};

use crate::api;
use crate::interop::now_ms;
use crate::storage;

pub const POLL_INTERVAL_MS: u32 = 1_000;

/// Everything the poll loop touches, bundled so callers hand over one
/// value instead of a bag of individual signals.
#[derive(Clone, Copy)]
pub struct PollContext {
    pub generation: Signal<u64>,
    pub store: Signal<GraphStore>,
    pub reconciler: Signal<Reconciler>,
    pub events: Signal<Vec<EventEnvelope>>,
    pub camera: Signal<FollowCamera>,
    pub container: Signal<(f64, f64)>,
    pub run_active: Signal<bool>,
    pub seeded_session: Signal<Option<String>>,
}

pub async fn run_poll_loop(session: String, my_generation: u64, mut ctx: PollContext) {
    loop {
        if (ctx.generation)() != my_generation {
            return;
        }

        match api::fetch_swarm_status(&session).await {
            Ok(response) => {
                if (ctx.generation)() != my_generation {
                    return;
                }
                let restored_viewport = apply_status(&session, &response, &mut ctx);
                if let Some(viewport) = restored_viewport {
                    // Apply the saved viewport one tick after the seeded
                    // diagram mounts, so it is not clobbered by layout.
                    TimeoutFuture::new(16).await;
                    ctx.camera.write().restore(viewport);
                }
                if response.status.is_terminal() {
                    ctx.reconciler
                        .write()
                        .flush_tokens(&mut ctx.store.write(), now_ms());
                    ctx.run_active.set(false);
                    save_current_layout(&session, &ctx);
                    return;
                }
            }
            Err(e) => {
                dioxus_logger::tracing::warn!("status poll failed, will retry: {e}");
            }
        }

        TimeoutFuture::new(POLL_INTERVAL_MS).await;
    }
}

/// Apply one status response: seed the graph when this session's plan
/// first arrives, reconcile new events, and keep the follow camera on the
/// most recently started running node. Returns a saved viewport to
/// restore when the graph was just seeded.
fn apply_status(
    session: &str,
    response: &SwarmStatusResponse,
    ctx: &mut PollContext,
) -> Option<Viewport> {
    let mut restored = None;

    let needs_seed = (ctx.seeded_session)()
        .map(|s| s != session)
        .unwrap_or(true);
    if needs_seed && !response.agents.is_empty() {
        {
            let mut store = ctx.store.write();
            store.load_plan(&response.agents);
            let positioned = compute_layout(store.nodes(), store.edges(), &LayoutOptions::default());
            store.apply_positions(&positioned);
        }
        ctx.reconciler.write().reset();
        ctx.events.write().clear();
        ctx.seeded_session.set(Some(session.to_string()));

        // A layout the user saved for this execution wins over the
        // computed one; stale node ids are skipped.
        if let Some(saved) = storage::load_layout(session) {
            persist::apply_layout(&mut ctx.store.write(), &saved);
            restored = Some(saved.viewport);
        }
    }

    let now = now_ms();
    {
        let mut store = ctx.store.write();
        let mut reconciler = ctx.reconciler.write();
        for envelope in &response.events {
            if reconciler.apply(&mut store, envelope, now) {
                ctx.events.write().push(envelope.clone());
            }
        }
    }

    let running = ctx
        .store
        .read()
        .nodes()
        .iter()
        .filter(|n| n.status == NodeStatus::Running)
        .max_by_key(|n| n.metrics.started_at.unwrap_or(0))
        .cloned();
    if let Some(node) = running {
        ctx.camera.write().follow_node(&node, (ctx.container)());
    }

    restored
}

/// Persist current positions + viewport for this execution id.
pub fn save_current_layout(execution_id: &str, ctx: &PollContext) {
    let snapshot = persist::snapshot_layout(
        execution_id,
        &ctx.store.read(),
        ctx.camera.read().viewport,
        chrono::Utc::now(),
    );
    storage::save_layout(snapshot);
}
