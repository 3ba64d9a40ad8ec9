//! Browser-only round-trip through localStorage for persisted layouts.
//! Runs under wasm-bindgen-test; a no-op on native targets.

#![cfg(target_arch = "wasm32")]

use chrono::Utc;
use swarm_types::{Position, SavedLayout, SavedNodePosition, Viewport};
use swarm_ui::storage::{load_layout, save_layout};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn layout_round_trips_through_local_storage() {
    let entry = SavedLayout {
        execution_id: "wasm-test-exec".to_string(),
        nodes: vec![SavedNodePosition {
            id: "n1".to_string(),
            position: Position::new(50.0, 50.0),
        }],
        viewport: Viewport {
            x: -20.0,
            y: 14.0,
            zoom: 0.8,
        },
        timestamp: Utc::now(),
    };

    save_layout(entry.clone());
    let restored = load_layout("wasm-test-exec").expect("layout should be persisted");

    assert_eq!(restored.execution_id, entry.execution_id);
    assert_eq!(restored.nodes, entry.nodes);
    assert_eq!(restored.viewport, entry.viewport);
}
