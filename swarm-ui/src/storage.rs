//! Browser-local persistence for diagram layouts.
//!
//! One namespaced key holds the whole capped list of persisted layouts;
//! the list semantics (upsert, eviction, stale-id filtering) live in
//! `swarm_graph::persist`. Storage failures degrade to an empty list and
//! never block interaction.

use swarm_graph::persist;
use swarm_types::SavedLayout;
use web_sys::Storage;

const LAYOUTS_KEY: &str = "swarm-console.layouts";

fn local_storage() -> Option<Storage> {
    web_sys::window().and_then(|window| window.local_storage().ok().flatten())
}

pub fn read_layouts() -> Vec<SavedLayout> {
    let Some(storage) = local_storage() else {
        return Vec::new();
    };
    storage
        .get_item(LAYOUTS_KEY)
        .ok()
        .flatten()
        .map(|json| persist::decode_layouts(&json))
        .unwrap_or_default()
}

pub fn write_layouts(list: &[SavedLayout]) {
    let Some(storage) = local_storage() else {
        return;
    };
    if let Err(e) = storage.set_item(LAYOUTS_KEY, &persist::encode_layouts(list)) {
        // Quota exhaustion or private-mode denial; the in-memory layout
        // still works for this session.
        log::error!("failed to persist layouts: {e:?}");
    }
}

/// Upsert one layout into storage.
pub fn save_layout(entry: SavedLayout) {
    let list = persist::upsert_layout(read_layouts(), entry);
    write_layouts(&list);
}

/// Look up the persisted layout for an execution id.
pub fn load_layout(execution_id: &str) -> Option<SavedLayout> {
    let list = read_layouts();
    persist::find_layout(&list, execution_id).cloned()
}
