//! Layout persistence core
//!
//! The pure half of saving/restoring layouts: capped upsert into the
//! persisted list, stale-id filtering on restore, and lenient JSON
//! (de)serialization. The browser-storage glue lives in the UI crate;
//! everything here is deterministic and unit-tested natively.

use chrono::{DateTime, Utc};
use swarm_types::{SavedLayout, SavedNodePosition, Viewport};

use crate::store::GraphStore;

/// Upper bound on persisted layouts; the oldest entry is evicted first.
pub const MAX_SAVED_LAYOUTS: usize = 25;

/// Snapshot the current node positions and viewport for one execution id.
pub fn snapshot_layout(
    execution_id: &str,
    store: &GraphStore,
    viewport: Viewport,
    timestamp: DateTime<Utc>,
) -> SavedLayout {
    SavedLayout {
        execution_id: execution_id.to_string(),
        nodes: store
            .nodes()
            .iter()
            .map(|n| SavedNodePosition {
                id: n.id.clone(),
                position: n.position,
            })
            .collect(),
        viewport,
        timestamp,
    }
}

/// Upsert into the persisted list: drop any entry for the same execution
/// id, prepend the new one, truncate to the cap. Last write wins.
pub fn upsert_layout(mut list: Vec<SavedLayout>, entry: SavedLayout) -> Vec<SavedLayout> {
    list.retain(|l| l.execution_id != entry.execution_id);
    list.insert(0, entry);
    list.truncate(MAX_SAVED_LAYOUTS);
    list
}

pub fn find_layout<'a>(list: &'a [SavedLayout], execution_id: &str) -> Option<&'a SavedLayout> {
    list.iter().find(|l| l.execution_id == execution_id)
}

/// Apply saved positions to nodes that still exist, silently skipping
/// stale entries for deleted nodes. Returns how many nodes moved.
pub fn apply_layout(store: &mut GraphStore, saved: &SavedLayout) -> usize {
    let mut applied = 0;
    for entry in &saved.nodes {
        if store.set_node_position(&entry.id, entry.position) {
            applied += 1;
        }
    }
    applied
}

pub fn encode_layouts(list: &[SavedLayout]) -> String {
    serde_json::to_string(list).unwrap_or_else(|e| {
        tracing::warn!("failed to encode persisted layouts: {e}");
        "[]".to_string()
    })
}

/// Lenient decode: corrupt storage yields an empty list, never an error.
pub fn decode_layouts(json: &str) -> Vec<SavedLayout> {
    serde_json::from_str(json).unwrap_or_else(|e| {
        tracing::warn!("discarding corrupt persisted layouts: {e}");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use swarm_types::{AgentPlan, Position};

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    fn seeded_store(ids: &[&str]) -> GraphStore {
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

    fn layout_for(execution_id: &str, seconds: i64) -> SavedLayout {
        SavedLayout {
            execution_id: execution_id.to_string(),
            nodes: Vec::new(),
            viewport: Viewport::default(),
            timestamp: ts(seconds),
        }
    }

    #[test]
    fn saved_position_survives_a_fresh_store() {
        let mut store = seeded_store(&["n1", "n2"]);
        store.set_node_position("n1", Position::new(50.0, 50.0));
        let saved = snapshot_layout("exec1", &store, Viewport::default(), ts(0));
        let list = upsert_layout(Vec::new(), saved);

        let mut fresh = seeded_store(&["n1", "n2"]);
        let found = find_layout(&list, "exec1").unwrap();
        assert_eq!(apply_layout(&mut fresh, found), 2);
        assert_eq!(fresh.node("n1").unwrap().position, Position::new(50.0, 50.0));
    }

    #[test]
    fn stale_node_ids_are_skipped() {
        let store = seeded_store(&["n1", "n2"]);
        let saved = snapshot_layout("exec1", &store, Viewport::default(), ts(0));

        let mut shrunk = seeded_store(&["n1"]);
        assert_eq!(apply_layout(&mut shrunk, &saved), 1);
    }

    #[test]
    fn upsert_replaces_same_execution_and_prepends() {
        let list = upsert_layout(Vec::new(), layout_for("a", 1));
        let list = upsert_layout(list, layout_for("b", 2));
        let list = upsert_layout(list, layout_for("a", 3));

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].execution_id, "a");
        assert_eq!(list[0].timestamp, ts(3));
        assert_eq!(list[1].execution_id, "b");
    }

    #[test]
    fn list_is_capped_oldest_evicted_first() {
        let mut list = Vec::new();
        for i in 0..(MAX_SAVED_LAYOUTS + 5) {
            list = upsert_layout(list, layout_for(&format!("exec{i}"), i as i64));
        }
        assert_eq!(list.len(), MAX_SAVED_LAYOUTS);
        assert_eq!(list[0].execution_id, format!("exec{}", MAX_SAVED_LAYOUTS + 4));
        assert!(find_layout(&list, "exec0").is_none());
    }

    #[test]
    fn decode_tolerates_corrupt_storage() {
        assert!(decode_layouts("not json").is_empty());
        assert!(decode_layouts("{\"wrong\":\"shape\"}").is_empty());

        let encoded = encode_layouts(&[layout_for("a", 1)]);
        let decoded = decode_layouts(&encoded);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].execution_id, "a");
    }
}
