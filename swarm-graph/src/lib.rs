//! Algorithmic core of the swarm console
//!
//! Everything here is plain Rust with no browser dependency, so the graph
//! semantics unit-test natively:
//!
//! - [`store`]: the single source of truth for nodes/edges, with undo/redo
//!   and path highlighting
//! - [`layout`]: deterministic hierarchical position assignment
//! - [`reconcile`]: backend execution events applied as store mutations
//! - [`batch`]: per-agent token coalescing for smooth streaming
//! - [`camera`]: viewport math and the follow-mode policy
//! - [`persist`]: the pure half of layout persistence

pub mod batch;
pub mod camera;
pub mod error;
pub mod layout;
pub mod persist;
pub mod reconcile;
pub mod store;

pub use batch::{TokenBatcher, FLUSH_INTERVAL_MS};
pub use camera::{fit_to_content, zoom_at, FollowCamera, MAX_FOLLOW_ZOOM, MAX_ZOOM, MIN_ZOOM};
pub use error::GraphError;
pub use layout::{compute_layout, LayoutDirection, LayoutOptions};
pub use persist::{
    apply_layout, decode_layouts, encode_layouts, find_layout, snapshot_layout, upsert_layout,
    MAX_SAVED_LAYOUTS,
};
pub use reconcile::{replay_prefix, Reconciler};
pub use store::{GraphStore, NodeEdit};
